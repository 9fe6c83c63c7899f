//! Age-dependent head and body displacement for person objects.

use glam::DVec2;

pub trait AgeCurve {
    /// Displacement applied to the head and every layer under it.
    fn head_offset(&self, age: f64, head: DVec2, body: DVec2, front_foot: DVec2) -> DVec2;

    /// Displacement applied to the body and every layer under it.
    fn body_offset(&self, age: f64, body: DVec2) -> DVec2;
}

/// Children are drawn compressed toward the feet; elders stoop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardAgeCurve {
    pub adult_age: f64,
    pub old_age: f64,
    pub frail_age: f64,
}

impl Default for StandardAgeCurve {
    fn default() -> Self {
        Self {
            adult_age: 20.0,
            old_age: 40.0,
            frail_age: 60.0,
        }
    }
}

impl AgeCurve for StandardAgeCurve {
    fn head_offset(&self, age: f64, head: DVec2, body: DVec2, front_foot: DVec2) -> DVec2 {
        if age < 0.0 {
            return DVec2::ZERO;
        }
        if age < self.adult_age {
            let youth = (self.adult_age - age) / self.adult_age;
            let reach = head.y - front_foot.y;
            return DVec2::new(0.0, -(youth * 0.25 * reach).round());
        }
        if age >= self.old_age {
            let span = self.frail_age - self.old_age;
            let elder = ((age.min(self.frail_age) - self.old_age) / span).clamp(0.0, 1.0);
            let neck = head.y - body.y;
            return DVec2::new(0.0, -(elder * 0.2 * neck).round());
        }
        DVec2::ZERO
    }

    fn body_offset(&self, age: f64, body: DVec2) -> DVec2 {
        if age < 0.0 || age >= self.adult_age {
            return DVec2::ZERO;
        }
        let youth = (self.adult_age - age) / self.adult_age;
        DVec2::new(0.0, -(youth * 0.5 * body.y.abs()).round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adults_are_not_displaced() {
        let curve = StandardAgeCurve::default();
        let head = DVec2::new(0.0, 100.0);
        let body = DVec2::new(0.0, 60.0);
        assert_eq!(curve.head_offset(30.0, head, body, DVec2::ZERO), DVec2::ZERO);
        assert_eq!(curve.body_offset(30.0, body), DVec2::ZERO);
        assert_eq!(curve.body_offset(-1.0, body), DVec2::ZERO);
    }

    #[test]
    fn babies_shrink_and_elders_stoop() {
        let curve = StandardAgeCurve::default();
        let head = DVec2::new(0.0, 100.0);
        let body = DVec2::new(0.0, 60.0);
        assert_eq!(curve.head_offset(0.0, head, body, DVec2::ZERO).y, -25.0);
        assert_eq!(curve.body_offset(10.0, body).y, -15.0);
        assert_eq!(curve.head_offset(60.0, head, body, DVec2::ZERO).y, -8.0);
        assert_eq!(curve.head_offset(90.0, head, body, DVec2::ZERO).y, -8.0);
    }
}
