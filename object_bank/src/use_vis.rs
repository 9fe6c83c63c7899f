//! Which sprite layers a partially used object shows.
//!
//! Layers flagged `use_vanish` disappear as uses run out and layers
//! flagged `use_appear` show up. Dummies for each remaining-use count get
//! a skip mask computed here.

use object_formats::ObjectRecord;

/// Vanish/appear layer lists of the last object processed.
#[derive(Debug, Default, Clone)]
pub struct UseVisCache {
    object: Option<i32>,
    vanishing: Vec<usize>,
    appearing: Vec<usize>,
}

impl UseVisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.object = None;
        self.vanishing.clear();
        self.appearing.clear();
    }

    /// Drops the cached lists if they belong to `id`.
    pub fn forget(&mut self, id: i32) {
        if self.object == Some(id) {
            self.invalidate();
        }
    }

    fn load(&mut self, record: &ObjectRecord) {
        if self.object == Some(record.id) {
            return;
        }
        self.vanishing = record
            .sprites
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.use_vanish)
            .map(|(index, _)| index)
            .collect();
        self.appearing = record
            .sprites
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.use_appear)
            .map(|(index, _)| index)
            .collect();
        self.object = Some(record.id);
    }

    /// Skip mask for `record` with `uses_remaining` uses left.
    pub fn skip_mask(&mut self, record: &ObjectRecord, uses_remaining: i32) -> Vec<bool> {
        let mut skip = vec![false; record.sprites.len()];

        if uses_remaining == record.num_uses {
            for (index, layer) in record.sprites.iter().enumerate() {
                skip[index] = layer.use_appear;
            }
            return skip;
        }
        if uses_remaining == 0 {
            for (index, layer) in record.sprites.iter().enumerate() {
                skip[index] = layer.use_vanish;
            }
            return skip;
        }

        self.load(record);
        let num_uses = record.num_uses.max(1);
        let d = uses_remaining;

        for index in &self.appearing {
            skip[*index] = true;
        }

        let vanishing = self.vanishing.len() as i32;
        if vanishing > 0 {
            let mut left = d * vanishing / num_uses;
            let in_last = vanishing / num_uses;
            let mut in_first = (num_uses - 1) * vanishing / num_uses;

            if in_last == 0 {
                // pad so the last dummy keeps one layer
                left += 1;
                in_first += 1;
            }
            left = left.min(vanishing);
            in_first = in_first.min(vanishing);

            if in_first == vanishing && left > 1 {
                // first dummy must differ from the full object
                left -= 1;
            }

            for index in &self.vanishing[left as usize..] {
                skip[*index] = true;
            }
        }

        let appearing = self.appearing.len() as i32;
        if appearing > 0 {
            // halves round to even
            let invisible_left =
                ((d * appearing) as f64 / num_uses as f64).round_ties_even() as i32;
            let invisible_left = invisible_left.min(appearing);
            for index in &self.appearing[..(appearing - invisible_left) as usize] {
                skip[*index] = false;
            }
        }

        skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_formats::SpriteLayer;

    fn record(id: i32, num_uses: i32, vanish: usize, appear: usize) -> ObjectRecord {
        let mut sprites = vec![SpriteLayer::default()];
        for _ in 0..vanish {
            sprites.push(SpriteLayer {
                use_vanish: true,
                ..SpriteLayer::default()
            });
        }
        for _ in 0..appear {
            sprites.push(SpriteLayer {
                use_appear: true,
                ..SpriteLayer::default()
            });
        }
        ObjectRecord {
            id,
            num_uses,
            sprites,
            ..ObjectRecord::default()
        }
    }

    fn hidden(mask: &[bool], record: &ObjectRecord, appear: bool) -> usize {
        record
            .sprites
            .iter()
            .zip(mask)
            .filter(|(layer, skip)| **skip && if appear { layer.use_appear } else { layer.use_vanish })
            .count()
    }

    #[test]
    fn three_uses_two_vanishing_hides_one() {
        let bowl = record(7, 3, 2, 0);
        let mut cache = UseVisCache::new();
        let mask = cache.skip_mask(&bowl, 1);
        assert_eq!(hidden(&mask, &bowl, false), 1);
        assert_eq!(mask, vec![false, false, true]);
    }

    #[test]
    fn half_appeared_layers_round_to_even() {
        let sapling = record(4, 2, 0, 1);
        let mut cache = UseVisCache::new();
        assert_eq!(cache.skip_mask(&sapling, 1), vec![false, false]);

        let orchard = record(5, 2, 0, 3);
        let mask = cache.skip_mask(&orchard, 1);
        // 1.5 goes to 2, leaving one shown
        assert_eq!(hidden(&mask, &orchard, true), 2);
    }

    #[test]
    fn hidden_sets_move_monotonically() {
        let jar = record(9, 5, 7, 4);
        let mut cache = UseVisCache::new();
        let mut last_vanish = 0;
        let mut last_appear = usize::MAX;
        for d in (0..=5).rev() {
            let mask = cache.skip_mask(&jar, d);
            let vanish = hidden(&mask, &jar, false);
            let appear = hidden(&mask, &jar, true);
            assert!(vanish >= last_vanish, "vanish shrank at {d}");
            assert!(appear <= last_appear, "appear grew at {d}");
            last_vanish = vanish;
            last_appear = appear;
        }
        assert_eq!(last_vanish, 7);
        assert_eq!(last_appear, 0);
    }

    #[test]
    fn cache_follows_the_object() {
        let mut cache = UseVisCache::new();
        let a = record(1, 3, 3, 0);
        let b = record(2, 3, 0, 3);
        cache.skip_mask(&a, 1);
        let mask = cache.skip_mask(&b, 1);
        assert_eq!(hidden(&mask, &b, false), 0);
        assert_eq!(hidden(&mask, &b, true), 1);
    }
}
