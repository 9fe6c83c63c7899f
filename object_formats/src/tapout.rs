//! Tapout trigger parameters.
//!
//! Two encodings exist. Older content puts the parameters in the object
//! description as `+tapoutTrigger,mode,a,b,...`; newer files carry a
//! dedicated `tapoutTrigger=1#mode,a,b,...` line. Both carry the same value
//! list once the leading enable flag of the file line is set aside, so the
//! optional count limit sits at the same position in either form.

use serde::Serialize;

use crate::scan::{Scan, int_list};

/// Sentinel coordinate used when no specific tile is targeted.
pub const NO_SPECIFIC_COORD: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TapoutMode {
    /// Symmetric area: x radius, y radius, optional limit.
    Area,
    /// One specific tile offset.
    Point,
    /// Independent north, east, south, west radii, optional limit.
    Directional,
    Other(i32),
}

impl TapoutMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => TapoutMode::Area,
            1 => TapoutMode::Point,
            2 => TapoutMode::Directional,
            other => TapoutMode::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            TapoutMode::Area => 0,
            TapoutMode::Point => 1,
            TapoutMode::Directional => 2,
            TapoutMode::Other(code) => code,
        }
    }
}

/// Side-table entry describing how an object's creation clears its
/// neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TapoutRecord {
    pub trigger_id: i32,
    pub mode: TapoutMode,
    pub radius_n: i32,
    pub radius_e: i32,
    pub radius_s: i32,
    pub radius_w: i32,
    /// -1 when unlimited.
    pub count_limit: i32,
    pub specific_x: i32,
    pub specific_y: i32,
}

impl TapoutRecord {
    /// Builds a record from the value list `mode, v2, v3, ...`.
    ///
    /// Between two and six values are required.
    pub fn from_values(trigger_id: i32, values: &[i32]) -> Option<Self> {
        if values.len() < 2 || values.len() > 6 {
            return None;
        }
        let value = |index: usize| values.get(index).copied().unwrap_or(-1);

        let mut record = TapoutRecord {
            trigger_id,
            mode: TapoutMode::from_code(values[0]),
            radius_n: -1,
            radius_e: -1,
            radius_s: -1,
            radius_w: -1,
            count_limit: -1,
            specific_x: NO_SPECIFIC_COORD,
            specific_y: NO_SPECIFIC_COORD,
        };

        match record.mode {
            TapoutMode::Point => {
                record.specific_x = value(1);
                record.specific_y = value(2);
            }
            TapoutMode::Area => {
                record.radius_e = value(1);
                record.radius_w = value(1);
                record.radius_n = value(2);
                record.radius_s = value(2);
                if values.len() == 4 {
                    record.count_limit = value(3);
                }
            }
            TapoutMode::Directional => {
                record.radius_n = value(1);
                record.radius_e = value(2);
                record.radius_s = value(3);
                record.radius_w = value(4);
                if values.len() == 6 {
                    record.count_limit = value(5);
                }
            }
            TapoutMode::Other(_) => {}
        }
        Some(record)
    }

    /// Parses the legacy `+tapoutTrigger,...` description suffix.
    pub fn from_description(trigger_id: i32, description: &str) -> Option<Self> {
        let start = description.find("+tapoutTrigger")?;
        let mut scan = Scan::new(&description[start..]);
        scan.lit("+tapoutTrigger,")?;
        Self::from_values(trigger_id, &int_list(scan.rest(), ","))
    }

    /// Parses a `tapoutTrigger=1#...` file line. The record is only valid
    /// when the enable flag is 1.
    pub fn from_file_line(trigger_id: i32, line: &str) -> Option<Self> {
        let mut scan = Scan::new(line.trim_start());
        let enabled = scan.key_int("tapoutTrigger=")?;
        if enabled != 1 {
            return None;
        }
        scan.lit("#")?;
        Self::from_values(trigger_id, &int_list(scan.rest(), ","))
    }

    /// Parses a bare `mode,v2,...` parameter string.
    pub fn from_parameters(trigger_id: i32, parameters: &str) -> Option<Self> {
        Self::from_values(trigger_id, &int_list(parameters, ","))
    }

    pub fn with_trigger(self, trigger_id: i32) -> Self {
        Self { trigger_id, ..self }
    }

    /// Formats the parameters the way [`TapoutRecord::from_parameters`]
    /// reads them. Unknown modes have no textual form.
    pub fn parameter_string(&self) -> Option<String> {
        let text = match self.mode {
            TapoutMode::Point => format!("1,{},{}", self.specific_x, self.specific_y),
            TapoutMode::Area => {
                let mut text = format!("0,{},{}", self.radius_e, self.radius_n);
                if self.count_limit != -1 {
                    text.push_str(&format!(",{}", self.count_limit));
                }
                text
            }
            TapoutMode::Directional => {
                let mut text = format!(
                    "2,{},{},{},{}",
                    self.radius_n, self.radius_e, self.radius_s, self.radius_w
                );
                if self.count_limit != -1 {
                    text.push_str(&format!(",{}", self.count_limit));
                }
                text
            }
            TapoutMode::Other(_) => return None,
        };
        Some(text)
    }
}
