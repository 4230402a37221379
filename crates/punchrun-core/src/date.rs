use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed offset between Gregorian and Minguo (ROC) years. An institutional
/// convention of the portal, never generalized to other calendars.
pub const ROC_ERA_OFFSET: i32 = 1911;

/// A calendar date in the portal's era-based representation.
///
/// Renders as the compact `yyyMMdd` form the portal expects, e.g. ROC year
/// 115, February 1st becomes `"1150201"`. Field order makes the derived `Ord`
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RocDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl RocDate {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Convert a Gregorian date by subtracting the fixed era offset.
    pub fn from_gregorian(date: NaiveDate) -> Self {
        Self {
            year: (date.year() - ROC_ERA_OFFSET).max(0) as u16,
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }

    /// The portal's compact wire form: zero-padded `yyyMMdd`.
    pub fn compact(&self) -> String {
        format!("{:03}{:02}{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for RocDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}
