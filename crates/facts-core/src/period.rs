//! Report periods identifying one quarterly data-set archive.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DataError, Result};

/// One fiscal quarter of published filing data.
///
/// A report period names exactly one quarterly archive on the regulator's
/// side. Periods are immutable values ordered and compared by
/// `(year, quarter)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportPeriod {
    year: i32,
    quarter: u8,
}

impl ReportPeriod {
    /// Creates a report period for the given year and quarter.
    ///
    /// # Errors
    /// Returns an error if the quarter is outside 1-4 or the year lies in
    /// the future (no archive can exist for it yet).
    pub fn new(year: i32, quarter: u8) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(DataError::InvalidParameter(format!(
                "quarter must be within 1-4, got {quarter}"
            )));
        }
        let current_year = Utc::now().year();
        if year > current_year {
            return Err(DataError::InvalidParameter(format!(
                "year {year} is in the future (current year is {current_year})"
            )));
        }
        Ok(Self { year, quarter })
    }

    /// The calendar year of the archive.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// The quarter of the archive (1-4).
    #[must_use]
    pub const fn quarter(&self) -> u8 {
        self.quarter
    }

    /// The immediately preceding period, wrapping quarter 1 into quarter 4
    /// of the previous year.
    #[must_use]
    pub const fn previous(&self) -> Self {
        if self.quarter == 1 {
            Self {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}q{}", self.year, self.quarter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_period() {
        let period = ReportPeriod::new(2022, 4).unwrap();
        assert_eq!(period.year(), 2022);
        assert_eq!(period.quarter(), 4);
    }

    #[test]
    fn test_quarter_out_of_range() {
        assert!(ReportPeriod::new(2022, 0).is_err());
        assert!(ReportPeriod::new(2022, 5).is_err());
    }

    #[test]
    fn test_future_year_rejected() {
        let next_year = Utc::now().year() + 1;
        assert!(ReportPeriod::new(next_year, 1).is_err());
    }

    #[test]
    fn test_previous_within_year() {
        let period = ReportPeriod::new(2022, 3).unwrap();
        assert_eq!(period.previous(), ReportPeriod::new(2022, 2).unwrap());
    }

    #[test]
    fn test_previous_wraps_year() {
        let period = ReportPeriod::new(2022, 1).unwrap();
        assert_eq!(period.previous(), ReportPeriod::new(2021, 4).unwrap());
    }

    #[test]
    fn test_display_matches_archive_naming() {
        let period = ReportPeriod::new(2023, 1).unwrap();
        assert_eq!(period.to_string(), "2023q1");
    }

    #[test]
    fn test_ordering() {
        let older = ReportPeriod::new(2021, 4).unwrap();
        let newer = ReportPeriod::new(2022, 1).unwrap();
        assert!(older < newer);
    }
}
