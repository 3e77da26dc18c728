//! Core data types for filing data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Ticker`] - Exchange ticker symbol
//! - [`Cik`] - Regulator-assigned company identifier
//! - [`FocusPeriod`] - Which fiscal period a submission covers
//! - [`FilteredRow`] - One filtered fact joined to its submission

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// An exchange ticker symbol.
///
/// Tickers are automatically uppercased on creation, so lookups are
/// case-insensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The regulator-assigned numeric identifier of a filing entity.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cik(u64);

impl Cik {
    /// Creates a new company identifier.
    #[must_use]
    pub const fn new(cik: u64) -> Self {
        Self(cik)
    }

    /// Returns the raw numeric identifier.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns the zero-padded 10-digit form used in regulator URLs.
    #[must_use]
    pub fn padded(&self) -> String {
        format!("{:0>10}", self.0)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Cik {
    fn from(cik: u64) -> Self {
        Self(cik)
    }
}

/// Which fiscal period a submission covers.
///
/// Submissions carrying any other label (half-year or monthly periods filed
/// by some foreign issuers) never match a filter and are dropped during
/// scanning rather than treated as errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusPeriod {
    /// Full fiscal year (annual report).
    #[serde(rename = "FY")]
    Fy,
    /// First fiscal quarter.
    Q1,
    /// Second fiscal quarter.
    Q2,
    /// Third fiscal quarter.
    Q3,
    /// Fourth fiscal quarter.
    Q4,
}

impl FocusPeriod {
    /// Returns the label used in the submissions table.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fy => "FY",
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        }
    }
}

impl fmt::Display for FocusPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FocusPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FY" => Ok(Self::Fy),
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            other => Err(DataError::Parse(format!("unknown focus period: {other}"))),
        }
    }
}

/// One numeric fact joined to its retained submission, with the ticker
/// attached after the merge.
///
/// Rows accumulate across archives by concatenation and are never mutated
/// once merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilteredRow {
    /// Resolved ticker symbol of the filer.
    pub ticker: Ticker,
    /// Display name of the filer.
    pub company: String,
    /// Company identifier of the filer.
    pub cik: Cik,
    /// Accession number of the submission the fact belongs to.
    pub accession: String,
    /// Name of the reported fact.
    pub tag: String,
    /// Fiscal year label of the submission.
    pub fiscal_year: i32,
    /// Fiscal period the submission covers.
    pub focus_period: FocusPeriod,
    /// End date of the reporting period, when present.
    pub period_end: Option<NaiveDate>,
    /// Date the fact value applies to.
    pub data_date: NaiveDate,
    /// Unit of measure of the value.
    pub unit: String,
    /// The reported numeric value.
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_uppercased() {
        assert_eq!(Ticker::new("aapl").as_str(), "AAPL");
        assert_eq!(Ticker::new("AAPL"), Ticker::new("aapl"));
    }

    #[test]
    fn test_cik_padding() {
        let cik = Cik::new(320_193);
        assert_eq!(cik.padded(), "0000320193");
        assert_eq!(cik.to_string(), "320193");
    }

    #[test]
    fn test_focus_period_round_trip() {
        for label in ["FY", "Q1", "Q2", "Q3", "Q4"] {
            let period: FocusPeriod = label.parse().unwrap();
            assert_eq!(period.as_str(), label);
        }
    }

    #[test]
    fn test_focus_period_unknown_label() {
        assert!("H1".parse::<FocusPeriod>().is_err());
        assert!("fy".parse::<FocusPeriod>().is_err());
    }
}
