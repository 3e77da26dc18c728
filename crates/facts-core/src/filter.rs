//! The immutable filter criteria consumed by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::period::ReportPeriod;
use crate::types::FocusPeriod;

const ANNUAL_PERIODS: &[FocusPeriod] = &[FocusPeriod::Fy];
const ALL_PERIODS: &[FocusPeriod] = &[
    FocusPeriod::Fy,
    FocusPeriod::Q1,
    FocusPeriod::Q2,
    FocusPeriod::Q3,
    FocusPeriod::Q4,
];

/// Criteria for selecting facts from the quarterly archives.
///
/// A filter is a pure value: the focus periods and the list of required
/// archives are computed on demand rather than stored, so the value stays
/// trivially hashable and serves as half of the result-cache key (the other
/// half being the ticker set). Equality and hashing are structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    tags: Option<BTreeSet<String>>,
    years: u8,
    final_report: ReportPeriod,
    annual_only: bool,
}

impl FilterSpec {
    /// Creates a filter covering `years` full years ending at `final_report`,
    /// with no tag restriction and quarterly filings included.
    #[must_use]
    pub const fn new(years: u8, final_report: ReportPeriod) -> Self {
        Self {
            tags: None,
            years,
            final_report,
            annual_only: false,
        }
    }

    /// Restricts the filter to the given fact tags.
    ///
    /// Without a tag restriction every reported fact of the retained
    /// submissions is kept.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the filter to annual reports only.
    #[must_use]
    pub const fn with_annual_only(mut self, annual_only: bool) -> Self {
        self.annual_only = annual_only;
        self
    }

    /// The fact tags to keep, or `None` for all tags.
    #[must_use]
    pub const fn tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref()
    }

    /// The year span of the filter.
    #[must_use]
    pub const fn years(&self) -> u8 {
        self.years
    }

    /// The most recent report period covered by the filter.
    #[must_use]
    pub const fn final_report(&self) -> ReportPeriod {
        self.final_report
    }

    /// Whether only annual reports are kept.
    #[must_use]
    pub const fn is_annual_only(&self) -> bool {
        self.annual_only
    }

    /// The focus periods a submission must carry to be retained.
    #[must_use]
    pub const fn focus_periods(&self) -> &'static [FocusPeriod] {
        if self.annual_only {
            ANNUAL_PERIODS
        } else {
            ALL_PERIODS
        }
    }

    /// The oldest fiscal year a submission may carry and still be retained.
    #[must_use]
    pub const fn oldest_year(&self) -> i32 {
        self.final_report.year() - self.years as i32
    }

    /// The archives that must be scanned to cover the filter's span.
    ///
    /// Walks backward one quarter at a time from the final report through
    /// the same quarter `years` years earlier, inclusive, yielding exactly
    /// `4 * years + 1` periods in strictly descending order. Annual filings
    /// land in different calendar quarters per company, so every quarter of
    /// the window is scanned even when the filter is annual-only.
    #[must_use]
    pub fn required_reports(&self) -> Vec<ReportPeriod> {
        let last = ReportPeriod::new(self.oldest_year(), self.final_report.quarter())
            .unwrap_or(self.final_report);
        let mut reports = Vec::with_capacity(4 * usize::from(self.years) + 1);
        let mut current = self.final_report;
        loop {
            reports.push(current);
            if current == last {
                break;
            }
            current = current.previous();
        }
        reports
    }
}
