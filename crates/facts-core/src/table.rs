//! Pivoted result tables with aggregation and derived financial columns.
//!
//! [`ResultTable::pivot`] turns accumulated [`FilteredRow`]s into a table
//! indexed by (ticker, fiscal year) with one column per fact tag; the cell
//! holds the chosen [`AggregateFn`] applied to the values sharing that key.
//! Derived columns (net income, return on assets, current ratio,
//! debt-to-assets, year-over-year deltas) are appended from existing columns
//! without re-pivoting.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{DataError, Result};
use crate::types::{FilteredRow, Ticker};

const OPERATING_INCOME_TAG: &str = "OperatingIncomeLoss";
const ASSETS_TAG: &str = "Assets";
const CURRENT_ASSETS_TAG: &str = "AssetsCurrent";
const CURRENT_LIABILITIES_TAG: &str = "LiabilitiesCurrent";

/// Aggregate applied to the values sharing one (ticker, fiscal year, tag)
/// cell during a pivot.
///
/// `StdDev` and `Variance` are sample statistics (n - 1 denominator) and
/// leave the cell missing when a single value is all a cell holds. `Slope`
/// is the least-squares linear-regression coefficient of the values against
/// their 0-based sequence index, degenerating to exactly `0.0` on a single
/// point or a singular fit.
#[derive(Clone, Copy, Debug)]
pub enum AggregateFn {
    /// Arithmetic mean.
    Mean,
    /// Sum of values.
    Sum,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Sample standard deviation.
    StdDev,
    /// Sample variance.
    Variance,
    /// Least-squares linear-trend slope.
    Slope,
    /// Caller-provided aggregate over the cell's values.
    Custom(fn(&[f64]) -> f64),
}

impl AggregateFn {
    /// A short label for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::StdDev => "std",
            Self::Variance => "var",
            Self::Slope => "slope",
            Self::Custom(_) => "custom",
        }
    }

    /// Applies the aggregate to one cell's values.
    ///
    /// Returns `None` when the cell would have no defined value (no values
    /// at all, or a sample statistic over a single point).
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Sum => Some(values.iter().sum()),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::StdDev => sample_variance(values).map(f64::sqrt),
            Self::Variance => sample_variance(values),
            Self::Slope => Some(slope(values)),
            Self::Custom(f) => Some(f(values)),
        }
    }
}

/// Sample variance with the n - 1 denominator; undefined for fewer than two
/// values.
fn sample_variance(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let squared: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some(squared / (n - 1) as f64)
}

/// Least-squares slope of `values` against their 0-based index.
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let sum_x = (n - 1.0) * n / 2.0;
    let sum_xx = values
        .iter()
        .enumerate()
        .map(|(i, _)| (i * i) as f64)
        .sum::<f64>();
    let sum_y: f64 = values.iter().sum();
    let sum_xy = values
        .iter()
        .enumerate()
        .map(|(i, v)| i as f64 * v)
        .sum::<f64>();
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// A pivoted view of filtered rows: one row per (ticker, fiscal year), one
/// column per fact tag.
///
/// Row order is lexicographic by ticker then ascending fiscal year; columns
/// are sorted by tag name at pivot time, with derived columns appended in
/// insertion order. Missing cells are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    index: Vec<(Ticker, i32)>,
    cells: Vec<Vec<Option<f64>>>,
}

impl ResultTable {
    /// Pivots filtered rows into a table, optionally narrowed to a ticker
    /// subset, applying `aggregate` to each cell's values.
    #[must_use]
    pub fn pivot(
        rows: &[FilteredRow],
        aggregate: AggregateFn,
        tickers: Option<&BTreeSet<Ticker>>,
    ) -> Self {
        let mut columns: BTreeSet<String> = BTreeSet::new();
        let mut groups: BTreeMap<(Ticker, i32), BTreeMap<String, Vec<f64>>> = BTreeMap::new();

        for row in rows {
            if tickers.is_some_and(|keep| !keep.contains(&row.ticker)) {
                continue;
            }
            columns.insert(row.tag.clone());
            groups
                .entry((row.ticker.clone(), row.fiscal_year))
                .or_default()
                .entry(row.tag.clone())
                .or_default()
                .push(row.value);
        }

        let columns: Vec<String> = columns.into_iter().collect();
        let mut index = Vec::with_capacity(groups.len());
        let mut cells = Vec::with_capacity(groups.len());
        for (key, tag_values) in groups {
            let row = columns
                .iter()
                .map(|column| {
                    tag_values
                        .get(column)
                        .and_then(|values| aggregate.apply(values))
                })
                .collect();
            index.push(key);
            cells.push(row);
        }

        Self {
            columns,
            index,
            cells,
        }
    }

    /// The (ticker, fiscal year) row index, in row order.
    #[must_use]
    pub fn rows(&self) -> &[(Ticker, i32)] {
        &self.index
    }

    /// The column names, pivoted tags first, derived columns after.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The values of one column, in row order.
    ///
    /// # Errors
    /// Returns [`DataError::UnknownColumn`] if the column does not exist.
    pub fn column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))?;
        Ok(self.cells.iter().map(|row| row[idx]).collect())
    }

    /// The cell at (ticker, fiscal year, column), if present.
    #[must_use]
    pub fn get(&self, ticker: &Ticker, fiscal_year: i32, column: &str) -> Option<f64> {
        let row = self
            .index
            .iter()
            .position(|(t, y)| t == ticker && *y == fiscal_year)?;
        let col = self.column_index(column)?;
        self.cells[row][col]
    }

    /// Drops every column containing at least one missing cell, enforcing
    /// full-coverage comparisons across companies.
    pub fn normalize(&mut self) {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&col| self.cells.iter().all(|row| row[col].is_some()))
            .collect();
        if keep.len() == self.columns.len() {
            return;
        }
        self.columns = keep.iter().map(|&col| self.columns[col].clone()).collect();
        for row in &mut self.cells {
            *row = keep.iter().map(|&col| row[col]).collect();
        }
    }

    /// Narrows the table to matching rows and the requested columns without
    /// re-aggregating.
    ///
    /// # Errors
    /// Returns [`DataError::UnknownColumn`] if a requested column does not
    /// exist.
    pub fn slice(
        &self,
        ticker: Option<&Ticker>,
        fiscal_year: Option<i32>,
        columns: Option<&[&str]>,
    ) -> Result<Self> {
        let selected: Vec<usize> = match columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    self.column_index(name)
                        .ok_or_else(|| DataError::UnknownColumn((*name).to_string()))
                })
                .collect::<Result<_>>()?,
            None => (0..self.columns.len()).collect(),
        };

        let mut index = Vec::new();
        let mut cells = Vec::new();
        for (row, key) in self.index.iter().enumerate() {
            if ticker.is_some_and(|ticker| &key.0 != ticker) {
                continue;
            }
            if fiscal_year.is_some_and(|year| key.1 != year) {
                continue;
            }
            index.push(key.clone());
            cells.push(selected.iter().map(|&col| self.cells[row][col]).collect());
        }

        Ok(Self {
            columns: selected
                .iter()
                .map(|&col| self.columns[col].clone())
                .collect(),
            index,
            cells,
        })
    }

    /// Appends net income under `name`, defined as the operating income
    /// column.
    ///
    /// # Errors
    /// Returns an error if the `OperatingIncomeLoss` column is missing.
    pub fn net_income(&mut self, name: &str) -> Result<()> {
        let values = self.column(OPERATING_INCOME_TAG)?;
        self.insert_column(name, values);
        Ok(())
    }

    /// Appends return on assets under `name`: operating income over total
    /// assets.
    ///
    /// # Errors
    /// Returns an error if an operand column is missing.
    pub fn return_on_assets(&mut self, name: &str) -> Result<()> {
        let values = self.ratio(OPERATING_INCOME_TAG, ASSETS_TAG)?;
        self.insert_column(name, values);
        Ok(())
    }

    /// Appends the current ratio under `name`: current assets over current
    /// liabilities.
    ///
    /// # Errors
    /// Returns an error if an operand column is missing.
    pub fn current_ratio(&mut self, name: &str) -> Result<()> {
        let values = self.ratio(CURRENT_ASSETS_TAG, CURRENT_LIABILITIES_TAG)?;
        self.insert_column(name, values);
        Ok(())
    }

    /// Appends debt-to-assets under `name`: current liabilities over current
    /// assets.
    ///
    /// # Errors
    /// Returns an error if an operand column is missing.
    pub fn debt_to_assets(&mut self, name: &str) -> Result<()> {
        let values = self.ratio(CURRENT_LIABILITIES_TAG, CURRENT_ASSETS_TAG)?;
        self.insert_column(name, values);
        Ok(())
    }

    /// Appends the change of column `of` from the preceding fiscal year of
    /// the same ticker under `name`.
    ///
    /// The first year of each ticker has no predecessor and is missing by
    /// definition.
    ///
    /// # Errors
    /// Returns an error if the `of` column is missing.
    pub fn delta(&mut self, name: &str, of: &str) -> Result<()> {
        let source = self.column(of)?;
        let mut values = Vec::with_capacity(source.len());
        for (row, (ticker, _)) in self.index.iter().enumerate() {
            let previous = if row > 0 && self.index[row - 1].0 == *ticker {
                source[row - 1]
            } else {
                None
            };
            values.push(match (source[row], previous) {
                (Some(current), Some(previous)) => Some(current - previous),
                _ => None,
            });
        }
        self.insert_column(name, values);
        Ok(())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Element-wise `numerator / denominator`; missing where an operand is
    /// missing or the denominator is zero.
    fn ratio(&self, numerator: &str, denominator: &str) -> Result<Vec<Option<f64>>> {
        let numerator = self.column(numerator)?;
        let denominator = self.column(denominator)?;
        Ok(numerator
            .iter()
            .zip(&denominator)
            .map(|(n, d)| match (n, d) {
                (Some(n), Some(d)) if *d != 0.0 => Some(n / d),
                _ => None,
            })
            .collect())
    }

    /// Adds or replaces a column. `values` must be in row order.
    fn insert_column(&mut self, name: &str, values: Vec<Option<f64>>) {
        match self.column_index(name) {
            Some(col) => {
                for (row, value) in values.into_iter().enumerate() {
                    self.cells[row][col] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in values.into_iter().enumerate() {
                    self.cells[row].push(value);
                }
            }
        }
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec!["ticker".to_string(), "fy".to_string()];
        header.extend(self.columns.iter().cloned());

        let mut lines = Vec::with_capacity(self.index.len());
        for (row, (ticker, year)) in self.index.iter().enumerate() {
            let mut line = vec![ticker.to_string(), year.to_string()];
            line.extend(self.cells[row].iter().map(|cell| match cell {
                Some(value) => value.to_string(),
                None => String::new(),
            }));
            lines.push(line);
        }

        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(col, name)| {
                lines
                    .iter()
                    .map(|line| line[col].len())
                    .chain([name.len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |line: &[String]| {
            line.iter()
                .enumerate()
                .map(|(col, cell)| format!("{cell:>width$}", width = widths[col]))
                .collect::<Vec<_>>()
                .join("  ")
        };

        writeln!(f, "{}", render(&header))?;
        for line in &lines {
            writeln!(f, "{}", render(line))?;
        }
        Ok(())
    }
}
