//! Quarterly archive scanning.
//!
//! Each `{year}q{quarter}.zip` archive bundles two tab-delimited tables:
//! `sub.txt` with one row per submission and `num.txt` with one row per
//! reported numeric fact. Scanning runs in two passes: collect the
//! submissions that match the filter, then join the fact rows against them
//! in fixed-size chunks so memory stays bounded regardless of archive size.
//!
//! Columns are located by header name, so archives may carry extra columns
//! or reorder them. Fact rows may omit the trailing footnote field.

use chrono::NaiveDate;
use csv::StringRecord;
use facts_core::{Cik, DataError, FilterSpec, FocusPeriod, Result};
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

/// Fact rows processed per chunk in the join pass.
pub(crate) const CHUNK_SIZE: usize = 200_000;

const SUBMISSIONS_NAME: &str = "sub.txt";
const FACTS_NAME: &str = "num.txt";

/// Metadata of one submission retained by the first pass.
#[derive(Debug, Clone)]
struct Submission {
    cik: Cik,
    company: String,
    fiscal_year: i32,
    focus_period: FocusPeriod,
    period_end: Option<NaiveDate>,
}

/// One numeric fact joined to its retained submission, before the ticker
/// is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFact {
    /// Company identifier of the filer.
    pub cik: Cik,
    /// Display name of the filer, as submitted.
    pub company: String,
    /// Accession number of the submission.
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

/// Header-name to index lookup for one tab-delimited table.
struct Columns {
    indices: HashMap<String, usize>,
}

impl Columns {
    fn new(member: &str, headers: &StringRecord, required: &[&str]) -> Result<Self> {
        let indices: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index))
            .collect();

        for name in required {
            if !indices.contains_key(*name) {
                return Err(DataError::Malformed(format!(
                    "{} is missing the {} column",
                    member, name
                )));
            }
        }
        Ok(Self { indices })
    }

    /// The named field of `record`, or empty when the row is short.
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.indices
            .get(name)
            .and_then(|&index| record.get(index))
            .unwrap_or("")
    }
}

/// Scans one quarterly archive for facts filed by `ciks` that satisfy
/// `filter`.
///
/// Returns `Ok(None)` when the archive is well-formed but nothing matches,
/// which is the expected outcome for quarters in which no watched company
/// filed a qualifying report.
///
/// # Errors
/// Returns [`DataError::Malformed`] when the archive or one of its tables
/// cannot be decoded.
pub fn scan_archive(
    data: &[u8],
    ciks: &BTreeSet<Cik>,
    filter: &FilterSpec,
) -> Result<Option<Vec<ScannedFact>>> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|e| DataError::Malformed(e.to_string()))?;

    let submissions = read_submissions(&mut archive, ciks, filter)?;
    if submissions.is_empty() {
        debug!("No submissions matched the filter");
        return Ok(None);
    }
    debug!("{} submissions matched the filter", submissions.len());

    let facts = read_facts(&mut archive, &submissions, filter)?;
    if facts.is_empty() {
        debug!("Matching submissions reported no qualifying facts");
        return Ok(None);
    }
    Ok(Some(facts))
}

/// First pass: the submissions a fact row must belong to.
fn read_submissions<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    ciks: &BTreeSet<Cik>,
    filter: &FilterSpec,
) -> Result<HashMap<String, Submission>> {
    let member = archive
        .by_name(SUBMISSIONS_NAME)
        .map_err(|e| DataError::Malformed(format!("{}: {}", SUBMISSIONS_NAME, e)))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(member);

    let headers = reader
        .headers()
        .map_err(|e| DataError::Malformed(format!("{}: {}", SUBMISSIONS_NAME, e)))?
        .clone();
    let columns = Columns::new(
        SUBMISSIONS_NAME,
        &headers,
        &["adsh", "cik", "name", "period", "fy", "fp"],
    )?;

    let mut submissions = HashMap::new();
    let mut record = StringRecord::new();
    while reader
        .read_record(&mut record)
        .map_err(|e| DataError::Malformed(format!("{}: {}", SUBMISSIONS_NAME, e)))?
    {
        let cik_field = columns.get(&record, "cik");
        let cik: u64 = cik_field.parse().map_err(|_| {
            DataError::Malformed(format!("{}: invalid cik {:?}", SUBMISSIONS_NAME, cik_field))
        })?;
        let cik = Cik::new(cik);
        if !ciks.contains(&cik) {
            continue;
        }

        // Submissions without a recognized focus period or fiscal year
        // (event filings and the like) simply never match.
        let Ok(focus_period) = columns.get(&record, "fp").parse::<FocusPeriod>() else {
            continue;
        };
        if !filter.focus_periods().contains(&focus_period) {
            continue;
        }
        let Ok(fiscal_year) = columns.get(&record, "fy").parse::<i32>() else {
            continue;
        };
        if fiscal_year < filter.oldest_year() {
            continue;
        }

        let period_end =
            NaiveDate::parse_from_str(columns.get(&record, "period"), "%Y%m%d").ok();
        submissions.insert(
            columns.get(&record, "adsh").to_string(),
            Submission {
                cik,
                company: columns.get(&record, "name").to_string(),
                fiscal_year,
                focus_period,
                period_end,
            },
        );
    }
    Ok(submissions)
}

/// Second pass: join fact rows against the retained submissions.
fn read_facts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    submissions: &HashMap<String, Submission>,
    filter: &FilterSpec,
) -> Result<Vec<ScannedFact>> {
    let member = archive
        .by_name(FACTS_NAME)
        .map_err(|e| DataError::Malformed(format!("{}: {}", FACTS_NAME, e)))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(member);

    let headers = reader
        .headers()
        .map_err(|e| DataError::Malformed(format!("{}: {}", FACTS_NAME, e)))?
        .clone();
    let columns = Columns::new(FACTS_NAME, &headers, &["adsh", "tag", "ddate", "uom", "value"])?;

    let mut facts = Vec::new();
    let mut scanned = 0usize;
    let mut chunk: Vec<StringRecord> = Vec::new();
    loop {
        chunk.clear();
        while chunk.len() < CHUNK_SIZE {
            let mut record = StringRecord::new();
            if !reader
                .read_record(&mut record)
                .map_err(|e| DataError::Malformed(format!("{}: {}", FACTS_NAME, e)))?
            {
                break;
            }
            chunk.push(record);
        }
        if chunk.is_empty() {
            break;
        }

        scanned += chunk.len();
        join_chunk(&columns, &chunk, submissions, filter, &mut facts)?;
        debug!("Scanned {} fact rows, kept {}", scanned, facts.len());

        if chunk.len() < CHUNK_SIZE {
            break;
        }
    }
    Ok(facts)
}

fn join_chunk(
    columns: &Columns,
    chunk: &[StringRecord],
    submissions: &HashMap<String, Submission>,
    filter: &FilterSpec,
    facts: &mut Vec<ScannedFact>,
) -> Result<()> {
    for record in chunk {
        let accession = columns.get(record, "adsh");
        let Some(submission) = submissions.get(accession) else {
            continue;
        };

        let tag = columns.get(record, "tag");
        if let Some(tags) = filter.tags()
            && !tags.contains(tag)
        {
            continue;
        }

        // Facts without a reported value carry nothing to aggregate.
        let value_field = columns.get(record, "value");
        if value_field.is_empty() {
            continue;
        }
        let value: f64 = value_field.parse().map_err(|_| {
            DataError::Malformed(format!("{}: invalid value {:?}", FACTS_NAME, value_field))
        })?;

        let date_field = columns.get(record, "ddate");
        let data_date = NaiveDate::parse_from_str(date_field, "%Y%m%d").map_err(|_| {
            DataError::Malformed(format!("{}: invalid ddate {:?}", FACTS_NAME, date_field))
        })?;

        facts.push(ScannedFact {
            cik: submission.cik,
            company: submission.company.clone(),
            accession: accession.to_string(),
            tag: tag.to_string(),
            fiscal_year: submission.fiscal_year,
            focus_period: submission.focus_period,
            period_end: submission.period_end,
            data_date,
            unit: columns.get(record, "uom").to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ArchiveBuilder, build_archive, num_row, NUM_HEADER, SUB_HEADER};
    use facts_core::ReportPeriod;

    const APPLE: u64 = 320_193;
    const APPLE_ADSH: &str = "0000320193-23-000106";

    fn annual_filter() -> FilterSpec {
        FilterSpec::new(1, ReportPeriod::new(2023, 4).unwrap()).with_annual_only(true)
    }

    fn apple_only() -> BTreeSet<Cik> {
        [Cik::new(APPLE)].into()
    }

    #[test]
    fn test_scan_joins_facts_to_matching_submissions() {
        let data = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2023)
            .fact(APPLE_ADSH, "Assets", 352_583_000_000.0)
            .fact(APPLE_ADSH, "OperatingIncomeLoss", 114_301_000_000.0)
            .build();

        let facts = scan_archive(&data, &apple_only(), &annual_filter())
            .unwrap()
            .unwrap();

        assert_eq!(facts.len(), 2);
        let assets = facts.iter().find(|f| f.tag == "Assets").unwrap();
        assert_eq!(assets.cik, Cik::new(APPLE));
        assert_eq!(assets.company, "Apple Inc.");
        assert_eq!(assets.accession, APPLE_ADSH);
        assert_eq!(assets.fiscal_year, 2023);
        assert_eq!(assets.focus_period, FocusPeriod::Fy);
        assert_eq!(assets.unit, "USD");
        assert_eq!(assets.value, 352_583_000_000.0);
        assert_eq!(
            assets.data_date,
            NaiveDate::from_ymd_opt(2023, 9, 30).unwrap()
        );
        assert_eq!(
            assets.period_end,
            Some(NaiveDate::from_ymd_opt(2023, 9, 30).unwrap())
        );
    }

    #[test]
    fn test_scan_without_matching_cik_is_no_match() {
        let data = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2023)
            .fact(APPLE_ADSH, "Assets", 1.0)
            .build();

        let result = scan_archive(&data, &[Cik::new(789_019)].into(), &annual_filter()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_annual_only_excludes_quarterly_submissions() {
        let data = ArchiveBuilder::new()
            .quarterly_submission("0000320193-23-000077", APPLE, "Apple Inc.", 2023, "Q3")
            .fact("0000320193-23-000077", "Assets", 1.0)
            .build();

        let result = scan_archive(&data, &apple_only(), &annual_filter()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_quarterly_submissions_match_when_allowed() {
        let data = ArchiveBuilder::new()
            .quarterly_submission("0000320193-23-000077", APPLE, "Apple Inc.", 2023, "Q3")
            .fact("0000320193-23-000077", "Assets", 1.0)
            .build();

        let filter = FilterSpec::new(1, ReportPeriod::new(2023, 4).unwrap());
        let facts = scan_archive(&data, &apple_only(), &filter).unwrap().unwrap();
        assert_eq!(facts[0].focus_period, FocusPeriod::Q3);
    }

    #[test]
    fn test_tag_restriction() {
        let data = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2023)
            .fact(APPLE_ADSH, "Assets", 1.0)
            .fact(APPLE_ADSH, "Liabilities", 2.0)
            .build();

        let filter = annual_filter().with_tags(["Assets"]);
        let facts = scan_archive(&data, &apple_only(), &filter).unwrap().unwrap();

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].tag, "Assets");
    }

    #[test]
    fn test_event_submissions_without_fiscal_labels_are_skipped() {
        let data = ArchiveBuilder::new()
            .event_submission("0000320193-23-000099", APPLE, "Apple Inc.")
            .fact("0000320193-23-000099", "Assets", 1.0)
            .build();

        let result = scan_archive(&data, &apple_only(), &annual_filter()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_fiscal_years_older_than_window_are_skipped() {
        let data = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2019)
            .fact(APPLE_ADSH, "Assets", 1.0)
            .build();

        let result = scan_archive(&data, &apple_only(), &annual_filter()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_facts_without_values_are_skipped() {
        let data = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2023)
            .raw_fact_row(num_row(APPLE_ADSH, "Assets", "20230930", "USD", ""))
            .fact(APPLE_ADSH, "Liabilities", 2.0)
            .build();

        let facts = scan_archive(&data, &apple_only(), &annual_filter())
            .unwrap()
            .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].tag, "Liabilities");
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        let result = scan_archive(b"plainly not a zip", &apple_only(), &annual_filter());
        assert!(matches!(result, Err(DataError::Malformed(_))));
    }

    #[test]
    fn test_missing_facts_table_is_malformed() {
        let sub = format!(
            "{}\n{}\n",
            SUB_HEADER,
            crate::fixtures::sub_row(APPLE_ADSH, APPLE, "Apple Inc.", "20230930", "2023", "FY")
        );
        let data = build_archive(&[("sub.txt", sub)]);

        let result = scan_archive(&data, &apple_only(), &annual_filter());
        assert!(matches!(result, Err(DataError::Malformed(m)) if m.contains("num.txt")));
    }

    #[test]
    fn test_missing_required_column_is_malformed() {
        let data = build_archive(&[
            ("sub.txt", "adsh\tname\tperiod\tfy\tfp\nx\ty\tz\t2023\tFY\n".to_string()),
            ("num.txt", format!("{}\n", NUM_HEADER)),
        ]);

        let result = scan_archive(&data, &apple_only(), &annual_filter());
        assert!(matches!(result, Err(DataError::Malformed(m)) if m.contains("cik")));
    }

    #[test]
    fn test_unparseable_value_is_malformed() {
        let data = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2023)
            .raw_fact_row(num_row(APPLE_ADSH, "Assets", "20230930", "USD", "not-a-number"))
            .build();

        let result = scan_archive(&data, &apple_only(), &annual_filter());
        assert!(matches!(result, Err(DataError::Malformed(_))));
    }

    #[test]
    fn test_columns_may_be_reordered_and_extended() {
        let sub = format!(
            "extra\tfy\tfp\tname\tcik\tadsh\tperiod\nx\t2023\tFY\tApple Inc.\t{}\t{}\t20230930\n",
            APPLE, APPLE_ADSH
        );
        let num = format!(
            "value\tuom\tddate\ttag\tadsh\n42.0\tUSD\t20230930\tAssets\t{}\n",
            APPLE_ADSH
        );
        let data = build_archive(&[("sub.txt", sub), ("num.txt", num)]);

        let facts = scan_archive(&data, &apple_only(), &annual_filter())
            .unwrap()
            .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, 42.0);
    }

    #[test]
    fn test_join_spans_chunk_boundaries() {
        let mut builder = ArchiveBuilder::new()
            .annual_submission(APPLE_ADSH, APPLE, "Apple Inc.", 2023)
            .fact(APPLE_ADSH, "Assets", 1.0);
        for _ in 0..CHUNK_SIZE - 2 {
            builder = builder.raw_fact_row(num_row(
                "0000000000-00-000000",
                "Assets",
                "20230930",
                "USD",
                "0.0",
            ));
        }
        // Last row of the first chunk, then two rows into the second.
        builder = builder
            .fact(APPLE_ADSH, "Liabilities", 2.0)
            .fact(APPLE_ADSH, "Revenues", 3.0)
            .fact(APPLE_ADSH, "GrossProfit", 4.0);
        let data = builder.build();

        let facts = scan_archive(&data, &apple_only(), &annual_filter())
            .unwrap()
            .unwrap();
        let tags: Vec<&str> = facts.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, ["Assets", "Liabilities", "Revenues", "GrossProfit"]);
    }
}
