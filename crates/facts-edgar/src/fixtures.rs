//! Shared builders for synthetic quarterly archives.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub(crate) const SUB_HEADER: &str = "adsh\tcik\tname\tcountryba\tform\tperiod\tfy\tfp\tfiled";
pub(crate) const NUM_HEADER: &str = "adsh\ttag\tversion\tcoreg\tddate\tqtrs\tuom\tvalue\tfootnote";

pub(crate) fn sub_row(
    adsh: &str,
    cik: u64,
    name: &str,
    period: &str,
    fy: &str,
    fp: &str,
) -> String {
    let form = if fp == "FY" { "10-K" } else { "10-Q" };
    format!("{adsh}\t{cik}\t{name}\tUS\t{form}\t{period}\t{fy}\t{fp}\t20231103")
}

/// A fact row without the trailing footnote field, as published archives
/// commonly omit it.
pub(crate) fn num_row(adsh: &str, tag: &str, ddate: &str, uom: &str, value: &str) -> String {
    format!("{adsh}\t{tag}\tus-gaap/2023\t\t{ddate}\t0\t{uom}\t{value}")
}

/// Zips the given members into an in-memory archive.
pub(crate) fn build_archive(members: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Assembles a well-formed quarterly archive row by row.
pub(crate) struct ArchiveBuilder {
    sub_rows: Vec<String>,
    num_rows: Vec<String>,
}

impl ArchiveBuilder {
    pub(crate) fn new() -> Self {
        Self {
            sub_rows: Vec::new(),
            num_rows: Vec::new(),
        }
    }

    pub(crate) fn annual_submission(mut self, adsh: &str, cik: u64, name: &str, fy: i32) -> Self {
        let period = format!("{fy}0930");
        self.sub_rows
            .push(sub_row(adsh, cik, name, &period, &fy.to_string(), "FY"));
        self
    }

    pub(crate) fn quarterly_submission(
        mut self,
        adsh: &str,
        cik: u64,
        name: &str,
        fy: i32,
        fp: &str,
    ) -> Self {
        let period = format!("{fy}0630");
        self.sub_rows
            .push(sub_row(adsh, cik, name, &period, &fy.to_string(), fp));
        self
    }

    /// An event-style submission that carries no fiscal year or period.
    pub(crate) fn event_submission(mut self, adsh: &str, cik: u64, name: &str) -> Self {
        self.sub_rows
            .push(sub_row(adsh, cik, name, "20230930", "", ""));
        self
    }

    pub(crate) fn fact(mut self, adsh: &str, tag: &str, value: f64) -> Self {
        self.num_rows
            .push(num_row(adsh, tag, "20230930", "USD", &format!("{value:.4}")));
        self
    }

    pub(crate) fn raw_fact_row(mut self, row: String) -> Self {
        self.num_rows.push(row);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        build_archive(&[
            ("sub.txt", member_text(SUB_HEADER, &self.sub_rows)),
            ("num.txt", member_text(NUM_HEADER, &self.num_rows)),
        ])
    }
}

fn member_text(header: &str, rows: &[String]) -> String {
    let mut text = String::from(header);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}
