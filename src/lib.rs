//! Compares two versions of a booking list PDF dossier by dossier and reports
//! field-level changes.
//!
//! The pipeline is extract -> split -> parse -> compare -> report. Every stage
//! is a plain function of its inputs, and the web server keeps no report
//! between requests.

pub mod compare;
pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod parser;
pub mod report;
pub mod server;
pub mod splitter;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use compare::{ChangeEntry, FieldName, Status, Summary, compare};
pub use config::Config;
pub use error::{CompareError, Result};
pub use extract::{PdfTextExtractor, TextExtractor};
pub use parser::{ParsedRecord, ParsedSet, RecordRules};
pub use report::{REPORT_FILE_NAME, ReportOptions, render_table_html, write_xlsx};

/// A named input file, usually one of the two uploaded PDFs.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub summary: Summary,
    pub entries: Vec<ChangeEntry>,
    pub generated_at: DateTime<Utc>,
}

pub fn parse_records(text: &str, rules: &RecordRules) -> ParsedSet {
    ParsedSet::from_text(text, rules)
}

pub fn compare_texts(old_text: &str, new_text: &str, rules: &RecordRules) -> Comparison {
    let old = parse_records(old_text, rules);
    let new = parse_records(new_text, rules);
    for (side, set) in [("old", &old), ("new", &new)] {
        if set.is_empty() {
            tracing::warn!(side, "no dossiers found in {side} file");
        }
    }
    let entries = compare(&old, &new);
    let summary = Summary::tally(&old, &new, &entries);
    tracing::info!(%summary, "comparison finished");
    Comparison {
        summary,
        entries,
        generated_at: Utc::now(),
    }
}

/// Extracts both files before comparing anything, so a document that cannot
/// be read fails the whole run instead of producing a one-sided report.
pub fn compare_documents(
    extractor: &dyn TextExtractor,
    old: SourceFile<'_>,
    new: SourceFile<'_>,
    rules: &RecordRules,
) -> Result<Comparison> {
    let old_text = extractor.extract(old.name, old.bytes)?;
    let new_text = extractor.extract(new.name, new.bytes)?;
    Ok(compare_texts(&old_text, &new_text, rules))
}

pub fn compare_pdfs(old: SourceFile<'_>, new: SourceFile<'_>, rules: &RecordRules) -> Result<Comparison> {
    compare_documents(&PdfTextExtractor, old, new, rules)
}
