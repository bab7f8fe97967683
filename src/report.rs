//! Report store: the append-only `student_scores.csv` file.
//!
//! Every append reads the whole file, adds one row, and writes the whole file
//! back. There is no lock: two submissions finishing at the same moment race
//! and the last writer wins.
//!
//! All methods are blocking; async callers run them through
//! `tokio::task::spawn_blocking`.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fixed header row, in column order.
pub const REPORT_HEADER: [&str; 5] = ["Name", "Class & Section", "Roll No", "Score", "Feedback"];

/// One graded submission; one CSV row.
///
/// Columns are matched by header name. A column missing from an older file
/// reads as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Class & Section")]
    pub class_section: String,
    #[serde(rename = "Roll No")]
    pub roll_no: String,
    #[serde(rename = "Score")]
    pub score: String,
    #[serde(rename = "Feedback")]
    pub feedback: String,
}

/// Flat-file store for [`SubmissionRecord`]s.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with only the header row if it does not exist yet.
    pub fn ensure_initialized(&self) -> Result<(), ReportError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        self.write_all(&[])?;
        info!("Initialised report file {}", self.path.display());
        Ok(())
    }

    /// Read every data row (header excluded).
    pub fn rows(&self) -> Result<Vec<SubmissionRecord>, ReportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_err(e))?;

        reader
            .deserialize::<SubmissionRecord>()
            .map(|row| row.map_err(|e| self.csv_err(e)))
            .collect()
    }

    /// Append one row, creating the file with its header first if needed.
    pub fn append(&self, record: &SubmissionRecord) -> Result<(), ReportError> {
        self.ensure_initialized()?;

        let mut rows = self.rows()?;
        rows.push(record.clone());
        self.write_all(&rows)?;

        debug!(
            "Appended report row for roll no {:?} ({} rows total)",
            record.roll_no,
            rows.len()
        );
        Ok(())
    }

    fn write_all(&self, rows: &[SubmissionRecord]) -> Result<(), ReportError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|e| self.csv_err(e))?;

        writer
            .write_record(REPORT_HEADER)
            .map_err(|e| self.csv_err(e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| self.csv_err(e))?;
        }
        writer.flush().map_err(|e| self.io_err(e))
    }

    fn io_err(&self, source: std::io::Error) -> ReportError {
        ReportError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> ReportError {
        ReportError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(roll: &str, feedback: &str) -> SubmissionRecord {
        SubmissionRecord {
            name: "Ada Lovelace".into(),
            class_section: "10-B".into(),
            roll_no: roll.into(),
            score: "8/10".into(),
            feedback: feedback.into(),
        }
    }

    fn header_line(path: &Path) -> String {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn ensure_initialized_writes_header_only() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(tmp.path().join("reports/student_scores.csv"));
        store.ensure_initialized().unwrap();

        assert_eq!(header_line(store.path()), "Name,Class & Section,Roll No,Score,Feedback");
        assert!(store.rows().unwrap().is_empty());
    }

    #[test]
    fn append_to_missing_file_adds_header_and_one_row() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(tmp.path().join("student_scores.csv"));

        store.append(&record("1", "Neat.")).unwrap();

        assert_eq!(header_line(store.path()), "Name,Class & Section,Roll No,Score,Feedback");
        assert_eq!(store.rows().unwrap(), vec![record("1", "Neat.")]);
    }

    #[test]
    fn each_append_adds_exactly_one_row() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(tmp.path().join("student_scores.csv"));
        store.ensure_initialized().unwrap();

        for i in 0..3 {
            let before = store.rows().unwrap().len();
            store.append(&record(&i.to_string(), "ok")).unwrap();
            assert_eq!(store.rows().unwrap().len(), before + 1);
        }

        // Re-submission is just another row.
        store.append(&record("0", "again")).unwrap();
        let rolls: Vec<String> = store.rows().unwrap().into_iter().map(|r| r.roll_no).collect();
        assert_eq!(rolls, vec!["0", "1", "2", "0"]);
    }

    #[test]
    fn multiline_feedback_with_commas_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReportStore::new(tmp.path().join("student_scores.csv"));
        let feedback = "SCORE: 8/10\nGood, but \"show\" steps.\n\n---\n\nSCORE: 7/10";

        store.append(&record("42", feedback)).unwrap();

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].feedback, feedback);
    }

    #[test]
    fn field_names_match_the_header_row() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(record("1", "ok")).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(out.lines().next(), Some(REPORT_HEADER.join(",").as_str()));
    }

    #[test]
    fn short_data_row_under_full_header_reads_empty_feedback() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("student_scores.csv");
        std::fs::write(
            &path,
            "Name,Class & Section,Roll No,Score,Feedback\nBob,9-A,7\nEve,9-A,8,6/10,Fine\n",
        )
        .unwrap();

        let rows = ReportStore::new(&path).rows().unwrap();

        assert_eq!(rows[0].roll_no, "7");
        assert_eq!(rows[0].score, "");
        assert_eq!(rows[0].feedback, "");
        assert_eq!(rows[1].feedback, "Fine");
    }

    #[test]
    fn short_legacy_rows_are_padded_to_five_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("student_scores.csv");
        std::fs::write(&path, "Name,Class & Section,Roll No,Score\nBob,9-A,7,5/10\n").unwrap();
        let store = ReportStore::new(&path);

        store.append(&record("8", "x")).unwrap();

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Bob");
        assert_eq!(rows[0].feedback, "");
        assert_eq!(header_line(&path), "Name,Class & Section,Roll No,Score,Feedback");
    }
}
