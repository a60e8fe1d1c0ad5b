//! CSV-backed run file: `Name,Is Person,Link,Search Results`.
//!
//! Every write replaces the file atomically (temp file in the same directory,
//! then rename), so an interrupted write leaves the previous version intact.
//!
//! The file is treated as a sheet the pipeline only partly owns. Columns it
//! does not know, and cells whose meaning did not change, are written back
//! exactly as they were read.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeZone};
use tempfile::NamedTempFile;
use tracing::debug;

use trendscout_common::{
    parse_person_flag, person_flag_text, Record, SearchResults, TrendScoutError, COL_IS_PERSON,
    COL_LINK, COL_NAME, COL_SEARCH_RESULTS,
};

use crate::traits::RecordStore;

pub const RUN_FILE_PREFIX: &str = "google_trends_tv_results_";

/// File name for a run started at `at`, e.g. `google_trends_tv_results_16_10_2026_09-15AM.csv`.
pub fn run_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{RUN_FILE_PREFIX}{}.csv", at.format("%d_%m_%Y_%I-%M%p"))
}

/// Positions of the columns the pipeline reads and writes.
#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    is_person: usize,
    link: usize,
    search_results: usize,
}

/// Header and raw cells as last read or written.
struct Sheet {
    header: Vec<String>,
    columns: Columns,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    fn fresh() -> Self {
        Self {
            header: [COL_NAME, COL_IS_PERSON, COL_LINK, COL_SEARCH_RESULTS]
                .map(String::from)
                .to_vec(),
            columns: Columns {
                name: 0,
                is_person: 1,
                link: 2,
                search_results: 3,
            },
            rows: Vec::new(),
        }
    }

    /// Cells for `record` at position `idx`. Starts from the raw row when it
    /// still belongs to the same name and only replaces cells whose value
    /// differs from the record.
    fn render(&self, idx: usize, record: &Record) -> Vec<String> {
        let c = self.columns;
        let mut cells = match self.rows.get(idx) {
            Some(raw) if raw.get(c.name) == Some(&record.name) => raw.clone(),
            _ => vec![String::new(); self.header.len()],
        };

        cells[c.name].clone_from(&record.name);
        if parse_person_flag(&cells[c.is_person]) != Some(record.is_person) {
            cells[c.is_person] = person_flag_text(record.is_person).to_string();
        }
        cells[c.link].clone_from(&record.link);
        if SearchResults::from_cell(&cells[c.search_results]) != record.search_results {
            cells[c.search_results] = record
                .search_results
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
        }
        cells
    }
}

pub struct CsvRecordStore {
    path: PathBuf,
    sheet: Mutex<Option<Sheet>>,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TrendScoutError {
        TrendScoutError::Store {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> TrendScoutError {
        TrendScoutError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn malformed(&self, reason: String) -> TrendScoutError {
        TrendScoutError::MalformedRunFile {
            path: self.path.clone(),
            reason,
        }
    }

    fn column(&self, header: &[String], title: &str) -> Result<usize, TrendScoutError> {
        header
            .iter()
            .position(|h| h.trim() == title)
            .ok_or_else(|| self.malformed(format!("missing `{title}` column")))
    }

    fn parse_row(
        &self,
        line: usize,
        cells: &[String],
        c: Columns,
    ) -> Result<Record, TrendScoutError> {
        let flag = &cells[c.is_person];
        let is_person = parse_person_flag(flag).ok_or_else(|| {
            self.malformed(format!("line {line}: invalid `{COL_IS_PERSON}` value `{flag}`"))
        })?;
        Ok(Record {
            name: cells[c.name].clone(),
            is_person,
            link: cells[c.link].clone(),
            search_results: SearchResults::from_cell(&cells[c.search_results]),
        })
    }
}

impl RecordStore for CsvRecordStore {
    fn read_all(&self) -> Result<Vec<Record>, TrendScoutError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut header: Vec<String> = reader
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(str::to_string)
            .collect();
        let search_results = match header.iter().position(|h| h.trim() == COL_SEARCH_RESULTS) {
            Some(idx) => idx,
            None => {
                header.push(COL_SEARCH_RESULTS.to_string());
                header.len() - 1
            }
        };
        let columns = Columns {
            name: self.column(&header, COL_NAME)?,
            is_person: self.column(&header, COL_IS_PERSON)?,
            link: self.column(&header, COL_LINK)?,
            search_results,
        };

        let mut rows = Vec::new();
        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row.map_err(|e| self.csv_error(e))?;
            let mut cells: Vec<String> = row.iter().map(str::to_string).collect();
            if cells.len() < header.len() {
                cells.resize(header.len(), String::new());
            }
            // Line 1 is the header.
            records.push(self.parse_row(idx + 2, &cells, columns)?);
            rows.push(cells);
        }

        debug!(path = %self.path.display(), rows = records.len(), "Run file loaded");
        *self.sheet.lock().unwrap_or_else(PoisonError::into_inner) = Some(Sheet {
            header,
            columns,
            rows,
        });
        Ok(records)
    }

    fn write_all(&self, records: &[Record]) -> Result<(), TrendScoutError> {
        let mut guard = self.sheet.lock().unwrap_or_else(PoisonError::into_inner);
        let sheet = guard.get_or_insert_with(Sheet::fresh);
        let rows: Vec<Vec<String>> = records
            .iter()
            .enumerate()
            .map(|(idx, record)| sheet.render(idx, record))
            .collect();

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(tmp);
        writer
            .write_record(&sheet.header)
            .map_err(|e| self.csv_error(e))?;
        for row in &rows {
            writer.write_record(row).map_err(|e| self.csv_error(e))?;
        }
        let mut tmp = writer
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;
        tmp.flush().map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        sheet.rows = rows;
        debug!(path = %self.path.display(), rows = records.len(), "Run file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use trendscout_common::SearchResults;

    use super::*;

    fn sample() -> Vec<Record> {
        let mut done = Record::new("Pedro Pascal", true).unwrap();
        done.search_results = Some(SearchResults::Count(1_250_000));
        let mut skipped = Record::new("Love Island", false).unwrap();
        skipped.search_results = Some(SearchResults::NotAPerson);
        vec![done, skipped, Record::new("Zoë Kravitz", true).unwrap()]
    }

    #[test]
    fn file_name_embeds_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 10, 16, 21, 5, 0).unwrap();
        assert_eq!(
            run_file_name(&at),
            "google_trends_tv_results_16_10_2026_09-05PM.csv"
        );
    }

    #[test]
    fn round_trip_preserves_rows_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvRecordStore::new(dir.path().join("run.csv"));
        let records = sample();

        store.write_all(&records).unwrap();
        assert_eq!(store.read_all().unwrap(), records);
        assert_eq!(CsvRecordStore::new(store.path()).read_all().unwrap(), records);
    }

    #[test]
    fn header_uses_column_titles() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvRecordStore::new(dir.path().join("run.csv"));
        store.write_all(&sample()).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Name,Is Person,Link,Search Results"));
        assert_eq!(
            lines.next(),
            Some("Pedro Pascal,True,https://www.google.com/search?q=Pedro+Pascal&hl=en&gl=us,1250000")
        );
        assert_eq!(
            lines.nth(1),
            Some("Zoë Kravitz,True,https://www.google.com/search?q=Zo%C3%AB+Kravitz&hl=en&gl=us,")
        );
    }

    #[test]
    fn missing_search_results_column_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage_one.csv");
        std::fs::write(
            &path,
            "Name,Is Person,Link\nJohn Smith,True,https://example.com/a\nLove Island,False,https://example.com/b\n",
        )
        .unwrap();

        let records = CsvRecordStore::new(&path).read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.search_results.is_none()));
        assert!(records[0].is_person);
        assert!(!records[1].is_person);
    }

    #[test]
    fn blank_and_na_cells_are_not_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        std::fs::write(
            &path,
            "Name,Is Person,Link,Search Results\nA Person,True,l1,\nB Person,True,l2,N/A\nC Person,True,l3,42\n",
        )
        .unwrap();

        let records = CsvRecordStore::new(&path).read_all().unwrap();
        let processed: Vec<bool> = records.iter().map(Record::is_processed).collect();
        assert_eq!(processed, vec![false, false, true]);
    }

    #[test]
    fn missing_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvRecordStore::new(dir.path().join("nope.csv"))
            .read_all()
            .unwrap_err();
        assert!(matches!(err, TrendScoutError::Store { .. }));
    }

    #[test]
    fn malformed_flag_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Name,Is Person,Link\nX,True,l\nY,maybe,l\n").unwrap();
        let err = CsvRecordStore::new(&path).read_all().unwrap_err();
        match err {
            TrendScoutError::MalformedRunFile { reason, .. } => {
                assert!(reason.starts_with("line 3:"), "{reason}");
                assert!(reason.contains("maybe"));
            }
            other => panic!("expected MalformedRunFile, got {other:?}"),
        }
    }

    #[test]
    fn missing_name_column_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Title,Is Person,Link\nX,True,l\n").unwrap();
        let err = CsvRecordStore::new(&path).read_all().unwrap_err();
        assert!(matches!(err, TrendScoutError::MalformedRunFile { .. }));
    }

    #[test]
    fn unchanged_rows_and_unknown_columns_are_written_back_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.csv");
        let original = "Name,Is Person,Link,Search Results,Notes\n\
                        Ann Lee,yes,l0,0012500,keep me\n\
                        Bo Diaz,1,l1, N/A ,\n\
                        The Bear,no,l2,,renewed\n";
        std::fs::write(&path, original).unwrap();

        let store = CsvRecordStore::new(&path);
        let records = store.read_all().unwrap();
        assert_eq!(records[0].search_results, Some(SearchResults::Count(12_500)));
        assert!(records[1].is_person);
        store.write_all(&records).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn changed_cells_are_replaced_and_the_rest_of_the_row_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.csv");
        std::fs::write(
            &path,
            "Name,Is Person,Link,Search Results,Notes\nAnn Lee,yes,l0,,call back\n",
        )
        .unwrap();

        let store = CsvRecordStore::new(&path);
        let mut records = store.read_all().unwrap();
        records[0].search_results = Some(SearchResults::Count(77));
        store.write_all(&records).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Name,Is Person,Link,Search Results,Notes\nAnn Lee,yes,l0,77,call back\n"
        );
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvRecordStore::new(dir.path().join("run.csv"));
        let mut records = sample();
        store.write_all(&records).unwrap();

        records[2].search_results = Some(SearchResults::NotAvailable);
        store.write_all(&records).unwrap();

        let reread = store.read_all().unwrap();
        assert_eq!(reread[2].search_results, Some(SearchResults::NotAvailable));
        assert_eq!(reread.len(), 3);
    }
}
