//! Per-file ingestion: machine id → grid → summary → breakdowns → store → route.
//!
//! Files are handled one at a time. Any failure while reading, parsing or
//! storing a file sends that file to the error folder and the batch moves on
//! to the next one; only configuration and setup problems stop the batch.

use chrono::{DateTime, Local};
use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::error::Result;
use super::db_writer::LogStore;
use super::grid::{read_grid, GridReader};
use super::machine_id::resolve_parts_counter_no;
use super::records::{parse_breakdown, parse_summary};
use super::router::{FileRouter, Outcome};
use super::walker::{discover_log_files, LogFile};

/// Sheet row holding the summary record
pub const SUMMARY_ROW: usize = 2;
/// First sheet row holding a breakdown record
pub const FIRST_BREAKDOWN_ROW: usize = 4;

/// What one stored file produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredFile {
    pub summary_id: i64,
    pub breakdowns: usize,
}

/// Totals of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub summaries_saved: usize,
    pub breakdowns_saved: usize,
    /// Files that could not be moved and were left in the source folder
    pub move_failures: usize,
}

/// Ingestion driver bound to one configuration, grid reader and store
pub struct Pipeline<'a, G, S> {
    config: &'a Config,
    reader: G,
    store: S,
}

impl<'a, G: GridReader, S: LogStore> Pipeline<'a, G, S> {
    pub fn new(config: &'a Config, reader: G, store: S) -> Self {
        Self { config, reader, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every file currently in the source folder
    pub fn run(&self) -> Result<BatchReport> {
        self.run_at(Local::now())
    }

    /// Same as [`Pipeline::run`], with the dated destination folders derived
    /// from `now`.
    pub fn run_at(&self, now: DateTime<Local>) -> Result<BatchReport> {
        self.config.check_folders()?;
        let files = discover_log_files(self.config.source_dir())?;
        let mut report = BatchReport {
            discovered: files.len(),
            ..BatchReport::default()
        };

        if files.is_empty() {
            log::warn!("No XLSX files found in: {}", self.config.source_dir().display());
            return Ok(report);
        }

        log::info!("Collecting data is on-going.");
        let router = FileRouter::new(
            self.config.archive_root(),
            self.config.error_root(),
            now,
            self.config.month_folder(),
        )?;

        let start = Instant::now();
        let total = files.len();
        for (idx, file) in files.iter().enumerate() {
            log::info!(
                "[{}/{}] Processing: {} ({} bytes)",
                idx + 1,
                total,
                file.file_name,
                file.file_size
            );

            let outcome = match self.process_file(file) {
                Ok(stored) => {
                    report.succeeded += 1;
                    report.summaries_saved += 1;
                    report.breakdowns_saved += stored.breakdowns;
                    log::info!(
                        "✓ {} (summary {}, {} breakdown rows)",
                        file.file_name,
                        stored.summary_id,
                        stored.breakdowns
                    );
                    Outcome::Success
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.failed += 1;
                    log::error!("✗ Error processing file {}: {}", file.file_name, e);
                    Outcome::Error
                }
            };

            if !route_or_log(&router, &file.absolute_path, outcome) {
                report.move_failures += 1;
            }
        }

        log::info!("Collecting data is successful! ({:?})", start.elapsed());
        Ok(report)
    }

    /// Read, parse and store one file. Nothing is written unless the whole
    /// sheet parses.
    pub fn process_file(&self, file: &LogFile) -> Result<StoredFile> {
        let parts_counter_no = resolve_parts_counter_no(&file.file_name)?;
        let grid = read_grid(&self.reader, &file.absolute_path)?;

        let summary = parse_summary(&grid.row(SUMMARY_ROW), parts_counter_no)?;
        let mut breakdowns = (FIRST_BREAKDOWN_ROW..=grid.row_count())
            .map(|row| parse_breakdown(&grid.row(row), parts_counter_no))
            .collect::<Result<Vec<_>>>()?;

        let summary_id = self.store.save_summary(&summary)?;
        for breakdown in &mut breakdowns {
            breakdown.summary_id = summary_id;
        }
        let saved = self.store.save_breakdowns(&breakdowns, summary_id)?;

        Ok(StoredFile {
            summary_id,
            breakdowns: saved,
        })
    }
}

/// Move failures leave the file where it is; they are logged, not raised.
fn route_or_log(router: &FileRouter, path: &Path, outcome: Outcome) -> bool {
    match router.route(path, outcome) {
        Ok(_) => true,
        Err(e) => {
            let folder = match outcome {
                Outcome::Success => "archive",
                Outcome::Error => "error",
            };
            log::error!(
                "Failed to move file '{}' to {} folder: {}",
                path.display(),
                folder,
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::error::IngestError;
    use crate::ingest::db_writer::SqliteStore;
    use crate::ingest::grid::Grid;
    use crate::ingest::records::{Breakdown, Summary};
    use chrono::TimeZone;
    use rusqlite::params;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Grids keyed by file name; `None` is a workbook without sheets
    #[derive(Default)]
    struct FakeReader {
        sheets: HashMap<String, Option<Grid>>,
        reads: RefCell<Vec<String>>,
    }

    impl GridReader for FakeReader {
        fn read_first_sheet(&self, path: &Path) -> Result<Option<Grid>> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.reads.borrow_mut().push(name.clone());
            self.sheets.get(&name).cloned().ok_or_else(|| {
                IngestError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "unreadable"))
            })
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        summaries: RefCell<Vec<Summary>>,
        breakdowns: RefCell<Vec<(i64, Breakdown)>>,
        reject_item: Option<String>,
    }

    impl LogStore for RecordingStore {
        fn save_summary(&self, summary: &Summary) -> Result<i64> {
            if self.reject_item.as_deref() == Some(summary.item_code.as_str()) {
                return Err(IngestError::Database(rusqlite::Error::InvalidQuery));
            }
            self.summaries.borrow_mut().push(summary.clone());
            Ok(40 + self.summaries.borrow().len() as i64)
        }

        fn save_breakdowns(&self, breakdowns: &[Breakdown], summary_id: i64) -> Result<usize> {
            let mut stored = self.breakdowns.borrow_mut();
            for b in breakdowns {
                stored.push((summary_id, b.clone()));
            }
            Ok(breakdowns.len())
        }
    }

    struct Folders {
        _temp_dir: TempDir,
        root: PathBuf,
        config: Config,
    }

    impl Folders {
        fn source(&self) -> PathBuf {
            self.root.join("incoming")
        }

        fn drop_file(&self, name: &str) -> PathBuf {
            let path = self.source().join(name);
            fs::write(&path, "xlsx bytes").unwrap();
            path
        }
    }

    fn setup() -> Folders {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        for dir in ["incoming", "error", "archive"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        let p = |name: &str| root.join(name).to_str().unwrap().replace('\\', "\\\\");
        let config = Config::from_toml_str(&format!(
            r#"
[connection_strings]
default_connection = "{}"

[file_settings]
logs_source_path = "{}"
error_logs_path = "{}"
archive_logs_path = "{}"
"#,
            p("parts.db"),
            p("incoming"),
            p("error"),
            p("archive"),
        ))
        .unwrap();
        Folders { _temp_dir: temp_dir, root, config }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn valid_sheet() -> Grid {
        grid(&[
            &["Datetime", "Item", "Batch", "Sublot", "Blocks", "Actual", "NG", "Unacc", "Reason", "High reason"],
            &["17102026 06:30:00", "ITEM-7", "B42", "S1", "2", "1180", "3", "9", "", ""],
            &["Datetime", "Item", "Batch", "Sublot", "Pallet", "Actual", "Op"],
            &["17102026 07:00:00", "ITEM-7", "B42", "S1", "1", "590", "OP-20"],
            &["17102026 07:45:00", "ITEM-7", "B42", "S1", "2", "590", "OP-20"],
        ])
    }

    fn reader_with(entries: Vec<(&str, Option<Grid>)>) -> FakeReader {
        FakeReader {
            sheets: entries.into_iter().map(|(n, g)| (n.to_string(), g)).collect(),
            ..FakeReader::default()
        }
    }

    #[test]
    fn test_valid_file_is_stored_and_archived() {
        let folders = setup();
        let source_file = folders.drop_file("run_12.xlsx");
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("run_12.xlsx", Some(valid_sheet()))]),
            RecordingStore::default(),
        );

        let report = pipeline.run_at(now()).unwrap();

        assert_eq!(report.discovered, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.summaries_saved, 1);
        assert_eq!(report.breakdowns_saved, 2);

        let store = pipeline.store();
        let summaries = store.summaries.borrow();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].parts_counter_no, 12);
        assert_eq!(summaries[0].actual_count, 1180);

        let breakdowns = store.breakdowns.borrow();
        assert_eq!(breakdowns.len(), 2);
        for (summary_id, b) in breakdowns.iter() {
            assert_eq!(*summary_id, 41);
            assert_eq!(b.summary_id, 41);
            assert_eq!(b.parts_counter_no, 12);
        }
        assert_eq!(breakdowns[1].1.pallet_no, 2);

        assert!(!source_file.exists());
        assert!(folders.root.join("archive/2026/October/run_12.xlsx").exists());
    }

    #[test]
    fn test_blank_item_code_goes_to_error_without_writes() {
        let folders = setup();
        folders.drop_file("run_3.xlsx");
        let mut sheet_rows: Vec<Vec<String>> = (1..=valid_sheet().row_count())
            .map(|r| valid_sheet().row(r))
            .collect();
        sheet_rows[1][1] = String::new();
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("run_3.xlsx", Some(Grid::from_rows(sheet_rows)))]),
            RecordingStore::default(),
        );

        let report = pipeline.run_at(now()).unwrap();

        assert_eq!(report.failed, 1);
        assert!(pipeline.store().summaries.borrow().is_empty());
        assert!(pipeline.store().breakdowns.borrow().is_empty());
        assert!(folders.root.join("error/2026/October/run_3.xlsx").exists());
    }

    #[test]
    fn test_bad_file_name_is_rejected_before_reading() {
        let folders = setup();
        folders.drop_file("nocounter.xlsx");
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("nocounter.xlsx", Some(valid_sheet()))]),
            RecordingStore::default(),
        );

        let report = pipeline.run_at(now()).unwrap();

        assert_eq!(report.failed, 1);
        assert!(pipeline.reader.reads.borrow().is_empty());
        assert!(folders.root.join("error/2026/October/nocounter.xlsx").exists());
    }

    #[test]
    fn test_workbook_without_sheet_goes_to_error() {
        let folders = setup();
        folders.drop_file("run_4.xlsx");
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("run_4.xlsx", None)]),
            RecordingStore::default(),
        );

        let file = LogFile {
            file_name: "run_4.xlsx".to_string(),
            absolute_path: folders.source().join("run_4.xlsx"),
            file_size: 0,
        };
        assert!(matches!(pipeline.process_file(&file), Err(IngestError::NoWorksheet(_))));

        let report = pipeline.run_at(now()).unwrap();
        assert_eq!(report.failed, 1);
        assert!(folders.root.join("error/2026/October/run_4.xlsx").exists());
    }

    #[test]
    fn test_blank_breakdown_row_fails_whole_file() {
        let folders = setup();
        folders.drop_file("run_5.xlsx");
        let mut rows: Vec<Vec<String>> = (1..=valid_sheet().row_count())
            .map(|r| valid_sheet().row(r))
            .collect();
        rows.push(vec![String::new(); 7]);
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("run_5.xlsx", Some(Grid::from_rows(rows)))]),
            RecordingStore::default(),
        );

        let report = pipeline.run_at(now()).unwrap();
        assert_eq!(report.failed, 1);
        assert!(pipeline.store().summaries.borrow().is_empty());
    }

    #[test]
    fn test_one_bad_file_does_not_stop_the_batch() {
        let folders = setup();
        folders.drop_file("a_1.xlsx");
        folders.drop_file("b_2.xlsx");
        folders.drop_file("c_3.xlsx");

        let mut rejected: Vec<Vec<String>> = (1..=valid_sheet().row_count())
            .map(|r| valid_sheet().row(r))
            .collect();
        rejected[1][1] = "REJECT".to_string();

        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![
                ("a_1.xlsx", Some(valid_sheet())),
                ("b_2.xlsx", Some(Grid::from_rows(rejected))),
                ("c_3.xlsx", Some(valid_sheet())),
            ]),
            RecordingStore {
                reject_item: Some("REJECT".to_string()),
                ..RecordingStore::default()
            },
        );

        let report = pipeline.run_at(now()).unwrap();

        assert_eq!(report.discovered, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.breakdowns_saved, 4);
        assert_eq!(report.move_failures, 0);
        assert!(folders.root.join("archive/2026/October/a_1.xlsx").exists());
        assert!(folders.root.join("error/2026/October/b_2.xlsx").exists());
        assert!(folders.root.join("archive/2026/October/c_3.xlsx").exists());
    }

    #[test]
    fn test_missing_folder_aborts_before_any_file_is_touched() {
        let folders = setup();
        let source_file = folders.drop_file("run_12.xlsx");
        fs::remove_dir_all(folders.root.join("error")).unwrap();
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("run_12.xlsx", Some(valid_sheet()))]),
            RecordingStore::default(),
        );

        let err = pipeline.run_at(now()).unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, IngestError::Config(_)));
        assert!(source_file.exists());
        assert!(pipeline.reader.reads.borrow().is_empty());
        assert!(pipeline.store().summaries.borrow().is_empty());
        assert!(!folders.root.join("error").exists());
    }

    #[test]
    fn test_empty_source_creates_nothing() {
        let folders = setup();
        let pipeline = Pipeline::new(&folders.config, FakeReader::default(), RecordingStore::default());

        let report = pipeline.run_at(now()).unwrap();

        assert_eq!(report, BatchReport::default());
        assert!(!folders.root.join("archive/2026").exists());
        assert!(!folders.root.join("error/2026").exists());
    }

    #[test]
    fn test_sqlite_end_to_end() {
        let folders = setup();
        folders.drop_file("line_9.xlsx");
        let db = Db::new(folders.config.db_path());
        db.ensure_schema().unwrap();
        let pipeline = Pipeline::new(
            &folders.config,
            reader_with(vec![("line_9.xlsx", Some(valid_sheet()))]),
            SqliteStore::new(db),
        );

        let report = pipeline.run_at(now()).unwrap();
        assert_eq!(report.succeeded, 1);

        pipeline.store().db().with_connection(|conn| {
            let (summary_id, counter): (i64, i64) = conn.query_row(
                "SELECT id, log_part_counter_no FROM summary_logs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            assert_eq!(counter, 9);

            let children: i64 = conn.query_row(
                "SELECT COUNT(*) FROM breakdown_logs WHERE summary_id = ?1",
                params![summary_id],
                |row| row.get(0),
            )?;
            assert_eq!(children, 2);
            Ok::<(), IngestError>(())
        }).unwrap();

        assert!(folders.root.join("archive/2026/October/line_9.xlsx").exists());
    }
}
