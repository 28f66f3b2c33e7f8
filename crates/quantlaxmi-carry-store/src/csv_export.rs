//! Daily CSV files: `<root>/<table>/<table>_<dd-mm-yy>.csv`.
//!
//! A cycle is staged by creating the table directories and serializing all
//! three tables in memory; no file is opened for append until commit. A
//! commit that fails part-way truncates the files it touched back to their
//! previous length.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::Writer as CsvWriter;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::history::{CycleBatch, HistorySink};
use crate::table::{header, render, timestamp, HistoryRow};

const FILE_DATE_FMT: &str = "%d-%m-%y";

/// One serialized table append.
#[derive(Debug)]
struct PendingFile {
    path: PathBuf,
    /// File length before the append; `None` if the file did not exist.
    prior_len: Option<u64>,
    bytes: Vec<u8>,
}

impl PendingFile {
    fn restore(&self) -> std::io::Result<()> {
        match self.prior_len {
            Some(len) => OpenOptions::new().write(true).open(&self.path)?.set_len(len),
            None => match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        }
    }
}

#[derive(Debug, Default)]
enum CycleState {
    #[default]
    Idle,
    Staged(Vec<PendingFile>),
    Committed(Vec<PendingFile>),
}

pub struct CsvHistory {
    root: PathBuf,
    state: CycleState,
}

impl CsvHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: CycleState::Idle,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Daily file for `table` on `day`.
    pub fn file_path(&self, table: &str, day: NaiveDate) -> PathBuf {
        self.root
            .join(table)
            .join(format!("{table}_{}.csv", day.format(FILE_DATE_FMT)))
    }

    fn serialize<R: HistoryRow>(&self, batch: &CycleBatch<'_>, rows: &[R]) -> StoreResult<PendingFile> {
        let path = self.file_path(R::TABLE, batch.cycle_ts.date());
        let dir = self.root.join(R::TABLE);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let prior_len = match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => {
                return Err(StoreError::io(
                    &path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let mut writer = CsvWriter::from_writer(Vec::new());
        if prior_len.unwrap_or(0) == 0 {
            writer.write_record(header::<R>())?;
        }
        let cycle_ts = render(&timestamp(batch.cycle_ts));
        for row in rows {
            let values = row.values();
            let record = std::iter::once(cycle_ts.clone()).chain(values.iter().map(render));
            writer.write_record(record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| StoreError::io(&path, e.into_error()))?;

        Ok(PendingFile {
            path,
            prior_len,
            bytes,
        })
    }

    fn restore_all(files: &[PendingFile]) {
        for file in files {
            if let Err(e) = file.restore() {
                warn!(path = %file.path.display(), error = %e, "[STORE] Could not restore CSV file");
            }
        }
    }
}

impl HistorySink for CsvHistory {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn stage(&mut self, batch: &CycleBatch<'_>) -> StoreResult<()> {
        self.state = CycleState::Idle;
        let files = vec![
            self.serialize(batch, batch.futures)?,
            self.serialize(batch, batch.carry)?,
            self.serialize(batch, batch.spreads)?,
        ];
        self.state = CycleState::Staged(files);
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        let files = match std::mem::take(&mut self.state) {
            CycleState::Staged(files) => files,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        for (i, file) in files.iter().enumerate() {
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file.path)
                .and_then(|mut f| f.write_all(&file.bytes));
            if let Err(e) = written {
                Self::restore_all(&files[..=i]);
                return Err(StoreError::io(&file.path, e));
            }
        }

        info!(
            files = files.len(),
            bytes = files.iter().map(|f| f.bytes.len()).sum::<usize>(),
            root = %self.root.display(),
            "[STORE] Cycle appended to CSV"
        );
        self.state = CycleState::Committed(files);
        Ok(())
    }

    fn rollback(&mut self) {
        if let CycleState::Committed(files) = std::mem::take(&mut self.state) {
            Self::restore_all(&files);
            info!(root = %self.root.display(), "[STORE] CSV cycle rolled back");
        }
    }

    fn undoes_commit(&self) -> bool {
        true
    }
}
