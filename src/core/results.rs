// petribench - core/results.rs
//
// Per-process result tables.
//
// One CSV file per process (`<results_root>/<process>.csv`) with the fixed
// header from `constants::RESULT_COLUMNS` and one row per recorded approach.
// The table doubles as the idempotency ledger: an approach with a row is
// never analysed again for that process.
//
// Concurrency: every operation on a table runs under a per-process lock held
// by the store. `append` re-checks the name column under that lock, so an
// approach name appears at most once per table even when two units race
// past the skip check. Appends write one row at the end of the file instead
// of rewriting the table.

use crate::core::model::MetricRecord;
use crate::util::constants;
use crate::util::error::StoreError;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of [`ResultStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Written,
    /// A row with the same name was already in the table; nothing written.
    AlreadyPresent,
}

/// Reader/writer for all result tables under one root directory.
#[derive(Debug)]
pub struct ResultStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ResultStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the table for `process_name`.
    pub fn table_path(&self, process_name: &str) -> PathBuf {
        self.root.join(format!(
            "{process_name}.{}",
            constants::RESULT_TABLE_EXTENSION
        ))
    }

    /// Create an empty table with the fixed header if none exists.
    pub fn ensure_table(&self, process_name: &str) -> Result<(), StoreError> {
        let lock = self.lock_for(process_name);
        let _guard = acquire(&*lock);
        self.ensure_table_locked(process_name)
    }

    /// True if `approach_name` already has a row in `process_name`'s table.
    pub fn is_already_analyzed(
        &self,
        process_name: &str,
        approach_name: &str,
    ) -> Result<bool, StoreError> {
        let lock = self.lock_for(process_name);
        let _guard = acquire(&*lock);
        self.ensure_table_locked(process_name)?;

        let (_, found) = scan_table(&self.table_path(process_name), approach_name)?;
        Ok(found)
    }

    /// Append `record` to `process_name`'s table unless a row with the same
    /// name already exists.
    ///
    /// The table header must be exactly `constants::RESULT_COLUMNS`; rows are
    /// written in that order.
    pub fn append(
        &self,
        process_name: &str,
        record: &MetricRecord,
    ) -> Result<Appended, StoreError> {
        let lock = self.lock_for(process_name);
        let _guard = acquire(&*lock);
        self.ensure_table_locked(process_name)?;

        let path = self.table_path(process_name);
        let (headers, found) = scan_table(&path, &record.name)?;
        if !headers.iter().eq(constants::RESULT_COLUMNS.iter().copied()) {
            return Err(StoreError::HeaderMismatch {
                path,
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }
        if found {
            tracing::debug!(
                process = process_name,
                approach = %record.name,
                "Row already present, not appended"
            );
            return Ok(Appended::AlreadyPresent);
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(record).map_err(|e| csv_error(&path, e))?;
        writer.flush().map_err(|e| io_error(&path, e))?;

        tracing::debug!(
            process = process_name,
            approach = %record.name,
            table = %path.display(),
            "Result row appended"
        );
        Ok(Appended::Written)
    }

    /// All rows of `process_name`'s table, in file order. A missing table
    /// has no rows.
    pub fn records(&self, process_name: &str) -> Result<Vec<MetricRecord>, StoreError> {
        let lock = self.lock_for(process_name);
        let _guard = acquire(&*lock);

        let path = self.table_path(process_name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, e))?;
        reader
            .deserialize::<MetricRecord>()
            .map(|row| row.map_err(|e| csv_error(&path, e)))
            .collect()
    }

    fn ensure_table_locked(&self, process_name: &str) -> Result<(), StoreError> {
        let path = self.table_path(process_name);
        if path.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;

        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
        writer
            .write_record(constants::RESULT_COLUMNS)
            .map_err(|e| csv_error(&path, e))?;
        writer.flush().map_err(|e| io_error(&path, e))?;

        tracing::info!(process = process_name, table = %path.display(), "Result table created");
        Ok(())
    }

    /// The lock guarding `process_name`'s table, created on first use.
    fn lock_for(&self, process_name: &str) -> Arc<Mutex<()>> {
        let mut locks = acquire(&self.locks);
        Arc::clone(locks.entry(process_name.to_string()).or_default())
    }
}

/// Header of the table at `path` and whether some row is named `name`.
fn scan_table(path: &Path, name: &str) -> Result<(csv::StringRecord, bool), StoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let name_column = headers
        .iter()
        .position(|h| h == constants::RESULT_COLUMNS[0])
        .ok_or_else(|| StoreError::MissingNameColumn {
            path: path.to_path_buf(),
        })?;

    for row in reader.records() {
        let row = row.map_err(|e| csv_error(path, e))?;
        if row.get(name_column) == Some(name) {
            return Ok((headers, true));
        }
    }
    Ok((headers, false))
}

/// Lock a mutex, recovering from poisoning: a panicked writer leaves at
/// worst a partially written row, which the next reader reports as a CSV
/// error for that table only.
fn acquire<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, source: csv::Error) -> StoreError {
    StoreError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
