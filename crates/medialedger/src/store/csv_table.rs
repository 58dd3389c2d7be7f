use super::Record;
use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// A typed CSV table bound to one file.
pub struct CsvTable<R: Record> {
    path: PathBuf,
    _row: PhantomData<fn() -> R>,
}

impl<R: Record> CsvTable<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the file with only the header row if it does not exist yet.
    ///
    /// Returns `true` when the file was created. An existing file is never
    /// rewritten, whatever its content.
    pub fn ensure_header(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.ensure_parent()?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        writer.write_record(R::HEADERS)?;
        writer.flush()?;
        debug!(table = %self.path.display(), "created table header");
        Ok(true)
    }

    /// Load every well-formed row, in file order.
    pub fn load(&self) -> Result<Vec<R>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for result in reader.deserialize::<R>() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    warn!(
                        table = %self.path.display(),
                        line,
                        "skipping malformed row: {}",
                        e
                    );
                }
            }
        }
        Ok(rows)
    }

    /// Replace the whole table with `rows`.
    ///
    /// The rows go to a temp file in the same directory which is then renamed
    /// over the target.
    pub fn write(&self, rows: &[R]) -> Result<()> {
        let dir = self.ensure_parent()?;
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("table");
        let tmp_path = dir.join(format!(".{}-{}.tmp", stem, Uuid::new_v4()));

        let written = self.write_to(&tmp_path, rows);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!(table = %self.path.display(), rows = rows.len(), "table written");
        Ok(())
    }

    /// Append one row, writing the header first if the file is new or empty.
    pub fn append(&self, row: &R) -> Result<()> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if needs_header {
            self.ensure_parent()?;
            let _ = fs::remove_file(&self.path);
            self.ensure_header()?;
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    fn write_to(&self, target: &Path, rows: &[R]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(target)?;
        writer.write_record(R::HEADERS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn ensure_parent(&self) -> Result<PathBuf> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }
}
