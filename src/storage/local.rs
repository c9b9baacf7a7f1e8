use crate::index::Index;
use crate::{Error, Result};
use noodles::bgzf;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension appended to the document path for its default index.
pub const INDEX_EXTENSION: &str = "jsi";

/// Local filesystem location of a document and its index.
pub struct LocalStorage {
    input_path: PathBuf,
    index_path: PathBuf,
}

impl LocalStorage {
    /// Use `index_path` when given, else the appended-extension convention
    /// (`sample.json.gz` -> `sample.json.gz.jsi`).
    pub fn new(input_path: PathBuf, index_path: Option<PathBuf>) -> Self {
        let index_path = index_path.unwrap_or_else(|| Self::default_index_path(&input_path));
        Self {
            input_path,
            index_path,
        }
    }

    pub fn default_index_path(input_path: &Path) -> PathBuf {
        PathBuf::from(format!("{}.{}", input_path.display(), INDEX_EXTENSION))
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn check_input(&self) -> Result<()> {
        if !self.input_path.is_file() {
            return Err(Error::MissingInput(self.input_path.clone()));
        }
        Ok(())
    }

    /// Fail when the index is missing, or, with `check_stale`, when the input
    /// was modified after the index was written.
    pub fn check_index(&self, check_stale: bool) -> Result<()> {
        if !self.index_path.is_file() {
            return Err(Error::MissingIndex(self.index_path.clone()));
        }

        if check_stale {
            let input_modified = fs::metadata(&self.input_path)?.modified()?;
            let index_modified = fs::metadata(&self.index_path)?.modified()?;
            if input_modified > index_modified {
                return Err(Error::StaleIndex(self.index_path.clone()));
            }
        }

        Ok(())
    }

    /// Open the compressed document; the reader supports both sequential
    /// reads and seeking by [`SeekPoint`](crate::types::SeekPoint).
    pub fn open_input(&self) -> Result<bgzf::Reader<File>> {
        let file = File::open(&self.input_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingInput(self.input_path.clone()),
            _ => Error::Io(e),
        })?;
        Ok(bgzf::Reader::new(file))
    }

    pub fn read_index(&self) -> Result<Index> {
        let bytes = fs::read(&self.index_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingIndex(self.index_path.clone()),
            _ => Error::Io(e),
        })?;
        Index::from_bytes(&bytes)
    }

    /// Replace the index file as a whole: write a sibling temporary file and
    /// rename it over the target.
    pub fn write_index(&self, index: &Index) -> Result<()> {
        let bytes = index.to_bytes();
        let tmp_path = PathBuf::from(format!("{}.tmp", self.index_path.display()));

        let result = (|| -> Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.index_path)?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        tracing::info!(
            path = %self.index_path.display(),
            bytes = bytes.len(),
            "wrote index"
        );

        Ok(())
    }
}
