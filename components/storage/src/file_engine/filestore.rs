use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{FileStore, StableStore, StorageError};

impl FileStore {
    /// open opens `path` in append mode. Creates the file and its parent
    /// directories if they do not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileStore, StorageError> {
        let path = path.as_ref();
        let parent = path.parent().ok_or_else(|| {
            Error::new(
                ErrorKind::Other,
                "Unable to get parent directory of stable store",
            )
        })?;

        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent)?;
        }

        let f = OpenOptions::new().append(true).create(true).open(path)?;
        let written = f.metadata()?.len();

        Ok(FileStore {
            path: PathBuf::from(path),
            w: BufWriter::new(f),
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StableStore for FileStore {
    fn append(&mut self, buf: &[u8]) -> Result<(), StorageError> {
        self.w.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.w.flush()?;
        self.w.get_ref().sync_data()?;
        Ok(())
    }

    fn appended(&self) -> u64 {
        self.written
    }
}
