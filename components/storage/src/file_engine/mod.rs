use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

mod filestore;
pub use filestore::*;

/// FileStore is a stable store backed by a single append-only file.
///
/// Appends are buffered; `sync()` flushes the buffer and fsyncs the file data.
pub struct FileStore {
    path: PathBuf,
    w: BufWriter<File>,
    written: u64,
}
