use std::fs::{self, File, OpenOptions};
use std::io::{self, Error, ErrorKind};
use std::path::Path;

use slog::Drain;

use hpaxos::proto::ReplicaId;

use super::log_format::LogFormat;

/// init_logger installs the global logger, appending to the file at `path`.
/// Records are formatted by `LogFormat` and written by a background thread.
pub fn init_logger<P: AsRef<Path>>(path: P, replica_id: ReplicaId) -> io::Result<()> {
    let file = open_log_file(path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = LogFormat::new(decorator, replica_id).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    let logger = slog::Logger::root(drain, slog::o!());

    slog_global::set_global(logger);

    info!("logger ready");
    Ok(())
}

/// Opens log file with append mode. Creates a new log file if it doesn't exist.
fn open_log_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| {
        Error::new(
            ErrorKind::Other,
            "Unable to get parent directory of log file",
        )
    })?;
    if !parent.as_os_str().is_empty() && !parent.is_dir() {
        fs::create_dir_all(parent)?
    }
    OpenOptions::new().append(true).create(true).open(path)
}
