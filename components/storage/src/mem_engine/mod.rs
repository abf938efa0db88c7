use std::sync::{Arc, Mutex};

mod memstore;
pub use memstore::*;

#[derive(Debug, Default)]
pub struct MemLog {
    pub buf: Vec<u8>,
    pub synced: usize,
    pub syncs: u64,
    pub broken: bool,
}

/// MemStore is an in-memory stable store for testing or non-persistent environment.
///
/// Cloning a MemStore yields another handle to the same log, so that a test
/// can hand one handle to a replica and inspect the log through another.
///
/// ```text
/// Replica → MemStore ↘
///                     MemLog
/// test    → MemStore ↗
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    inner: Arc<Mutex<MemLog>>,
}
