use std::sync::MutexGuard;

use crate::{MemLog, MemStore, StableStore, StorageError};

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<MemLog>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Broken(format!("poisoned: {}", e)))
    }

    /// contents returns a copy of everything appended so far.
    pub fn contents(&self) -> Vec<u8> {
        match self.inner.lock() {
            Ok(l) => l.buf.clone(),
            Err(_) => vec![],
        }
    }

    /// synced_len returns the length of the durable prefix.
    pub fn synced_len(&self) -> usize {
        self.inner.lock().map(|l| l.synced).unwrap_or(0)
    }

    pub fn sync_count(&self) -> u64 {
        self.inner.lock().map(|l| l.syncs).unwrap_or(0)
    }

    /// set_broken makes every following append or sync fail, which emulates a
    /// dead disk.
    pub fn set_broken(&self, broken: bool) {
        if let Ok(mut l) = self.inner.lock() {
            l.broken = broken;
        }
    }
}

impl StableStore for MemStore {
    fn append(&mut self, buf: &[u8]) -> Result<(), StorageError> {
        let mut l = self.lock()?;
        if l.broken {
            return Err(StorageError::Broken("append".into()));
        }
        l.buf.extend_from_slice(buf);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        let mut l = self.lock()?;
        if l.broken {
            return Err(StorageError::Broken("sync".into()));
        }
        l.synced = l.buf.len();
        l.syncs += 1;
        Ok(())
    }

    fn appended(&self) -> u64 {
        self.inner.lock().map(|l| l.buf.len() as u64).unwrap_or(0)
    }
}
