use storage::{StableStore, StorageError};

use crate::instance::Instance;
use crate::proto::*;

/// Wal writes protocol state to a stable store before any message that
/// depends on it leaves the replica. Without a store every call is a no-op.
///
/// Records are little-endian:
/// - instance metadata: ballot u32, status u8;
/// - commands: op u8, key i64, value i64 for each command;
/// - register: key i64, timestamp i64, proposer id i64, value i64.
pub struct Wal {
    store: Option<Box<dyn StableStore>>,
    buf: Vec<u8>,
}

impl Wal {
    pub fn disabled() -> Self {
        Wal {
            store: None,
            buf: Vec::new(),
        }
    }

    pub fn new(store: Box<dyn StableStore>) -> Self {
        Wal {
            store: Some(store),
            buf: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn record_instance_metadata(&mut self, inst: &Instance) -> Result<(), StorageError> {
        if self.store.is_none() {
            return Ok(());
        }
        self.buf.clear();
        self.buf.extend_from_slice(&(inst.ballot as u32).to_le_bytes());
        self.buf.push(inst.status as u8);
        self.flush_buf()
    }

    pub fn record_commands(&mut self, cmds: &[Command]) -> Result<(), StorageError> {
        if self.store.is_none() {
            return Ok(());
        }
        self.buf.clear();
        for c in cmds {
            c.marshal(Endian::Little, &mut self.buf);
        }
        self.flush_buf()
    }

    pub fn record_payload(&mut self, key: i64, p: &Payload) -> Result<(), StorageError> {
        if self.store.is_none() {
            return Ok(());
        }
        self.buf.clear();
        self.buf.extend_from_slice(&key.to_le_bytes());
        p.marshal(Endian::Little, &mut self.buf);
        self.flush_buf()
    }

    pub fn sync(&mut self) -> Result<(), StorageError> {
        match self.store.as_mut() {
            Some(s) => s.sync(),
            None => Ok(()),
        }
    }

    fn flush_buf(&mut self) -> Result<(), StorageError> {
        match self.store.as_mut() {
            Some(s) => s.append(&self.buf),
            None => Ok(()),
        }
    }
}
