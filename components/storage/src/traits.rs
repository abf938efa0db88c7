use crate::StorageError;

/// StableStore is the write-ahead log a replica appends to before it answers
/// a peer or a client.
///
/// Records are opaque byte strings. A record is only durable after a
/// successful `sync()`; everything appended before that may be lost on crash.
pub trait StableStore: Send {
    /// append a record to the end of the log.
    fn append(&mut self, buf: &[u8]) -> Result<(), StorageError>;

    /// sync flushes every appended record to durable media.
    fn sync(&mut self) -> Result<(), StorageError>;

    /// number of bytes appended so far, synced or not.
    fn appended(&self) -> u64;
}

impl<T: StableStore + ?Sized> StableStore for Box<T> {
    fn append(&mut self, buf: &[u8]) -> Result<(), StorageError> {
        (**self).append(buf)
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        (**self).sync()
    }

    fn appended(&self) -> u64 {
        (**self).appended()
    }
}
