use std::io;

quick_error! {
    /// Errors occur when appending to or syncing a stable store.
    #[derive(Debug)]
    pub enum StorageError {
        IOError(e: io::Error) {
            from(e: io::Error) -> (e)
            display("stable store io error: {}", e)
        }

        /// The store refuses any more writes, e.g. after a failed sync.
        Broken(msg: String) {
            display("stable store is broken: {}", msg)
        }
    }
}

impl PartialEq<StorageError> for StorageError {
    fn eq(&self, other: &StorageError) -> bool {
        match (self, other) {
            (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
            (Self::Broken(a), Self::Broken(b)) => a == b,
            _ => false,
        }
    }
}
