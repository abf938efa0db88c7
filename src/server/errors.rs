use std::io;

use hpaxos::proto::ReplicaId;
use hpaxos::replica::ReplicaError;
use storage::StorageError;

quick_error! {
    #[derive(Debug)]
    pub enum ServerError {
        RxClosed {
            display("stop signal receiver is closed")
        }

        NotStarted {
            display("server is not started")
        }

        UnknownReplica(rid: ReplicaId) {
            display("replica {} is not in the cluster", rid)
        }

        IO(e: io::Error) {
            from()
            display("io: {}", e)
        }

        Storage(e: StorageError) {
            from()
            display("{}", e)
        }

        Replica(e: ReplicaError) {
            from()
            display("{}", e)
        }

        Join(msg: String) {
            display("server task aborted: {}", msg)
        }
    }
}
