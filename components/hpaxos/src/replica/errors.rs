use storage::StorageError;

use crate::instance::{InstanceStatus, LogError, RegisterPhase};
use crate::proto::*;
use crate::transport::TransportError;

quick_error! {
    /// ReplicaError is an error encountered when handling a proposal or a
    /// peer message.
    #[derive(Debug, PartialEq)]
    pub enum ReplicaError {
        /// A duplicated reply is received.
        Dup(rid: ReplicaId) {
            display("duplicated reply from replica {}", rid)
        }

        /// A reply for a phase the instance already left.
        DelayedReply(instance: InstanceNo, status: InstanceStatus) {
            display("instance {} is {:?} when the reply arrives", instance, status)
        }

        /// A reply for a register phase the op already left.
        DelayedRegisterReply(instance: InstanceNo, phase: RegisterPhase) {
            display("register op {} is in its {:?} phase when the reply arrives", instance, phase)
        }

        /// A reply for a ballot the instance no longer runs.
        StaleBallot(stale: Ballot, last: Ballot) {
            display("reply for ballot {} while instance is at {}", stale, last)
        }

        /// The instance is not driven by this replica.
        NotProposer(instance: InstanceNo) {
            display("instance {} is not proposed by this replica", instance)
        }

        Storage(e: StorageError) {
            from()
            display("durability failure: {}", e)
        }

        Log(e: LogError) {
            from()
            display("{}", e)
        }

        Transport(e: TransportError) {
            from()
            display("{}", e)
        }

        Join(msg: String) {
            display("replica loop aborted: {}", msg)
        }
    }
}

impl ReplicaError {
    /// is_fatal tells if the replica has to stop. Once a transition can not be
    /// made durable, nothing acknowledged after it can be trusted.
    pub fn is_fatal(&self) -> bool {
        match self {
            ReplicaError::Storage(_) => true,
            _ => false,
        }
    }

    /// is_noise tells if the error is an expected outcome of message
    /// reordering or duplication.
    pub fn is_noise(&self) -> bool {
        match self {
            ReplicaError::Dup(_)
            | ReplicaError::DelayedReply(..)
            | ReplicaError::DelayedRegisterReply(..)
            | ReplicaError::StaleBallot(..)
            | ReplicaError::NotProposer(_) => true,
            _ => false,
        }
    }
}
