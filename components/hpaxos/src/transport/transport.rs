use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::TransportError;
use crate::proto::*;

/// Transport delivers protocol messages to the other replicas of a cluster.
/// Inbound messages are not part of it: they are delivered as `Envelope`s on
/// the channel the replica loop reads from.
///
/// `send_to` must never block.
pub trait Transport: Send {
    fn replica_id(&self) -> ReplicaId;

    /// replica_count returns the cluster size, including this replica.
    fn replica_count(&self) -> usize;

    fn alive(&self, rid: ReplicaId) -> bool;

    fn send_to(&mut self, to: ReplicaId, msg: PeerMsg) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn replica_id(&self) -> ReplicaId {
        (**self).replica_id()
    }

    fn replica_count(&self) -> usize {
        (**self).replica_count()
    }

    fn alive(&self, rid: ReplicaId) -> bool {
        (**self).alive(rid)
    }

    fn send_to(&mut self, to: ReplicaId, msg: PeerMsg) -> Result<(), TransportError> {
        (**self).send_to(to, msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposeReply {
    pub ok: bool,
    pub command_id: i32,
    pub value: i64,
    pub timestamp: i64,
}

/// ReplyHandle is the way back to the client connection a request came from.
#[derive(Debug, Clone)]
pub struct ReplyHandle {
    tx: UnboundedSender<ProposeReply>,
}

impl ReplyHandle {
    pub fn new() -> (ReplyHandle, UnboundedReceiver<ProposeReply>) {
        let (tx, rx) = unbounded_channel();
        (ReplyHandle { tx }, rx)
    }

    pub fn send(&self, reply: ProposeReply) -> Result<(), TransportError> {
        self.tx
            .send(reply)
            .map_err(|_| TransportError::ClientGone(reply.command_id))
    }
}

/// Propose is a client request waiting for the replica to run it.
#[derive(Debug, Clone)]
pub struct Propose {
    pub command_id: i32,
    pub command: Command,
    pub timestamp: i64,
    pub reply: ReplyHandle,

    /// How many times this request has been retried after contention.
    pub retries: u32,

    /// The register op of this request is done. `command` is the record it
    /// left and only needs a log slot.
    pub registered: bool,
}

impl Propose {
    pub fn new(command_id: i32, command: Command, timestamp: i64, reply: ReplyHandle) -> Self {
        Propose {
            command_id,
            command,
            timestamp,
            reply,
            retries: 0,
            registered: false,
        }
    }

    pub fn respond(&self, ok: bool, value: i64) -> Result<(), TransportError> {
        self.reply.send(ProposeReply {
            ok,
            command_id: self.command_id,
            value,
            timestamp: self.timestamp,
        })
    }
}
