use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;

use super::*;
use crate::proto::*;
use crate::transport::*;

/// Outbox records what a replica sent, and lets a test mark peers dead.
#[derive(Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<(ReplicaId, PeerMsg)>>>,
    dead: Arc<Mutex<HashSet<ReplicaId>>>,
}

impl Outbox {
    /// take returns and forgets everything sent so far.
    pub fn take(&self) -> Vec<(ReplicaId, PeerMsg)> {
        std::mem::replace(&mut *self.sent.lock().unwrap(), vec![])
    }

    pub fn kill(&self, rid: ReplicaId) {
        self.dead.lock().unwrap().insert(rid);
    }
}

pub struct RecordingTransport {
    me: ReplicaId,
    n: usize,
    outbox: Outbox,
}

impl Transport for RecordingTransport {
    fn replica_id(&self) -> ReplicaId {
        self.me
    }

    fn replica_count(&self) -> usize {
        self.n
    }

    fn alive(&self, rid: ReplicaId) -> bool {
        !self.outbox.dead.lock().unwrap().contains(&rid)
    }

    fn send_to(&mut self, to: ReplicaId, msg: PeerMsg) -> Result<(), TransportError> {
        if !self.alive(to) {
            return Err(TransportError::Dead(to));
        }
        self.outbox.sent.lock().unwrap().push((to, msg));
        Ok(())
    }
}

/// test_conf replies at commit time and runs no executor.
pub fn test_conf() -> ReplicaConf {
    ReplicaConf {
        exec: false,
        dreply: false,
        ..Default::default()
    }
}

pub fn new_replica(me: ReplicaId, n: usize) -> (Replica, Outbox) {
    new_replica_with(me, n, test_conf(), Wal::disabled())
}

pub fn new_replica_with(
    me: ReplicaId,
    n: usize,
    conf: ReplicaConf,
    wal: Wal,
) -> (Replica, Outbox) {
    let outbox = Outbox::default();
    let t = RecordingTransport {
        me,
        n,
        outbox: outbox.clone(),
    };
    (Replica::new(conf, Box::new(t), wal), outbox)
}

pub fn new_propose(command_id: i32, cmd: Command) -> (Propose, UnboundedReceiver<ProposeReply>) {
    let (h, rx) = ReplyHandle::new();
    (Propose::new(command_id, cmd, 1000 + command_id as i64, h), rx)
}

/// try_reply returns a reply if one is already queued.
pub fn try_reply(rx: &mut UnboundedReceiver<ProposeReply>) -> Option<ProposeReply> {
    rx.recv().now_or_never().flatten()
}

pub fn ok_reply(command_id: i32, value: i64) -> ProposeReply {
    ProposeReply {
        ok: true,
        command_id,
        value,
        timestamp: 1000 + command_id as i64,
    }
}

pub fn env<M: Into<PeerMsg>>(from: ReplicaId, m: M) -> Envelope {
    Envelope {
        from,
        msg: m.into(),
    }
}

/// sent_to returns the destinations of every message of type `t`.
pub fn sent_to(sent: &[(ReplicaId, PeerMsg)], t: MsgType) -> Vec<ReplicaId> {
    let mut to: Vec<ReplicaId> = sent
        .iter()
        .filter(|(_, m)| m.msg_type() == t)
        .map(|(to, _)| *to)
        .collect();
    to.sort();
    to
}

/// first_of returns the first message of type `t`.
pub fn first_of(sent: &[(ReplicaId, PeerMsg)], t: MsgType) -> Option<PeerMsg> {
    sent.iter()
        .find(|(_, m)| m.msg_type() == t)
        .map(|(_, m)| m.clone())
}
