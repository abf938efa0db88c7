use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

use super::*;
use crate::proto::*;

/// LinkControl switches replicas of a local mesh on and off. A replica that
/// is down neither sends nor receives.
#[derive(Debug, Clone)]
pub struct LinkControl {
    alive: Arc<Vec<AtomicBool>>,
}

impl LinkControl {
    fn new(n: usize) -> Self {
        let alive = (0..n).map(|_| AtomicBool::new(true)).collect();
        LinkControl {
            alive: Arc::new(alive),
        }
    }

    pub fn is_alive(&self, rid: ReplicaId) -> bool {
        if rid < 0 {
            return false;
        }
        self.alive
            .get(rid as usize)
            .map(|a| a.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn kill(&self, rid: ReplicaId) {
        self.set(rid, false);
    }

    pub fn revive(&self, rid: ReplicaId) {
        self.set(rid, true);
    }

    fn set(&self, rid: ReplicaId, v: bool) {
        if let Some(a) = self.alive.get(rid as usize) {
            a.store(v, Ordering::Release);
        }
    }
}

/// LocalTransport connects the replicas of one process with bounded channels.
pub struct LocalTransport {
    me: ReplicaId,
    peers: Vec<Sender<Envelope>>,
    links: LinkControl,
}

/// local_mesh builds `n` fully connected transports. The i-th receiver is
/// the inbox of replica i.
pub fn local_mesh(
    n: usize,
    chan_size: usize,
) -> (Vec<LocalTransport>, Vec<Receiver<Envelope>>, LinkControl) {
    let links = LinkControl::new(n);
    let (txs, rxs): (Vec<_>, Vec<_>) = (0..n).map(|_| mpsc::channel(chan_size)).unzip();

    let transports = (0..n)
        .map(|i| LocalTransport {
            me: i as ReplicaId,
            peers: txs.clone(),
            links: links.clone(),
        })
        .collect();

    (transports, rxs, links)
}

impl Transport for LocalTransport {
    fn replica_id(&self) -> ReplicaId {
        self.me
    }

    fn replica_count(&self) -> usize {
        self.peers.len()
    }

    fn alive(&self, rid: ReplicaId) -> bool {
        self.links.is_alive(rid)
    }

    fn send_to(&mut self, to: ReplicaId, msg: PeerMsg) -> Result<(), TransportError> {
        if to < 0 || to as usize >= self.peers.len() || to == self.me {
            return Err(TransportError::NoSuchPeer(to));
        }
        if !self.links.is_alive(self.me) || !self.links.is_alive(to) {
            return Err(TransportError::Dead(to));
        }

        let env = Envelope { from: self.me, msg };
        self.peers[to as usize].try_send(env).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full(to),
            TrySendError::Closed(_) => TransportError::Closed(to),
        })
    }
}
