use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::time::delay_for;
use tokio_util::codec::FramedWrite;

use hpaxos::proto::*;
use hpaxos::replica::ReplicaConf;
use hpaxos::transport::{Transport, TransportError};

use super::*;

/// PeerLinks tells which replication links are up.
///
/// A link counts as alive until dialing it fails, and again once a dial
/// succeeds. Messages to a dead peer are dropped, not queued.
#[derive(Debug, Clone)]
pub struct PeerLinks {
    alive: Arc<Vec<AtomicBool>>,
}

impl PeerLinks {
    fn new(n: usize) -> Self {
        let alive = (0..n).map(|_| AtomicBool::new(true)).collect();
        PeerLinks {
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

    fn set(&self, rid: ReplicaId, v: bool) {
        if let Some(a) = self.alive.get(rid as usize) {
            a.store(v, Ordering::Release);
        }
    }
}

/// TcpTransport sends protocol messages over one outbound TCP link per peer.
/// Each link has a bounded queue drained by its own writer task, so sending
/// never blocks the replica loop.
pub struct TcpTransport {
    me: ReplicaId,
    queues: Vec<Option<Sender<PeerMsg>>>,
    links: PeerLinks,
}

impl TcpTransport {
    /// connect spawns a writer task for every peer in `peers` but `me`. Must
    /// be called inside a tokio runtime.
    pub fn connect(
        me: ReplicaId,
        peers: &BTreeMap<ReplicaId, SocketAddr>,
        conf: &ReplicaConf,
    ) -> TcpTransport {
        let n = peers.len();
        let links = PeerLinks::new(n);
        let mut queues = Vec::with_capacity(n);

        for rid in 0..n as ReplicaId {
            let addr = match peers.get(&rid) {
                Some(addr) if rid != me => *addr,
                _ => {
                    queues.push(None);
                    continue;
                }
            };

            let (tx, rx) = mpsc::channel(conf.chan_size.max(1));
            queues.push(Some(tx));

            let w = LinkWriter {
                me,
                to: rid,
                addr,
                endian: conf.endian,
                retry_base: Duration::from_millis(conf.retry_base_ms.max(1)),
                retry_max: Duration::from_millis(conf.retry_max_ms.max(1)),
                links: links.clone(),
            };
            tokio::spawn(w.run(rx));
        }

        TcpTransport { me, queues, links }
    }

    pub fn links(&self) -> PeerLinks {
        self.links.clone()
    }
}

impl Transport for TcpTransport {
    fn replica_id(&self) -> ReplicaId {
        self.me
    }

    fn replica_count(&self) -> usize {
        self.queues.len()
    }

    fn alive(&self, rid: ReplicaId) -> bool {
        self.links.is_alive(rid)
    }

    fn send_to(&mut self, to: ReplicaId, msg: PeerMsg) -> Result<(), TransportError> {
        let q = self
            .queues
            .get_mut(to as usize)
            .and_then(|q| q.as_mut())
            .ok_or(TransportError::NoSuchPeer(to))?;

        if !self.links.is_alive(to) {
            return Err(TransportError::Dead(to));
        }

        q.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full(to),
            TrySendError::Closed(_) => TransportError::Closed(to),
        })
    }
}

struct LinkWriter {
    me: ReplicaId,
    to: ReplicaId,
    addr: SocketAddr,
    endian: Endian,
    retry_base: Duration,
    retry_max: Duration,
    links: PeerLinks,
}

impl LinkWriter {
    /// run keeps the link to one peer up and writes queued messages to it,
    /// until the transport is dropped.
    async fn run(self, mut rx: Receiver<PeerMsg>) {
        let mut failures = 0;

        loop {
            let stream = match self.dial().await {
                Ok(s) => s,
                Err(e) => {
                    failures += 1;
                    if failures == 1 {
                        warn!("link to replica {} at {}: {}", self.to, self.addr, e);
                    }
                    self.links.set(self.to, false);
                    delay_for(redial_delay(self.retry_base, self.retry_max, failures)).await;
                    continue;
                }
            };

            info!("link to replica {} at {} is up", self.to, self.addr);
            failures = 0;
            self.links.set(self.to, true);

            let mut frames = FramedWrite::new(stream, PeerCodec::new(self.endian));
            loop {
                let msg = match rx.recv().await {
                    Some(m) => m,
                    None => {
                        debug!("link to replica {} closed by transport", self.to);
                        return;
                    }
                };

                if let Err(e) = frames.send(msg).await {
                    warn!("link to replica {} broken: {}", self.to, e);
                    break;
                }
            }

            self.links.set(self.to, false);
        }
    }

    async fn dial(&self) -> io::Result<TcpStream> {
        let mut stream = TcpStream::connect(self.addr).await?;
        stream.set_nodelay(true)?;
        stream
            .write_all(&encode_handshake(self.me, self.endian))
            .await?;
        Ok(stream)
    }
}
