use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc::{self, unbounded_channel, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;

use super::*;
use crate::proto::*;
use crate::transport::Propose;

/// Inbox is everything the dispatch loop reads from.
pub struct Inbox {
    pub proposals: Receiver<Propose>,
    pub peers: Receiver<Envelope>,
    pub shutdown: oneshot::Receiver<()>,
}

enum Event {
    Tick,
    Propose(Propose),
    ProposalsClosed,
    Peer(Envelope),
    Shutdown,
}

impl Replica {
    /// run is the dispatch loop. It admits at most one client request per
    /// clock tick and handles peer messages in between. It returns on
    /// shutdown, or with the error that made the replica stop.
    pub async fn run(mut self, mut inbox: Inbox) -> Result<(), ReplicaError> {
        let mut clock = time::interval(self.conf.clock());
        let mut accepting = true;
        let mut intake_open = true;

        info!("replica {} of {} started", self.replica_id, self.n);

        loop {
            if accepting {
                if let Some(p) = self.retries.pop() {
                    accepting = false;
                    let res = self.handle_propose(p);
                    self.check(res)?;
                    continue;
                }
            }

            let ev = tokio::select! {
                _ = clock.tick() => Event::Tick,
                p = inbox.proposals.recv(), if accepting && intake_open => match p {
                    Some(p) => Event::Propose(p),
                    None => Event::ProposalsClosed,
                },
                m = inbox.peers.recv() => match m {
                    Some(m) => Event::Peer(m),
                    None => Event::Shutdown,
                },
                _ = &mut inbox.shutdown => Event::Shutdown,
            };

            let res = match ev {
                Event::Tick => {
                    accepting = true;
                    let now = Instant::now();
                    self.retries.promote(now);
                    self.recover_stalled(now)
                }
                Event::Propose(p) => {
                    accepting = false;
                    self.handle_propose(p)
                }
                Event::ProposalsClosed => {
                    intake_open = false;
                    Ok(())
                }
                Event::Peer(env) => self.handle_peer_msg(env),
                Event::Shutdown => {
                    info!("replica {} stopped", self.replica_id);
                    return Ok(());
                }
            };
            self.check(res)?;
        }
    }

    /// check logs a handler error and tells if the loop may go on.
    fn check(&self, res: Result<(), ReplicaError>) -> Result<(), ReplicaError> {
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => {
                crit!("replica {}: {}; stop serving", self.replica_id, e);
                Err(e)
            }
            Err(e) if e.is_noise() => {
                debug!("replica {}: {}", self.replica_id, e);
                Ok(())
            }
            Err(e) => {
                warn!("replica {}: {}", self.replica_id, e);
                Ok(())
            }
        }
    }
}

/// ReplicaHandle is the outside view of a running replica.
pub struct ReplicaHandle {
    pub replica_id: ReplicaId,
    pub proposals: Sender<Propose>,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<Result<(), ReplicaError>>>,
    committed_up_to: Arc<AtomicI32>,
    executed_up_to: Arc<AtomicI32>,
    applied: Arc<Mutex<Vec<Command>>>,
}

impl ReplicaHandle {
    pub fn committed_up_to(&self) -> InstanceNo {
        self.committed_up_to.load(Ordering::Acquire)
    }

    pub fn executed_up_to(&self) -> InstanceNo {
        self.executed_up_to.load(Ordering::Acquire)
    }

    /// applied returns the commands executed so far, in log order.
    pub fn applied(&self) -> Vec<Command> {
        match self.applied.lock() {
            Ok(a) => a.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// join waits for the dispatch loop to return.
    pub async fn join(&mut self) -> Result<(), ReplicaError> {
        match self.join.take() {
            Some(h) => h
                .await
                .unwrap_or_else(|e| Err(ReplicaError::Join(e.to_string()))),
            None => Ok(()),
        }
    }
}

/// spawn_replica starts the dispatch loop of `replica`, and its executor if
/// enabled, on the current tokio runtime. `peers` is the channel inbound peer
/// messages are delivered to.
pub fn spawn_replica(mut replica: Replica, peers: Receiver<Envelope>) -> ReplicaHandle {
    let (ptx, prx) = mpsc::channel(replica.conf.chan_size.max(1));
    let (stx, srx) = oneshot::channel();

    let committed_up_to = replica.log.committed_up_to_handle();
    let executed_up_to = Arc::new(AtomicI32::new(-1));
    let applied = Arc::new(Mutex::new(Vec::new()));

    if replica.conf.exec {
        let (etx, erx) = unbounded_channel();
        replica.committed_tx = Some(etx);
        let executor = Executor::new(erx, committed_up_to.clone(), executed_up_to.clone())
            .record_applied(applied.clone());
        tokio::spawn(executor.run());
    }

    let replica_id = replica.replica_id;
    let inbox = Inbox {
        proposals: prx,
        peers,
        shutdown: srx,
    };
    let join = tokio::spawn(replica.run(inbox));

    ReplicaHandle {
        replica_id,
        proposals: ptx,
        shutdown: Some(stx),
        join: Some(join),
        committed_up_to,
        executed_up_to,
        applied,
    }
}
