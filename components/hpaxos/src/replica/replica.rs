use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use super::*;
use crate::instance::*;
use crate::proto::*;
use crate::transport::*;

/// ReplicaConf is the per-replica protocol options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReplicaConf {
    /// Run the executor that applies committed commands.
    pub exec: bool,

    /// Reply to clients after execution, with the command's result, instead
    /// of at commit time. Needs `exec`.
    pub dreply: bool,

    /// Write protocol state to a stable store before acknowledging.
    pub durable: bool,

    /// Period of the clock that re-enables proposal intake.
    pub clock_ms: u64,

    /// Capacity of the proposal channel and of every peer queue.
    pub chan_size: usize,

    pub retry_base_ms: u64,
    pub retry_max_ms: u64,

    pub max_instances: usize,

    pub endian: Endian,
}

impl Default for ReplicaConf {
    fn default() -> Self {
        ReplicaConf {
            exec: true,
            dreply: true,
            durable: false,
            clock_ms: 1,
            chan_size: 4096,
            retry_base_ms: 5,
            retry_max_ms: 1000,
            max_instances: DEFAULT_MAX_INSTANCES,
            endian: Endian::Big,
        }
    }
}

impl ReplicaConf {
    pub fn clock(&self) -> Duration {
        Duration::from_millis(self.clock_ms.max(1))
    }

    pub fn deferred_reply(&self) -> bool {
        self.dreply && self.exec
    }
}

/// Replica is the protocol state of one cluster member. It is owned by the
/// dispatch loop; nothing else mutates it.
pub struct Replica {
    pub replica_id: ReplicaId,

    /// Cluster size.
    pub n: usize,

    pub conf: ReplicaConf,

    /// Advisory. The protocol does not depend on it.
    pub is_leader: bool,

    /// The ballot new log proposals skip Prepare with if this replica owns
    /// it. A default owned by another replica promises its ballot for every
    /// instance this replica has not seen yet.
    pub default_ballot: Ballot,

    /// Highest ballot seen in any message.
    pub max_seen_ballot: Ballot,

    /// The register values held by this replica, by key.
    pub registers: HashMap<i64, Payload>,

    /// Register ops proposed here and not finished, by the instance they
    /// reserved.
    pub register_ops: HashMap<InstanceNo, RegisterOp>,

    pub log: InstanceLog,
    pub retries: RetryQueue,

    /// Instances given up after a nack majority, with the time to drive them
    /// again so that they do not stay undecided.
    pub(crate) stalled: Vec<(Instant, InstanceNo)>,

    pub(crate) transport: Box<dyn Transport>,
    pub(crate) wal: Wal,
    pub(crate) committed_tx: Option<UnboundedSender<CommittedEntry>>,
}

impl Replica {
    pub fn new(conf: ReplicaConf, transport: Box<dyn Transport>, wal: Wal) -> Self {
        let retries = RetryQueue::new(
            Duration::from_millis(conf.retry_base_ms),
            Duration::from_millis(conf.retry_max_ms),
        );

        Replica {
            replica_id: transport.replica_id(),
            n: transport.replica_count(),
            is_leader: false,
            default_ballot: NO_BALLOT,
            max_seen_ballot: NO_BALLOT,
            registers: HashMap::new(),
            register_ops: HashMap::new(),
            log: InstanceLog::new(conf.max_instances),
            retries,
            stalled: Vec::new(),
            conf,
            transport,
            wal,
            committed_tx: None,
        }
    }

    pub fn be_the_leader(&mut self) {
        self.is_leader = true;
        info!("replica {} is marked as leader", self.replica_id);
    }

    /// handle_propose puts a client request into the next free instance and
    /// starts the protocol the command needs. A finished register op only
    /// needs the log.
    pub fn handle_propose(&mut self, p: Propose) -> Result<(), ReplicaError> {
        let i = match self.log.next_free() {
            Ok(i) => i,
            Err(e) => {
                reply_to(&p, false, NIL);
                return Err(e.into());
            }
        };

        if p.registered || p.command.needs_log() {
            self.propose_log(i, p)
        } else {
            self.propose_register(i, p)
        }
    }

    pub fn handle_peer_msg(&mut self, env: Envelope) -> Result<(), ReplicaError> {
        let from = env.from;
        match &env.msg {
            PeerMsg::Get(m) => self.handle_get(m),
            PeerMsg::GetReply(m) => self.handle_get_reply(from, m),
            PeerMsg::Set(m) => self.handle_set(m),
            PeerMsg::SetReply(m) => self.handle_set_reply(from, m),
            PeerMsg::Prepare(m) => self.handle_prepare(m),
            PeerMsg::PrepareReply(m) => self.handle_prepare_reply(from, m),
            PeerMsg::Accept(m) => self.handle_accept(m),
            PeerMsg::AcceptReply(m) => self.handle_accept_reply(from, m),
            PeerMsg::Commit(m) => self.handle_commit(m),
            PeerMsg::CommitShort(m) => self.handle_commit_short(m),
        }
    }

    pub fn committed_up_to(&self) -> InstanceNo {
        self.log.committed_up_to()
    }

    /// register returns the register value of `key` held here.
    pub fn register(&self, key: i64) -> Payload {
        self.registers.get(&key).copied().unwrap_or_default()
    }

    pub(crate) fn send(&mut self, to: ReplicaId, msg: PeerMsg) {
        if let Err(e) = self.transport.send_to(to, msg) {
            warn!("replica {}: drop message to {}: {}", self.replica_id, to, e);
        }
    }

    /// bcast sends `msg` to every other live replica and returns how many
    /// sends succeeded.
    pub(crate) fn bcast(&mut self, msg: PeerMsg) -> usize {
        let mut sent = 0;
        for to in 0..self.n as ReplicaId {
            if to == self.replica_id || !self.transport.alive(to) {
                continue;
            }
            match self.transport.send_to(to, msg.clone()) {
                Ok(()) => sent += 1,
                Err(e) => warn!("replica {}: drop message to {}: {}", self.replica_id, to, e),
            }
        }
        sent
    }

    pub(crate) fn note_ballot(&mut self, b: Ballot) {
        if b > self.max_seen_ballot {
            self.max_seen_ballot = b;
        }
    }

    /// fast_ballot returns the ballot to skip Prepare with, if any.
    pub(crate) fn fast_ballot(&self) -> Option<Ballot> {
        if ballot_owner(self.default_ballot) == Some(self.replica_id) {
            Some(self.default_ballot)
        } else {
            None
        }
    }

    /// fresh_ballot returns a ballot of this replica higher than any seen.
    pub(crate) fn fresh_ballot(&mut self) -> Ballot {
        let seen = self.max_seen_ballot.max(self.default_ballot);
        let round = if seen < 0 { 1 } else { ballot_round(seen) + 1 };
        let b = make_ballot(round, self.replica_id);
        self.note_ballot(b);
        b
    }

    /// persist writes the metadata of instance `i`, and its commands if asked,
    /// then syncs.
    pub(crate) fn persist(&mut self, i: InstanceNo, with_cmds: bool) -> Result<(), ReplicaError> {
        if !self.wal.is_enabled() {
            return Ok(());
        }
        let inst = match self.log.get(i) {
            Some(inst) => inst,
            None => return Ok(()),
        };

        self.wal.record_instance_metadata(inst)?;
        if with_cmds {
            if let Some(cmds) = &inst.cmds {
                self.wal.record_commands(cmds)?;
            }
        }
        self.wal.sync()?;
        Ok(())
    }

    /// requeue retries client requests at once, e.g. because another value
    /// took their instance.
    pub(crate) fn requeue(&mut self, props: Vec<Propose>) {
        for p in props {
            debug!("replica {}: requeue command {}", self.replica_id, p.command_id);
            self.retries.push(p);
        }
    }

    pub(crate) fn requeue_backoff(&mut self, props: Vec<Propose>) {
        let now = Instant::now();
        for p in props {
            self.retries.push_backoff(p, now);
        }
    }

    /// reply_committed acknowledges the clients of a committed instance,
    /// unless they wait for the execution result. A logged register op
    /// answers with the value it read or wrote.
    pub(crate) fn reply_committed(&mut self, i: InstanceNo) {
        if self.conf.deferred_reply() {
            return;
        }
        let inst = match self.log.get_mut(i) {
            Some(inst) => inst,
            None => return,
        };
        if !inst.is_decided() {
            return;
        }
        if let Some(lb) = inst.lb.as_mut() {
            for p in lb.take_pending() {
                let v = if p.registered { p.command.value } else { NIL };
                reply_to(&p, true, v);
            }
        }
    }

    /// advance_committed extends the decided prefix and hands every instance
    /// that joined it to the executor.
    pub(crate) fn advance_committed(&mut self) {
        let deferred = self.conf.deferred_reply();

        for i in self.log.advance_committed() {
            let inst = match self.log.get_mut(i) {
                Some(inst) => inst,
                None => continue,
            };

            let proposals = match inst.lb.as_mut() {
                Some(lb) if deferred => lb.take_pending(),
                _ => vec![],
            };

            let entry = CommittedEntry {
                instance: i,
                cmds: inst.cmds.clone().unwrap_or_default(),
                proposals,
            };

            if let Some(tx) = &self.committed_tx {
                if tx.send(entry).is_err() {
                    warn!("replica {}: executor is gone", self.replica_id);
                }
            }
        }
    }
}

pub(crate) fn reply_to(p: &Propose, ok: bool, value: i64) {
    if let Err(e) = p.respond(ok, value) {
        debug!("{}", e);
    }
}

/// proposing returns log instance `i` if this replica is still driving it.
pub(crate) fn proposing(log: &mut InstanceLog, i: InstanceNo) -> Result<&mut Instance, ReplicaError> {
    let inst = log.get_mut(i).ok_or(ReplicaError::NotProposer(i))?;
    if inst.kind != InstanceKind::Log || inst.driving().is_none() {
        return Err(ReplicaError::NotProposer(i));
    }
    Ok(inst)
}
