use std::collections::HashSet;

use crate::proto::*;
use crate::transport::Propose;

/// InstanceStatus only moves forward. `Committed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum InstanceStatus {
    Preparing = 0,
    Prepared = 1,
    Accepted = 2,
    Committed = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    /// The slot is held by an in-flight register operation.
    Register,
    /// The slot is decided by paxos and executed in log order.
    Log,
}

/// Phase is the step the proposer of an instance is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Accept,
}

/// LeaderBookkeeping is what the proposer of an instance tracks while it is
/// driving the instance to a quorum.
#[derive(Debug)]
pub struct LeaderBookkeeping {
    /// Client requests waiting for this instance, in the order of `cmds`.
    pub proposals: Vec<Propose>,

    /// The ballot this proposer runs. Replies to any other ballot are stale.
    pub ballot: Ballot,
    pub phase: Phase,

    pub max_recv_ballot: Ballot,

    /// Ballot of the value adopted from a PrepareReply. NO_BALLOT while the
    /// instance still carries its own value.
    pub value_ballot: Ballot,

    pub prepare_oks: usize,
    pub accept_oks: usize,
    pub nacks: usize,

    pub prepare_replied: HashSet<ReplicaId>,
    pub accept_replied: HashSet<ReplicaId>,

    /// Peers that accepted the current value. They get a short commit.
    pub accepted_by: Vec<ReplicaId>,

    /// The prepare being run installs the ballot as default ballot.
    pub to_infinity: bool,

    pub client_acked: bool,

    /// Set once the proposer gave up on this instance, after a nack majority
    /// or a higher ballot. Later replies are ignored.
    pub abandoned: bool,
}

impl LeaderBookkeeping {
    pub fn new(proposals: Vec<Propose>) -> Self {
        LeaderBookkeeping {
            proposals,
            ballot: NO_BALLOT,
            phase: Phase::Prepare,
            max_recv_ballot: NO_BALLOT,
            value_ballot: NO_BALLOT,
            prepare_oks: 0,
            accept_oks: 0,
            nacks: 0,
            prepare_replied: HashSet::new(),
            accept_replied: HashSet::new(),
            accepted_by: Vec::new(),
            to_infinity: false,
            client_acked: false,
            abandoned: false,
        }
    }

    /// start_round resets the quorum counters for a new round at `ballot`.
    pub fn start_round(&mut self, ballot: Ballot, phase: Phase) {
        self.ballot = ballot;
        self.phase = phase;
        self.prepare_oks = 0;
        self.accept_oks = 0;
        self.nacks = 0;
        self.prepare_replied.clear();
        self.accept_replied.clear();
        self.accepted_by.clear();
        self.abandoned = false;
    }

    /// take_pending removes the client requests not answered yet, e.g. to
    /// retry them in another instance.
    pub fn take_pending(&mut self) -> Vec<Propose> {
        if self.client_acked {
            return vec![];
        }
        self.client_acked = true;
        std::mem::replace(&mut self.proposals, vec![])
    }

    pub fn has_pending(&self) -> bool {
        !self.client_acked && !self.proposals.is_empty()
    }

    pub fn observe(&mut self, ballot: Ballot) {
        if ballot > self.max_recv_ballot {
            self.max_recv_ballot = ballot;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterPhase {
    Get,
    Set,
}

/// RegisterOp is a register read or write in flight. It is identified by the
/// instance it reserved, but its phases do not depend on that instance: once
/// in the Set phase it finishes even if paxos takes the slot over.
#[derive(Debug)]
pub struct RegisterOp {
    pub proposal: Propose,
    pub phase: RegisterPhase,

    /// Newest payload seen in the Get phase, then the payload being set.
    pub payload: Payload,

    pub get_oks: usize,
    pub set_oks: usize,
    pub nacks: usize,

    pub get_replied: HashSet<ReplicaId>,
    pub set_replied: HashSet<ReplicaId>,
}

impl RegisterOp {
    pub fn new(proposal: Propose, local: Payload) -> Self {
        RegisterOp {
            proposal,
            phase: RegisterPhase::Get,
            payload: local,
            get_oks: 0,
            set_oks: 0,
            nacks: 0,
            get_replied: HashSet::new(),
            set_replied: HashSet::new(),
        }
    }

    pub fn key(&self) -> i64 {
        self.proposal.command.key
    }

    pub fn is_write(&self) -> bool {
        self.proposal.command.is_write()
    }

    /// record_command is what the finished op leaves in the log: the write it
    /// made, or the read with the value it returned.
    pub fn record_command(&self) -> Command {
        let cmd = self.proposal.command;
        if cmd.is_write() {
            Command::put(cmd.key, self.payload.value)
        } else {
            Command {
                value: self.payload.value,
                ..Command::get(cmd.key)
            }
        }
    }
}

#[derive(Debug)]
pub struct Instance {
    pub cmds: Option<Vec<Command>>,

    /// The highest ballot this replica promised or accepted for the instance.
    pub ballot: Ballot,

    /// The ballot at which `cmds` was accepted.
    pub accepted_ballot: Ballot,

    pub status: InstanceStatus,
    pub kind: InstanceKind,

    pub lb: Option<LeaderBookkeeping>,
}

impl Instance {
    /// register builds the slot reserved by a register op proposed locally.
    pub fn register(cmds: Vec<Command>) -> Self {
        Instance {
            cmds: Some(cmds),
            ballot: NO_BALLOT,
            accepted_ballot: NO_BALLOT,
            status: InstanceStatus::Preparing,
            kind: InstanceKind::Register,
            lb: None,
        }
    }

    /// proposal builds a log instance this replica is going to drive.
    pub fn proposal(cmds: Vec<Command>, proposals: Vec<Propose>) -> Self {
        Instance {
            cmds: Some(cmds),
            ballot: NO_BALLOT,
            accepted_ballot: NO_BALLOT,
            status: InstanceStatus::Preparing,
            kind: InstanceKind::Log,
            lb: Some(LeaderBookkeeping::new(proposals)),
        }
    }

    /// passive builds a log instance learned from a peer.
    pub fn passive(cmds: Option<Vec<Command>>, ballot: Ballot, status: InstanceStatus) -> Self {
        let accepted_ballot = if cmds.is_some() { ballot } else { NO_BALLOT };
        Instance {
            cmds,
            ballot,
            accepted_ballot,
            status,
            kind: InstanceKind::Log,
            lb: None,
        }
    }

    /// is_decided tells if the instance belongs to the executable prefix.
    pub fn is_decided(&self) -> bool {
        self.kind == InstanceKind::Log
            && self.status == InstanceStatus::Committed
            && self.cmds.is_some()
    }

    pub fn is_committed(&self) -> bool {
        self.status == InstanceStatus::Committed
    }

    /// advance moves the status forward to `to`. An older status is ignored.
    pub fn advance(&mut self, to: InstanceStatus) {
        if to > self.status {
            self.status = to;
        }
    }

    /// driving returns the bookkeeping if this replica is still proposing the
    /// instance.
    pub fn driving(&self) -> Option<&LeaderBookkeeping> {
        match &self.lb {
            Some(lb) if !lb.abandoned && !self.is_committed() => Some(lb),
            _ => None,
        }
    }

    /// to_log turns a register slot into a log slot because a paxos message
    /// landed on it. It returns false if the slot was already a log slot.
    pub fn to_log(&mut self) -> bool {
        if self.kind == InstanceKind::Log {
            return false;
        }
        self.kind = InstanceKind::Log;
        self.cmds = None;
        self.accepted_ballot = NO_BALLOT;
        self.lb = None;
        true
    }

    /// supersede replaces the value of an instance this replica is proposing
    /// and returns the client requests that no longer belong to it.
    pub fn supersede(&mut self, cmds: Vec<Command>) -> Vec<Propose> {
        let changed = self.cmds.as_ref() != Some(&cmds);
        self.cmds = Some(cmds);
        if !changed {
            return vec![];
        }
        match self.lb.as_mut() {
            Some(lb) => lb.take_pending(),
            None => vec![],
        }
    }
}
