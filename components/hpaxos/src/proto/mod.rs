use std::convert::TryFrom;
use std::fmt;

mod codec;
pub use codec::*;

mod errors;
pub use errors::*;

mod message;
pub use message::*;

#[cfg(test)]
mod test_ballot;

pub type ReplicaId = i32;
pub type InstanceNo = i32;
pub type Ballot = i32;

/// NO_BALLOT marks a ballot that is not set yet, e.g. the default ballot of a
/// replica that has never seen a `to_infinity` prepare.
pub const NO_BALLOT: Ballot = -1;

/// NIL is the value returned for a command that produces nothing, e.g. a GET
/// of an absent key.
pub const NIL: i64 = 0;

/// The low bits of a ballot hold the proposer's replica id.
pub const REPLICA_ID_BITS: u32 = 4;

pub const MAX_REPLICAS: usize = 1 << REPLICA_ID_BITS;

/// make_ballot builds a ballot unique to `replica_id` for a given round.
pub fn make_ballot(round: i32, replica_id: ReplicaId) -> Ballot {
    (round << REPLICA_ID_BITS) | replica_id
}

pub fn ballot_round(ballot: Ballot) -> i32 {
    ballot >> REPLICA_ID_BITS
}

/// ballot_owner returns the replica that created `ballot`, or None for NO_BALLOT.
pub fn ballot_owner(ballot: Ballot) -> Option<ReplicaId> {
    if ballot < 0 {
        None
    } else {
        Some(ballot & ((1 << REPLICA_ID_BITS) - 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    None = 0,
    Put = 1,
    Get = 2,
    Rmw = 3,
}

impl Default for OpCode {
    fn default() -> Self {
        OpCode::None
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(OpCode::None),
            1 => Ok(OpCode::Put),
            2 => Ok(OpCode::Get),
            3 => Ok(OpCode::Rmw),
            _ => Err(ProtocolError::UnknownOp(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Command {
    pub op: OpCode,
    pub key: i64,
    pub value: i64,
}

impl Command {
    pub fn put(key: i64, value: i64) -> Self {
        Command {
            op: OpCode::Put,
            key,
            value,
        }
    }

    pub fn get(key: i64) -> Self {
        Command {
            op: OpCode::Get,
            key,
            value: NIL,
        }
    }

    /// rmw adds `delta` to the value stored at `key`.
    pub fn rmw(key: i64, delta: i64) -> Self {
        Command {
            op: OpCode::Rmw,
            key,
            value: delta,
        }
    }

    pub fn noop() -> Self {
        Command::default()
    }

    /// needs_log tells if this command goes to the paxos log directly. Plain
    /// reads and writes run the register protocol first and are logged after.
    pub fn needs_log(&self) -> bool {
        self.op != OpCode::Put && self.op != OpCode::Get
    }

    pub fn is_write(&self) -> bool {
        self.op == OpCode::Put
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op {
            OpCode::None => write!(f, "NONE"),
            OpCode::Put => write!(f, "PUT {}={}", self.key, self.value),
            OpCode::Get => write!(f, "GET {}", self.key),
            OpCode::Rmw => write!(f, "RMW {}+={}", self.key, self.value),
        }
    }
}

/// Tag orders register writes: by timestamp first, then by proposer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tag {
    pub timestamp: i64,
    pub proposer_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Payload {
    pub tag: Tag,
    pub value: i64,
}

impl Payload {
    pub fn newer_than(&self, other: &Payload) -> bool {
        self.tag > other.tag
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({}, {}):{}",
            self.tag.timestamp, self.tag.proposer_id, self.value
        )
    }
}
