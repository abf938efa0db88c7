use std::convert::TryFrom;

use super::*;

/// Get asks a peer for its register payload of `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Get {
    pub replica_id: ReplicaId,
    pub instance: InstanceNo,
    pub is_write: bool,
    pub key: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetReply {
    pub instance: InstanceNo,
    pub ok: bool,
    pub is_write: bool,
    pub payload: Payload,
}

/// Set asks a peer to store `payload` for `key` if it is newer than what it
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Set {
    pub replica_id: ReplicaId,
    pub instance: InstanceNo,
    pub is_write: bool,
    pub payload: Payload,
    pub key: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetReply {
    pub instance: InstanceNo,
    pub ok: bool,
    pub is_write: bool,
    pub payload: Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prepare {
    pub leader_id: ReplicaId,
    pub instance: InstanceNo,
    pub ballot: Ballot,
    /// Install `ballot` as the receiver's default ballot for every instance.
    pub to_infinity: bool,
}

/// PrepareReply answers the Prepare of `prepare_ballot`. An ok carries the
/// value accepted at `ballot`, a nack the higher ballot promised.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrepareReply {
    pub instance: InstanceNo,
    pub ok: bool,
    pub ballot: Ballot,
    pub cmds: Vec<Command>,
    pub prepare_ballot: Ballot,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Accept {
    pub leader_id: ReplicaId,
    pub instance: InstanceNo,
    pub ballot: Ballot,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptReply {
    pub instance: InstanceNo,
    pub ok: bool,
    pub ballot: Ballot,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    pub leader_id: ReplicaId,
    pub instance: InstanceNo,
    pub ballot: Ballot,
    pub cmds: Vec<Command>,
}

/// CommitShort is sent to peers that already hold the accepted commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitShort {
    pub leader_id: ReplicaId,
    pub instance: InstanceNo,
    pub count: i32,
    pub ballot: Ballot,
}

/// MsgType is the one-byte tag that precedes every message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgType {
    Get = 0,
    GetReply = 1,
    Set = 2,
    SetReply = 3,
    Prepare = 4,
    PrepareReply = 5,
    Accept = 6,
    AcceptReply = 7,
    Commit = 8,
    CommitShort = 9,
}

impl TryFrom<u8> for MsgType {
    type Error = ProtocolError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        let t = match v {
            0 => MsgType::Get,
            1 => MsgType::GetReply,
            2 => MsgType::Set,
            3 => MsgType::SetReply,
            4 => MsgType::Prepare,
            5 => MsgType::PrepareReply,
            6 => MsgType::Accept,
            7 => MsgType::AcceptReply,
            8 => MsgType::Commit,
            9 => MsgType::CommitShort,
            _ => return Err(ProtocolError::UnknownType(v)),
        };
        Ok(t)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMsg {
    Get(Get),
    GetReply(GetReply),
    Set(Set),
    SetReply(SetReply),
    Prepare(Prepare),
    PrepareReply(PrepareReply),
    Accept(Accept),
    AcceptReply(AcceptReply),
    Commit(Commit),
    CommitShort(CommitShort),
}

macro_rules! impl_peer_msg {
    ($($t:ident),*) => {
        $(
            impl From<$t> for PeerMsg {
                fn from(m: $t) -> Self {
                    PeerMsg::$t(m)
                }
            }
        )*

        impl PeerMsg {
            pub fn msg_type(&self) -> MsgType {
                match self {
                    $( PeerMsg::$t(_) => MsgType::$t, )*
                }
            }

            pub fn instance(&self) -> InstanceNo {
                match self {
                    $( PeerMsg::$t(m) => m.instance, )*
                }
            }
        }
    };
}

impl_peer_msg!(
    Get,
    GetReply,
    Set,
    SetReply,
    Prepare,
    PrepareReply,
    Accept,
    AcceptReply,
    Commit,
    CommitShort
);

/// Envelope is an inbound peer message together with the replica it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: ReplicaId,
    pub msg: PeerMsg,
}
