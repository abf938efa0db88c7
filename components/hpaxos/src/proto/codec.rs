use std::convert::TryFrom;

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use super::*;

/// Size of one encoded command: op:u8, key:i64, value:i64.
pub const COMMAND_SIZE: usize = 17;

/// Upper bound of the command count of one message. A larger count is
/// treated as garbage instead of waiting for more bytes.
pub const MAX_COMMANDS: i64 = 1 << 20;

/// Byte order of fixed-size integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Big,
    Little,
}

impl Default for Endian {
    fn default() -> Self {
        Endian::Big
    }
}

/// Marshal is implemented by everything that has a bit-exact wire layout.
pub trait Marshal: Sized {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B);
    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError>;

    fn to_bytes(&self, e: Endian) -> Vec<u8> {
        let mut buf = Vec::new();
        self.marshal(e, &mut buf);
        buf
    }
}

fn need<B: Buf>(buf: &B, n: usize, what: &'static str) -> Result<(), ProtocolError> {
    if buf.remaining() < n {
        Err(ProtocolError::Incomplete(what))
    } else {
        Ok(())
    }
}

fn get_u8<B: Buf>(buf: &mut B, what: &'static str) -> Result<u8, ProtocolError> {
    need(buf, 1, what)?;
    Ok(buf.get_u8())
}

fn get_bool<B: Buf>(buf: &mut B, what: &'static str) -> Result<bool, ProtocolError> {
    Ok(get_u8(buf, what)? != 0)
}

fn get_i32<B: Buf>(e: Endian, buf: &mut B, what: &'static str) -> Result<i32, ProtocolError> {
    need(buf, 4, what)?;
    let v = match e {
        Endian::Big => buf.get_i32(),
        Endian::Little => buf.get_i32_le(),
    };
    Ok(v)
}

fn get_i64<B: Buf>(e: Endian, buf: &mut B, what: &'static str) -> Result<i64, ProtocolError> {
    need(buf, 8, what)?;
    let v = match e {
        Endian::Big => buf.get_i64(),
        Endian::Little => buf.get_i64_le(),
    };
    Ok(v)
}

fn put_bool<B: BufMut>(buf: &mut B, v: bool) {
    buf.put_u8(v as u8);
}

fn put_i32<B: BufMut>(e: Endian, buf: &mut B, v: i32) {
    match e {
        Endian::Big => buf.put_i32(v),
        Endian::Little => buf.put_i32_le(v),
    }
}

fn put_i64<B: BufMut>(e: Endian, buf: &mut B, v: i64) {
    match e {
        Endian::Big => buf.put_i64(v),
        Endian::Little => buf.put_i64_le(v),
    }
}

/// put_varint writes a zig-zag encoded signed varint.
pub fn put_varint<B: BufMut>(buf: &mut B, x: i64) {
    let mut ux = ((x << 1) ^ (x >> 63)) as u64;
    while ux >= 0x80 {
        buf.put_u8(ux as u8 | 0x80);
        ux >>= 7;
    }
    buf.put_u8(ux as u8);
}

pub fn get_varint<B: Buf>(buf: &mut B) -> Result<i64, ProtocolError> {
    let mut ux: u64 = 0;
    let mut shift = 0;

    for i in 0..10 {
        let b = get_u8(buf, "varint")?;
        if b < 0x80 {
            if i == 9 && b > 1 {
                return Err(ProtocolError::BadVarint);
            }
            ux |= (b as u64) << shift;
            let x = (ux >> 1) as i64;
            return Ok(if ux & 1 != 0 { !x } else { x });
        }
        ux |= ((b & 0x7f) as u64) << shift;
        shift += 7;
    }

    Err(ProtocolError::BadVarint)
}

pub fn put_commands<B: BufMut>(e: Endian, buf: &mut B, cmds: &[Command]) {
    put_varint(buf, cmds.len() as i64);
    for c in cmds {
        c.marshal(e, buf);
    }
}

pub fn get_commands<B: Buf>(e: Endian, buf: &mut B) -> Result<Vec<Command>, ProtocolError> {
    let n = get_varint(buf)?;
    if n < 0 || n > MAX_COMMANDS {
        return Err(ProtocolError::BadLength(n));
    }
    let n = n as usize;

    let mut cmds = Vec::with_capacity(n.min(buf.remaining() / COMMAND_SIZE));
    for _ in 0..n {
        cmds.push(Command::unmarshal(e, buf)?);
    }
    Ok(cmds)
}

impl Marshal for Command {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        buf.put_u8(self.op as u8);
        put_i64(e, buf, self.key);
        put_i64(e, buf, self.value);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        let op = OpCode::try_from(get_u8(buf, "command.op")?)?;
        let key = get_i64(e, buf, "command.key")?;
        let value = get_i64(e, buf, "command.value")?;
        Ok(Command { op, key, value })
    }
}

impl Marshal for Payload {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i64(e, buf, self.tag.timestamp);
        put_i64(e, buf, self.tag.proposer_id);
        put_i64(e, buf, self.value);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        let timestamp = get_i64(e, buf, "payload.timestamp")?;
        let proposer_id = get_i64(e, buf, "payload.proposer_id")?;
        let value = get_i64(e, buf, "payload.value")?;
        Ok(Payload {
            tag: Tag {
                timestamp,
                proposer_id,
            },
            value,
        })
    }
}

impl Marshal for Get {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.replica_id);
        put_i32(e, buf, self.instance);
        put_bool(buf, self.is_write);
        put_i64(e, buf, self.key);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Get {
            replica_id: get_i32(e, buf, "get.replica_id")?,
            instance: get_i32(e, buf, "get.instance")?,
            is_write: get_bool(buf, "get.is_write")?,
            key: get_i64(e, buf, "get.key")?,
        })
    }
}

impl Marshal for GetReply {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.instance);
        put_bool(buf, self.ok);
        put_bool(buf, self.is_write);
        self.payload.marshal(e, buf);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(GetReply {
            instance: get_i32(e, buf, "get_reply.instance")?,
            ok: get_bool(buf, "get_reply.ok")?,
            is_write: get_bool(buf, "get_reply.is_write")?,
            payload: Payload::unmarshal(e, buf)?,
        })
    }
}

impl Marshal for Set {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.replica_id);
        put_i32(e, buf, self.instance);
        put_bool(buf, self.is_write);
        self.payload.marshal(e, buf);
        put_i64(e, buf, self.key);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Set {
            replica_id: get_i32(e, buf, "set.replica_id")?,
            instance: get_i32(e, buf, "set.instance")?,
            is_write: get_bool(buf, "set.is_write")?,
            payload: Payload::unmarshal(e, buf)?,
            key: get_i64(e, buf, "set.key")?,
        })
    }
}

impl Marshal for SetReply {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.instance);
        put_bool(buf, self.ok);
        put_bool(buf, self.is_write);
        self.payload.marshal(e, buf);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(SetReply {
            instance: get_i32(e, buf, "set_reply.instance")?,
            ok: get_bool(buf, "set_reply.ok")?,
            is_write: get_bool(buf, "set_reply.is_write")?,
            payload: Payload::unmarshal(e, buf)?,
        })
    }
}

impl Marshal for Prepare {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.leader_id);
        put_i32(e, buf, self.instance);
        put_i32(e, buf, self.ballot);
        put_bool(buf, self.to_infinity);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Prepare {
            leader_id: get_i32(e, buf, "prepare.leader_id")?,
            instance: get_i32(e, buf, "prepare.instance")?,
            ballot: get_i32(e, buf, "prepare.ballot")?,
            to_infinity: get_bool(buf, "prepare.to_infinity")?,
        })
    }
}

impl Marshal for PrepareReply {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.instance);
        put_bool(buf, self.ok);
        put_i32(e, buf, self.ballot);
        put_commands(e, buf, &self.cmds);
        put_i32(e, buf, self.prepare_ballot);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(PrepareReply {
            instance: get_i32(e, buf, "prepare_reply.instance")?,
            ok: get_bool(buf, "prepare_reply.ok")?,
            ballot: get_i32(e, buf, "prepare_reply.ballot")?,
            cmds: get_commands(e, buf)?,
            prepare_ballot: get_i32(e, buf, "prepare_reply.prepare_ballot")?,
        })
    }
}

impl Marshal for Accept {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.leader_id);
        put_i32(e, buf, self.instance);
        put_i32(e, buf, self.ballot);
        put_commands(e, buf, &self.cmds);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Accept {
            leader_id: get_i32(e, buf, "accept.leader_id")?,
            instance: get_i32(e, buf, "accept.instance")?,
            ballot: get_i32(e, buf, "accept.ballot")?,
            cmds: get_commands(e, buf)?,
        })
    }
}

impl Marshal for AcceptReply {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.instance);
        put_bool(buf, self.ok);
        put_i32(e, buf, self.ballot);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(AcceptReply {
            instance: get_i32(e, buf, "accept_reply.instance")?,
            ok: get_bool(buf, "accept_reply.ok")?,
            ballot: get_i32(e, buf, "accept_reply.ballot")?,
        })
    }
}

impl Marshal for Commit {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.leader_id);
        put_i32(e, buf, self.instance);
        put_i32(e, buf, self.ballot);
        put_commands(e, buf, &self.cmds);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Commit {
            leader_id: get_i32(e, buf, "commit.leader_id")?,
            instance: get_i32(e, buf, "commit.instance")?,
            ballot: get_i32(e, buf, "commit.ballot")?,
            cmds: get_commands(e, buf)?,
        })
    }
}

impl Marshal for CommitShort {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        put_i32(e, buf, self.leader_id);
        put_i32(e, buf, self.instance);
        put_i32(e, buf, self.count);
        put_i32(e, buf, self.ballot);
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(CommitShort {
            leader_id: get_i32(e, buf, "commit_short.leader_id")?,
            instance: get_i32(e, buf, "commit_short.instance")?,
            count: get_i32(e, buf, "commit_short.count")?,
            ballot: get_i32(e, buf, "commit_short.ballot")?,
        })
    }
}

/// A PeerMsg is encoded as its one-byte type tag followed by the message body.
impl Marshal for PeerMsg {
    fn marshal<B: BufMut>(&self, e: Endian, buf: &mut B) {
        buf.put_u8(self.msg_type() as u8);
        match self {
            PeerMsg::Get(m) => m.marshal(e, buf),
            PeerMsg::GetReply(m) => m.marshal(e, buf),
            PeerMsg::Set(m) => m.marshal(e, buf),
            PeerMsg::SetReply(m) => m.marshal(e, buf),
            PeerMsg::Prepare(m) => m.marshal(e, buf),
            PeerMsg::PrepareReply(m) => m.marshal(e, buf),
            PeerMsg::Accept(m) => m.marshal(e, buf),
            PeerMsg::AcceptReply(m) => m.marshal(e, buf),
            PeerMsg::Commit(m) => m.marshal(e, buf),
            PeerMsg::CommitShort(m) => m.marshal(e, buf),
        }
    }

    fn unmarshal<B: Buf>(e: Endian, buf: &mut B) -> Result<Self, ProtocolError> {
        let t = MsgType::try_from(get_u8(buf, "type")?)?;
        let m: PeerMsg = match t {
            MsgType::Get => Get::unmarshal(e, buf)?.into(),
            MsgType::GetReply => GetReply::unmarshal(e, buf)?.into(),
            MsgType::Set => Set::unmarshal(e, buf)?.into(),
            MsgType::SetReply => SetReply::unmarshal(e, buf)?.into(),
            MsgType::Prepare => Prepare::unmarshal(e, buf)?.into(),
            MsgType::PrepareReply => PrepareReply::unmarshal(e, buf)?.into(),
            MsgType::Accept => Accept::unmarshal(e, buf)?.into(),
            MsgType::AcceptReply => AcceptReply::unmarshal(e, buf)?.into(),
            MsgType::Commit => Commit::unmarshal(e, buf)?.into(),
            MsgType::CommitShort => CommitShort::unmarshal(e, buf)?.into(),
        };
        Ok(m)
    }
}

/// PeerCodec frames `PeerMsg`s on a replication stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerCodec {
    endian: Endian,
}

impl PeerCodec {
    pub fn new(endian: Endian) -> Self {
        PeerCodec { endian }
    }
}

impl Encoder for PeerCodec {
    type Item = PeerMsg;
    type Error = ProtocolError;

    fn encode(&mut self, item: PeerMsg, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        item.marshal(self.endian, dst);
        Ok(())
    }
}

impl Decoder for PeerCodec {
    type Item = PeerMsg;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PeerMsg>, ProtocolError> {
        if src.is_empty() {
            return Ok(None);
        }

        let (msg, used) = {
            let mut rd: &[u8] = &src[..];
            let res = PeerMsg::unmarshal(self.endian, &mut rd);
            (res, src.len() - rd.len())
        };

        match msg {
            Ok(m) => {
                src.advance(used);
                Ok(Some(m))
            }
            Err(ProtocolError::Incomplete(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
