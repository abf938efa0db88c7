use std::convert::TryInto;
use std::time::Duration;

use rand::Rng;

use hpaxos::proto::{Endian, ReplicaId};

/// Every replication link starts with the dialing replica's id, as an i32 in
/// the wire byte order.
pub const HANDSHAKE_SIZE: usize = 4;

pub fn encode_handshake(rid: ReplicaId, endian: Endian) -> [u8; HANDSHAKE_SIZE] {
    match endian {
        Endian::Big => rid.to_be_bytes(),
        Endian::Little => rid.to_le_bytes(),
    }
}

pub fn decode_handshake(buf: &[u8], endian: Endian) -> Option<ReplicaId> {
    let b: [u8; HANDSHAKE_SIZE] = buf.get(..HANDSHAKE_SIZE)?.try_into().ok()?;
    let rid = match endian {
        Endian::Big => ReplicaId::from_be_bytes(b),
        Endian::Little => ReplicaId::from_le_bytes(b),
    };
    Some(rid)
}

/// redial_delay returns how long to wait before the `failures`-th reconnect:
/// doubled per failure up to `max`, with jitter.
pub fn redial_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    let cap = base.checked_mul(1 << exp).unwrap_or(max).min(max);

    let ms = cap.as_millis() as u64;
    Duration::from_millis(rand::thread_rng().gen_range(ms / 2, ms + 1))
}
