#[cfg(test)]
use pretty_assertions::assert_eq;

use storage::{MemStore, StorageError};

use super::test_util::*;
use super::*;
use crate::instance::*;
use crate::proto::*;

#[test]
fn test_wal_disabled() {
    let mut wal = Wal::disabled();
    assert!(!wal.is_enabled());

    let inst = Instance::passive(Some(cmds![(rmw 1, 1)]), 16, InstanceStatus::Accepted);
    wal.record_instance_metadata(&inst).unwrap();
    wal.record_commands(inst.cmds.as_ref().unwrap()).unwrap();
    wal.record_payload(5, &payload!(1, 2, 3)).unwrap();
    wal.sync().unwrap();
}

#[test]
fn test_wal_records() {
    let store = MemStore::new();
    let mut wal = Wal::new(Box::new(store.clone()));
    assert!(wal.is_enabled());

    let inst = Instance::passive(Some(cmds![(put 1, 2)]), 0x21, InstanceStatus::Accepted);

    wal.record_instance_metadata(&inst).unwrap();
    assert_eq!(vec![0x21, 0, 0, 0, 2], store.contents());
    assert_eq!(0, store.synced_len());

    wal.sync().unwrap();
    assert_eq!(5, store.synced_len());

    wal.record_commands(inst.cmds.as_ref().unwrap()).unwrap();
    let mut want = vec![0x21, 0, 0, 0, 2];
    want.push(1);
    want.extend_from_slice(&1i64.to_le_bytes());
    want.extend_from_slice(&2i64.to_le_bytes());
    assert_eq!(want, store.contents());

    wal.record_payload(-3, &payload!(7, 1, 9)).unwrap();
    want.extend_from_slice(&(-3i64).to_le_bytes());
    want.extend_from_slice(&7i64.to_le_bytes());
    want.extend_from_slice(&1i64.to_le_bytes());
    want.extend_from_slice(&9i64.to_le_bytes());
    assert_eq!(want, store.contents());
}

#[test]
fn test_wal_no_ballot() {
    let store = MemStore::new();
    let mut wal = Wal::new(Box::new(store.clone()));

    let inst = Instance::passive(None, NO_BALLOT, InstanceStatus::Committed);
    wal.record_instance_metadata(&inst).unwrap();
    assert_eq!(vec![0xff, 0xff, 0xff, 0xff, 3], store.contents());
}

#[test]
fn test_replica_persists_before_sending() {
    let store = MemStore::new();
    let wal = Wal::new(Box::new(store.clone()));
    let (mut r, outbox) = new_replica_with(1, 3, test_conf(), wal);

    let accept = Accept {
        leader_id: 0,
        instance: 0,
        ballot: 16,
        cmds: cmds![(rmw 5, 1)],
    };
    r.handle_peer_msg(env(0, accept)).unwrap();

    // metadata and commands, then one sync
    assert_eq!(5 + COMMAND_SIZE, store.synced_len());
    assert_eq!(1, store.sync_count());
    assert_eq!(vec![0], sent_to(&outbox.take(), MsgType::AcceptReply));

    let set = Set {
        replica_id: 0,
        instance: 1,
        is_write: true,
        payload: payload!(1, 0, 9),
        key: 5,
    };
    r.handle_peer_msg(env(0, set)).unwrap();
    assert_eq!(5 + COMMAND_SIZE + 32, store.synced_len());
    assert_eq!(payload!(1, 0, 9), r.register(5));

    // an older payload is not written
    let set = Set {
        replica_id: 0,
        instance: 2,
        is_write: true,
        payload: payload!(0, 2, 5),
        key: 5,
    };
    r.handle_peer_msg(env(0, set)).unwrap();
    assert_eq!(5 + COMMAND_SIZE + 32, store.synced_len());
    assert_eq!(payload!(1, 0, 9), r.register(5));
}

#[test]
fn test_replica_storage_failure_is_fatal() {
    let store = MemStore::new();
    let wal = Wal::new(Box::new(store.clone()));
    let (mut r, outbox) = new_replica_with(1, 3, test_conf(), wal);

    store.set_broken(true);

    let accept = Accept {
        leader_id: 0,
        instance: 0,
        ballot: 16,
        cmds: cmds![(rmw 5, 1)],
    };
    let err = r.handle_peer_msg(env(0, accept)).unwrap_err();
    assert_eq!(ReplicaError::Storage(StorageError::Broken("append".into())), err);
    assert!(err.is_fatal());

    // nothing is acknowledged
    assert!(outbox.take().is_empty());
}

#[test]
fn test_proposer_records_prepared_before_accepted() {
    let store = MemStore::new();
    let wal = Wal::new(Box::new(store.clone()));
    let (mut r, outbox) = new_replica_with(0, 3, test_conf(), wal);

    let (p, _rx) = new_propose(1, cmd!(rmw 5, 1));
    r.handle_propose(p).unwrap();
    assert_eq!(vec![16, 0, 0, 0, 0], store.contents());
    outbox.take();

    let reply = PrepareReply {
        instance: 0,
        ok: true,
        ballot: NO_BALLOT,
        cmds: vec![],
        prepare_ballot: 16,
    };
    r.handle_peer_msg(env(1, reply)).unwrap();

    // Preparing, Prepared, then Accepted with the value
    let mut want = vec![16, 0, 0, 0, 0, 16, 0, 0, 0, 1, 16, 0, 0, 0, 2];
    cmd!(rmw 5, 1).marshal(Endian::Little, &mut want);
    assert_eq!(want, store.contents());
    assert_eq!(want.len(), store.synced_len());
    assert_eq!(3, store.sync_count());

    assert_eq!(vec![1, 2], sent_to(&outbox.take(), MsgType::Accept));
    assert_eq!(InstanceStatus::Accepted, r.log.get(0).unwrap().status);
}
