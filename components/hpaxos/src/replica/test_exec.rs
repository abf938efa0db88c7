#[cfg(test)]
use pretty_assertions::assert_eq;

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::mpsc::unbounded_channel;

use super::test_util::*;
use super::*;
use crate::proto::*;
use crate::transport::Propose;

#[test]
fn test_kv_state_execute() {
    let mut kv = KvState::new();

    // (command, result)
    let cases = vec![
        (cmd!(get 1), NIL),
        (cmd!(put 1, 5), 5),
        (cmd!(get 1), 5),
        (cmd!(rmw 1, 3), 8),
        (cmd!(rmw 2, -4), -4),
        (cmd!(rmw 1, i64::max_value()), 7 + i64::min_value()),
        (cmd!(), NIL),
        (cmd!(get 2), -4),
    ];

    for (cmd, want) in cases {
        assert_eq!(want, kv.execute(&cmd), "{}", cmd);
    }
    assert_eq!(None, kv.get(3));
}

fn entry(i: InstanceNo, cmds: Vec<Command>, proposals: Vec<Propose>) -> CommittedEntry {
    CommittedEntry {
        instance: i,
        cmds,
        proposals,
    }
}

#[test]
fn test_executor_in_order() {
    let (_tx, rx) = unbounded_channel();
    let committed = Arc::new(AtomicI32::new(-1));
    let executed = Arc::new(AtomicI32::new(-1));
    let mut ex = Executor::new(rx, committed.clone(), executed.clone());

    let (p0, mut rx0) = new_propose(1, cmd!(rmw 7, 2));
    let (p1, mut rx1) = new_propose(2, cmd!(rmw 7, 3));

    ex.accept(entry(1, cmds![(rmw 7, 3)], vec![p1]));
    ex.accept(entry(0, cmds![(rmw 7, 2)], vec![p0]));

    // nothing runs ahead of the committed prefix
    assert_eq!(0, ex.execute_ready());
    assert_eq!(None, try_reply(&mut rx0));

    committed.store(0, Ordering::Release);
    assert_eq!(1, ex.execute_ready());
    assert_eq!(Some(ok_reply(1, 2)), try_reply(&mut rx0));
    assert_eq!(None, try_reply(&mut rx1));
    assert_eq!(0, executed.load(Ordering::Acquire));

    committed.store(1, Ordering::Release);
    assert_eq!(1, ex.execute_ready());
    assert_eq!(Some(ok_reply(2, 5)), try_reply(&mut rx1));
    assert_eq!(1, executed.load(Ordering::Acquire));
    assert_eq!(Some(5), ex.state().get(7));

    // executed instances are not run twice
    ex.accept(entry(0, cmds![(rmw 7, 2)], vec![]));
    assert_eq!(0, ex.execute_ready());
    assert_eq!(Some(5), ex.state().get(7));
}

#[test]
fn test_executor_gap_blocks() {
    let (_tx, rx) = unbounded_channel();
    let committed = Arc::new(AtomicI32::new(2));
    let executed = Arc::new(AtomicI32::new(-1));
    let mut ex = Executor::new(rx, committed, executed.clone());

    ex.accept(entry(0, cmds![(put 1, 1)], vec![]));
    ex.accept(entry(2, cmds![(put 1, 3)], vec![]));

    assert_eq!(1, ex.execute_ready());
    assert_eq!(0, executed.load(Ordering::Acquire));

    ex.accept(entry(1, cmds![(put 1, 2)], vec![]));
    assert_eq!(2, ex.execute_ready());
    assert_eq!(2, executed.load(Ordering::Acquire));
    assert_eq!(Some(3), ex.state().get(1));
}

#[test]
fn test_registers_and_rmw_share_state() {
    let conf = ReplicaConf {
        exec: true,
        dreply: true,
        ..test_conf()
    };
    let (mut r, _outbox) = new_replica_with(0, 1, conf, Wal::disabled());
    let (etx, mut erx) = unbounded_channel();
    r.committed_tx = Some(etx);

    let (_tx, rx_exec) = unbounded_channel();
    let applied = Arc::new(Mutex::new(vec![]));
    let mut ex = Executor::new(
        rx_exec,
        r.log.committed_up_to_handle(),
        Arc::new(AtomicI32::new(-1)),
    )
    .record_applied(applied.clone());

    // (command, result)
    let cases = vec![
        (cmd!(put 5, 10), 10),
        (cmd!(rmw 5, 1), 11),
        (cmd!(get 5), 11),
        (cmd!(put 1, 10), 10),
        (cmd!(get 2), NIL),
    ];

    for (i, (cmd, want)) in cases.into_iter().enumerate() {
        let id = i as i32 + 1;
        let (p, mut rx) = new_propose(id, cmd);
        r.handle_propose(p).unwrap();

        while let Some(Some(e)) = erx.recv().now_or_never() {
            ex.accept(e);
        }
        ex.execute_ready();
        assert_eq!(Some(ok_reply(id, want)), try_reply(&mut rx), "{}", cmd);
    }

    let read = |key, value| Command {
        value,
        ..cmd!(get key)
    };
    let want = vec![
        cmd!(put 5, 10),
        cmd!(rmw 5, 1),
        read(5, 10),
        cmd!(put 1, 10),
        read(2, NIL),
    ];
    assert_eq!(want, *applied.lock().unwrap());
}

#[test]
fn test_replica_deferred_reply() {
    let conf = ReplicaConf {
        exec: true,
        dreply: true,
        ..test_conf()
    };
    let (mut r, outbox) = new_replica_with(0, 3, conf, Wal::disabled());
    let (etx, mut erx) = unbounded_channel();
    r.committed_tx = Some(etx);
    r.default_ballot = 32;

    let (p, mut rx) = new_propose(1, cmd!(rmw 5, 3));
    r.handle_propose(p).unwrap();
    outbox.take();

    r.handle_peer_msg(env(1, AcceptReply {
        instance: 0,
        ok: true,
        ballot: 32,
    }))
    .unwrap();

    // committed, but the client waits for the result
    assert_eq!(0, r.committed_up_to());
    assert_eq!(None, try_reply(&mut rx));

    let e = erx.recv().now_or_never().flatten().unwrap();
    assert_eq!(0, e.instance);
    assert_eq!(cmds![(rmw 5, 3)], e.cmds);
    assert_eq!(1, e.proposals.len());

    let (_tx, rx_exec) = unbounded_channel();
    let executed = Arc::new(AtomicI32::new(-1));
    let mut ex = Executor::new(rx_exec, r.log.committed_up_to_handle(), executed);
    ex.accept(e);
    assert_eq!(1, ex.execute_ready());
    assert_eq!(Some(ok_reply(1, 3)), try_reply(&mut rx));
}

#[test]
fn test_replica_reply_at_commit() {
    let (mut r, _outbox) = new_replica(0, 1);
    let (etx, mut erx) = unbounded_channel();
    r.committed_tx = Some(etx);

    let (p, mut rx) = new_propose(1, cmd!(rmw 5, 3));
    r.handle_propose(p).unwrap();

    assert_eq!(Some(ok_reply(1, NIL)), try_reply(&mut rx));

    // the executor still gets the instance, without clients
    let e = erx.recv().now_or_never().flatten().unwrap();
    assert_eq!(0, e.instance);
    assert!(e.proposals.is_empty());
}
