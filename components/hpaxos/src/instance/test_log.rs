#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::proto::*;

fn committed(cmds: Vec<Command>) -> Instance {
    Instance::passive(Some(cmds), 16, InstanceStatus::Committed)
}

#[test]
fn test_log_bounds() {
    let mut log = InstanceLog::new(4);

    assert!(log.get(-1).is_none());
    assert!(log.get(0).is_none());
    assert!(log.get(100).is_none());
    assert!(log.is_empty());

    assert_eq!(Err(LogError::Negative(-1)), log.set(-1, committed(cmds![()])));
    assert_eq!(Err(LogError::OutOfRange(4, 4)), log.set(4, committed(cmds![()])));

    log.set(2, committed(cmds![(rmw 1, 1)])).unwrap();
    assert_eq!(3, log.len());
    assert!(log.get(0).is_none());
    assert!(log.get(1).is_none());
    assert_eq!(Some(cmds![(rmw 1, 1)]), log.get(2).unwrap().cmds);

    log.get_mut(2).unwrap().ballot = 32;
    assert_eq!(32, log.get(2).unwrap().ballot);
}

#[test]
fn test_log_next_free() {
    let mut log = InstanceLog::new(4);
    assert_eq!(Ok(0), log.next_free());

    log.set(0, committed(cmds![()])).unwrap();
    log.set(1, committed(cmds![()])).unwrap();
    log.set(3, committed(cmds![()])).unwrap();
    assert_eq!(Ok(2), log.next_free());

    log.set(2, committed(cmds![()])).unwrap();
    assert_eq!(Err(LogError::OutOfRange(4, 4)), log.next_free());
}

#[test]
fn test_log_advance_committed() {
    let mut log = InstanceLog::new(100);
    let handle = log.committed_up_to_handle();
    assert_eq!(-1, log.committed_up_to());
    assert_eq!(Vec::<InstanceNo>::new(), log.advance_committed());

    log.set(0, committed(cmds![(rmw 1, 1)])).unwrap();
    log.set(2, committed(cmds![(rmw 1, 1)])).unwrap();
    assert_eq!(vec![0], log.advance_committed());
    assert_eq!(0, log.committed_up_to());

    // not yet decided: committed without commands, a register slot, accepted
    log.set(1, Instance::passive(None, 16, InstanceStatus::Committed))
        .unwrap();
    assert_eq!(Vec::<InstanceNo>::new(), log.advance_committed());

    log.set(1, Instance::register(cmds![(put 1, 1)])).unwrap();
    assert_eq!(Vec::<InstanceNo>::new(), log.advance_committed());

    log.set(1, Instance::passive(Some(cmds![()]), 16, InstanceStatus::Accepted))
        .unwrap();
    assert_eq!(Vec::<InstanceNo>::new(), log.advance_committed());
    assert_eq!(0, log.committed_up_to());

    log.get_mut(1).unwrap().status = InstanceStatus::Committed;
    assert_eq!(vec![1, 2], log.advance_committed());
    assert_eq!(2, log.committed_up_to());
    assert_eq!(2, handle.load(std::sync::atomic::Ordering::Acquire));
}
