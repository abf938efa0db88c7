#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_make_ballot() {
    let cases: Vec<(i32, ReplicaId, Ballot)> =
        vec![(0, 0, 0), (0, 3, 3), (1, 0, 16), (2, 0, 32), (2, 5, 37), (3, 15, 63)];

    for (round, rid, want) in cases {
        let b = make_ballot(round, rid);
        assert_eq!(want, b, "round: {}, rid: {}", round, rid);
        assert_eq!(round, ballot_round(b));
        assert_eq!(Some(rid), ballot_owner(b));
    }

    assert_eq!(None, ballot_owner(NO_BALLOT));
}

#[test]
fn test_ballot_unique_per_replica() {
    for round in 0..64 {
        for r1 in 0..MAX_REPLICAS as i32 {
            for r2 in 0..MAX_REPLICAS as i32 {
                if r1 != r2 {
                    assert_ne!(make_ballot(round, r1), make_ballot(round, r2));
                }
            }
        }
    }
}

#[test]
fn test_ballot_order_follows_round() {
    assert!(make_ballot(2, 0) > make_ballot(1, 15));
    assert!(make_ballot(1, 0) > make_ballot(0, 15));
    assert!(make_ballot(0, 15) > NO_BALLOT);
}

#[test]
fn test_tag_order() {
    let a = Tag {
        timestamp: 1,
        proposer_id: 2,
    };
    let b = Tag {
        timestamp: 2,
        proposer_id: 0,
    };
    let c = Tag {
        timestamp: 2,
        proposer_id: 1,
    };

    assert!(a < b);
    assert!(b < c);
    assert!(payload!(2, 1, 0).newer_than(&payload!(2, 0, 100)));
    assert!(!payload!(2, 0, 100).newer_than(&payload!(2, 0, 1)));
}

#[test]
fn test_command_routing() {
    assert!(!cmd!(put 1, 2).needs_log());
    assert!(!cmd!(get 1).needs_log());
    assert!(cmd!(rmw 1, 2).needs_log());
    assert!(cmd!().needs_log());

    assert!(cmd!(put 1, 2).is_write());
    assert!(!cmd!(get 1).is_write());
}

#[test]
fn test_command_display() {
    assert_eq!("PUT 5=9", format!("{}", cmd!(put 5, 9)));
    assert_eq!("GET 5", format!("{}", cmd!(get 5)));
    assert_eq!("RMW 5+=1", format!("{}", cmd!(rmw 5, 1)));
    assert_eq!("NONE", format!("{}", cmd!()));
    assert_eq!("(3, 1):7", format!("{}", payload!(3, 1, 7)));
}
