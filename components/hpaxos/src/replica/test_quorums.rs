#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_quorum_reached() {
    // (acks from peers, cluster size, reached)
    let cases: Vec<(usize, usize, bool)> = vec![
        (0, 1, true),
        (0, 2, false),
        (1, 2, true),
        (0, 3, false),
        (1, 3, true),
        (1, 4, false),
        (2, 4, true),
        (1, 5, false),
        (2, 5, true),
        (4, 5, true),
    ];

    for (acks, n, want) in cases {
        assert_eq!(want, quorum_reached(acks, n), "acks:{} n:{}", acks, n);
    }
}

#[test]
fn test_quorum_lost() {
    // (nacks, cluster size, lost)
    let cases: Vec<(usize, usize, bool)> = vec![
        (0, 3, false),
        (1, 3, false),
        (2, 3, true),
        (1, 4, false),
        (2, 4, true),
        (2, 5, false),
        (3, 5, true),
        (9, 5, true),
    ];

    for (nacks, n, want) in cases {
        assert_eq!(want, quorum_lost(nacks, n), "nacks:{} n:{}", nacks, n);
    }
}
