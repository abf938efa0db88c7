/// quorum_reached tells if `acks` replies from peers, plus the implicit vote
/// of the local replica, make a strict majority of `n`.
pub fn quorum_reached(acks: usize, n: usize) -> bool {
    acks + 1 > n / 2
}

/// quorum_lost tells if `nacks` rejections leave too few replicas to ever
/// form a quorum.
pub fn quorum_lost(nacks: usize, n: usize) -> bool {
    n - nacks.min(n) <= n / 2
}
