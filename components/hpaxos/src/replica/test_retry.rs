#[cfg(test)]
use pretty_assertions::assert_eq;

use std::time::{Duration, Instant};

use super::test_util::*;
use super::*;

#[test]
fn test_retry_backoff_bounds() {
    let q = RetryQueue::new(Duration::from_millis(10), Duration::from_millis(100));

    // (retries, lowest ms, highest ms)
    let cases: Vec<(u32, u64, u64)> = vec![
        (0, 5, 10),
        (1, 5, 10),
        (2, 10, 20),
        (3, 20, 40),
        (4, 40, 80),
        (5, 50, 100),
        (30, 50, 100),
    ];

    for (retries, lo, hi) in cases {
        for _ in 0..20 {
            let d = q.backoff(retries);
            assert!(
                d >= Duration::from_millis(lo) && d <= Duration::from_millis(hi),
                "retries:{} got:{:?}",
                retries,
                d
            );
        }
    }
}

#[test]
fn test_retry_queue() {
    let mut q = RetryQueue::new(Duration::from_millis(10), Duration::from_millis(100));
    assert!(q.is_empty());
    assert!(q.pop().is_none());

    let (a, _ra) = new_propose(1, cmd!(rmw 1, 1));
    let (b, _rb) = new_propose(2, cmd!(rmw 1, 2));
    let (c, _rc) = new_propose(3, cmd!(rmw 1, 3));

    let now = Instant::now();
    q.push(a);
    q.push_backoff(b, now);
    q.push(c);
    assert_eq!(3, q.len());

    // ready requests come out in order; the delayed one is not due yet
    assert_eq!(1, q.pop().unwrap().command_id);
    assert_eq!(3, q.pop().unwrap().command_id);
    assert!(q.pop().is_none());
    assert_eq!(1, q.len());

    assert_eq!(0, q.promote(now));
    assert_eq!(1, q.promote(now + Duration::from_millis(10)));

    let b = q.pop().unwrap();
    assert_eq!(2, b.command_id);
    assert_eq!(1, b.retries);
    assert!(q.is_empty());
}
