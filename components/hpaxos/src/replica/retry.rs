use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::transport::Propose;

/// RetryQueue holds client requests that have to be proposed again. Some
/// are due at once, others wait for a backoff deadline.
#[derive(Debug)]
pub struct RetryQueue {
    ready: VecDeque<Propose>,
    delayed: Vec<(Instant, Propose)>,
    base: Duration,
    max: Duration,
}

impl RetryQueue {
    pub fn new(base: Duration, max: Duration) -> Self {
        RetryQueue {
            ready: VecDeque::new(),
            delayed: Vec::new(),
            base,
            max,
        }
    }

    pub fn push(&mut self, p: Propose) {
        self.ready.push_back(p);
    }

    /// push_backoff schedules `p` after an exponential, jittered delay.
    pub fn push_backoff(&mut self, mut p: Propose, now: Instant) {
        p.retries += 1;
        let d = self.backoff(p.retries);
        self.delayed.push((now + d, p));
    }

    /// backoff returns a random delay in [cap/2, cap], where cap doubles with
    /// every retry up to `max`.
    pub fn backoff(&self, retries: u32) -> Duration {
        let exp = retries.saturating_sub(1).min(16);
        let cap = self.base.checked_mul(1 << exp).unwrap_or(self.max).min(self.max);

        let ms = cap.as_millis() as u64;
        let jittered = rand::thread_rng().gen_range(ms / 2, ms + 1);
        Duration::from_millis(jittered)
    }

    /// promote moves requests whose deadline passed to the ready queue.
    pub fn promote(&mut self, now: Instant) -> usize {
        let mut n = 0;
        let mut i = 0;
        while i < self.delayed.len() {
            if self.delayed[i].0 <= now {
                let (_, p) = self.delayed.swap_remove(i);
                self.ready.push_back(p);
                n += 1;
            } else {
                i += 1;
            }
        }
        n
    }

    pub fn pop(&mut self) -> Option<Propose> {
        self.ready.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ready.len() + self.delayed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
