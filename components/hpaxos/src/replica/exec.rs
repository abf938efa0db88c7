use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::delay_for;

use super::reply_to;
use crate::proto::*;
use crate::transport::Propose;

/// KvState is the state machine the log is applied to.
#[derive(Debug, Default)]
pub struct KvState {
    kv: HashMap<i64, i64>,
}

impl KvState {
    pub fn new() -> Self {
        KvState::default()
    }

    /// execute applies `cmd` and returns its result: the stored value for
    /// PUT, the current value (or NIL) for GET and the new value for RMW.
    pub fn execute(&mut self, cmd: &Command) -> i64 {
        match cmd.op {
            OpCode::Put => {
                self.kv.insert(cmd.key, cmd.value);
                cmd.value
            }
            OpCode::Get => self.get(cmd.key).unwrap_or(NIL),
            OpCode::Rmw => {
                let v = self.kv.entry(cmd.key).or_insert(NIL);
                *v = v.wrapping_add(cmd.value);
                *v
            }
            OpCode::None => NIL,
        }
    }

    pub fn get(&self, key: i64) -> Option<i64> {
        self.kv.get(&key).copied()
    }
}

/// CommittedEntry is a decided instance handed to the executor, together
/// with the clients waiting for its result.
#[derive(Debug)]
pub struct CommittedEntry {
    pub instance: InstanceNo,
    pub cmds: Vec<Command>,
    pub proposals: Vec<Propose>,
}

/// Executor applies decided instances in instance order. It never runs ahead
/// of `committed_up_to`.
pub struct Executor {
    state: KvState,

    /// Next instance to execute.
    next: InstanceNo,

    pending: BTreeMap<InstanceNo, CommittedEntry>,

    committed_up_to: Arc<AtomicI32>,
    executed_up_to: Arc<AtomicI32>,

    rx: UnboundedReceiver<CommittedEntry>,
    idle: Duration,

    /// Every command applied so far, in log order.
    applied: Option<Arc<Mutex<Vec<Command>>>>,
}

impl Executor {
    pub fn new(
        rx: UnboundedReceiver<CommittedEntry>,
        committed_up_to: Arc<AtomicI32>,
        executed_up_to: Arc<AtomicI32>,
    ) -> Self {
        Executor {
            state: KvState::new(),
            next: 0,
            pending: BTreeMap::new(),
            committed_up_to,
            executed_up_to,
            rx,
            idle: Duration::from_millis(1),
            applied: None,
        }
    }

    /// record_applied makes the executor append every command it applies to
    /// `applied`.
    pub fn record_applied(mut self, applied: Arc<Mutex<Vec<Command>>>) -> Self {
        self.applied = Some(applied);
        self
    }

    pub fn state(&self) -> &KvState {
        &self.state
    }

    pub fn accept(&mut self, e: CommittedEntry) {
        if e.instance < self.next {
            debug!("instance {} is already executed", e.instance);
            return;
        }
        self.pending.insert(e.instance, e);
    }

    /// execute_ready runs every buffered instance up to the committed prefix
    /// and returns how many it ran.
    pub fn execute_ready(&mut self) -> usize {
        let limit = self.committed_up_to.load(Ordering::Acquire);
        let mut n = 0;

        while self.next <= limit {
            let e = match self.pending.remove(&self.next) {
                Some(e) => e,
                None => break,
            };

            let results: Vec<i64> = e.cmds.iter().map(|c| self.state.execute(c)).collect();
            if let Some(applied) = &self.applied {
                match applied.lock() {
                    Ok(mut a) => a.extend_from_slice(&e.cmds),
                    Err(_) => warn!("instance {}: applied history is poisoned", e.instance),
                }
            }
            for (idx, p) in e.proposals.iter().enumerate() {
                reply_to(p, true, results.get(idx).copied().unwrap_or(NIL));
            }

            self.next += 1;
            n += 1;
        }

        if n > 0 {
            self.executed_up_to.store(self.next - 1, Ordering::Release);
        }
        n
    }

    /// run executes until the replica drops its end of the channel.
    pub async fn run(mut self) {
        let idle = self.idle;

        loop {
            let got = tokio::select! {
                e = self.rx.recv() => e.map(Some),
                _ = delay_for(idle) => Some(None),
            };

            match got {
                None => break,
                Some(Some(e)) => self.accept(e),
                Some(None) => {}
            }
            self.execute_ready();
        }

        debug!("executor stopped at instance {}", self.next);
    }
}
