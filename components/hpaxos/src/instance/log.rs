use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use super::*;
use crate::proto::InstanceNo;

pub const DEFAULT_MAX_INSTANCES: usize = 20 * 1024 * 1024;

/// InstanceLog is the instance space of a replica, addressed by instance
/// number and grown on demand up to `limit` slots.
pub struct InstanceLog {
    slots: Vec<Option<Box<Instance>>>,
    limit: usize,

    /// First slot that may still be free for a new proposal.
    crt: InstanceNo,

    /// Highest instance such that it and every instance before it are decided.
    /// Shared with the executor.
    committed_up_to: Arc<AtomicI32>,
}

impl InstanceLog {
    pub fn new(limit: usize) -> Self {
        InstanceLog {
            slots: Vec::new(),
            limit,
            crt: 0,
            committed_up_to: Arc::new(AtomicI32::new(-1)),
        }
    }

    fn index(&self, i: InstanceNo) -> Result<usize, LogError> {
        if i < 0 {
            return Err(LogError::Negative(i));
        }
        let idx = i as usize;
        if idx >= self.limit {
            return Err(LogError::OutOfRange(i, self.limit));
        }
        Ok(idx)
    }

    pub fn get(&self, i: InstanceNo) -> Option<&Instance> {
        let idx = self.index(i).ok()?;
        self.slots.get(idx)?.as_deref()
    }

    pub fn get_mut(&mut self, i: InstanceNo) -> Option<&mut Instance> {
        let idx = self.index(i).ok()?;
        self.slots.get_mut(idx)?.as_deref_mut()
    }

    pub fn set(&mut self, i: InstanceNo, inst: Instance) -> Result<(), LogError> {
        let idx = self.index(i)?;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx] = Some(Box::new(inst));
        Ok(())
    }

    /// len returns the number of slots allocated so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// next_free returns the lowest unused slot at or after the last one
    /// handed out. It does not reserve the slot.
    pub fn next_free(&mut self) -> Result<InstanceNo, LogError> {
        loop {
            let idx = self.index(self.crt)?;
            match self.slots.get(idx) {
                Some(Some(_)) => self.crt += 1,
                _ => return Ok(self.crt),
            }
        }
    }

    pub fn committed_up_to(&self) -> InstanceNo {
        self.committed_up_to.load(Ordering::Acquire)
    }

    pub fn committed_up_to_handle(&self) -> Arc<AtomicI32> {
        self.committed_up_to.clone()
    }

    /// advance_committed extends the decided prefix as far as possible and
    /// returns the instances that just joined it.
    pub fn advance_committed(&mut self) -> Vec<InstanceNo> {
        let start = self.committed_up_to();
        let mut c = start;

        while let Some(inst) = self.get(c + 1) {
            if !inst.is_decided() {
                break;
            }
            c += 1;
        }

        if c > start {
            self.committed_up_to.store(c, Ordering::Release);
        }

        (start + 1..=c).collect()
    }
}
