use super::*;
use crate::instance::*;
use crate::proto::*;
use crate::transport::Propose;

/// The register protocol: a Get phase collects the newest payload of a key
/// from a majority, a Set phase writes it, or a newer one, back to a
/// majority. The finished op is then recorded in the log, so that commands
/// executed in log order see it.
impl Replica {
    pub(crate) fn propose_register(
        &mut self,
        i: InstanceNo,
        p: Propose,
    ) -> Result<(), ReplicaError> {
        let cmd = p.command;

        self.log.set(i, Instance::register(vec![cmd]))?;
        self.persist(i, true)?;

        // the local register is the first vote of the Get phase
        let op = RegisterOp::new(p, self.register(cmd.key));
        self.register_ops.insert(i, op);

        debug!("replica {}: instance {}: register op {}", self.replica_id, i, cmd);

        let get = Get {
            replica_id: self.replica_id,
            instance: i,
            is_write: cmd.is_write(),
            key: cmd.key,
        };
        self.bcast(get.into());

        self.try_finish_get(i)
    }

    pub fn handle_get(&mut self, m: &Get) -> Result<(), ReplicaError> {
        let reply = GetReply {
            instance: m.instance,
            ok: true,
            is_write: m.is_write,
            payload: self.register(m.key),
        };
        self.send(m.replica_id, reply.into());
        Ok(())
    }

    pub fn handle_set(&mut self, m: &Set) -> Result<(), ReplicaError> {
        self.adopt_register(m.key, m.payload)?;

        let reply = SetReply {
            instance: m.instance,
            ok: true,
            is_write: m.is_write,
            payload: self.register(m.key),
        };
        self.send(m.replica_id, reply.into());
        Ok(())
    }

    /// adopt_register stores `p` for `key` if it is newer than what is held.
    pub(crate) fn adopt_register(&mut self, key: i64, p: Payload) -> Result<bool, ReplicaError> {
        if !p.newer_than(&self.register(key)) {
            return Ok(false);
        }
        self.wal.record_payload(key, &p)?;
        self.wal.sync()?;
        self.registers.insert(key, p);
        Ok(true)
    }

    pub fn handle_get_reply(&mut self, from: ReplicaId, m: &GetReply) -> Result<(), ReplicaError> {
        {
            let op = self
                .register_ops
                .get_mut(&m.instance)
                .ok_or(ReplicaError::NotProposer(m.instance))?;
            if op.phase != RegisterPhase::Get {
                return Err(ReplicaError::DelayedRegisterReply(m.instance, op.phase));
            }
            if !op.get_replied.insert(from) {
                return Err(ReplicaError::Dup(from));
            }
            if m.ok {
                op.get_oks += 1;
            } else {
                op.nacks += 1;
            }

            if m.payload.newer_than(&op.payload) {
                op.payload = m.payload;
            }
        }

        self.try_finish_get(m.instance)
    }

    /// try_finish_get moves a register op to its Set phase once a majority
    /// answered the Get.
    fn try_finish_get(&mut self, i: InstanceNo) -> Result<(), ReplicaError> {
        let me = self.replica_id;
        let n = self.n;

        let (key, is_write, payload) = {
            let op = match self.register_ops.get_mut(&i) {
                Some(op) => op,
                None => return Ok(()),
            };
            if op.phase != RegisterPhase::Get || !quorum_reached(op.get_oks, n) {
                return Ok(());
            }

            op.nacks = 0;
            op.phase = RegisterPhase::Set;

            // a read writes back what it found, unchanged
            if op.is_write() {
                op.payload = Payload {
                    tag: Tag {
                        timestamp: op.payload.tag.timestamp + 1,
                        proposer_id: me as i64,
                    },
                    value: op.proposal.command.value,
                };
            }
            (op.key(), op.is_write(), op.payload)
        };

        // the local register is the first vote of the Set phase
        self.adopt_register(key, payload)?;

        debug!("replica {}: instance {}: set key {} to {}", me, i, key, payload);

        let set = Set {
            replica_id: me,
            instance: i,
            is_write,
            payload,
            key,
        };
        self.bcast(set.into());

        self.try_finish_set(i)
    }

    pub fn handle_set_reply(&mut self, from: ReplicaId, m: &SetReply) -> Result<(), ReplicaError> {
        {
            let op = self
                .register_ops
                .get_mut(&m.instance)
                .ok_or(ReplicaError::NotProposer(m.instance))?;
            if op.phase != RegisterPhase::Set {
                return Err(ReplicaError::DelayedRegisterReply(m.instance, op.phase));
            }
            if !op.set_replied.insert(from) {
                return Err(ReplicaError::Dup(from));
            }
            if m.ok {
                op.set_oks += 1;
            } else {
                op.nacks += 1;
            }
        }

        self.try_finish_set(m.instance)
    }

    /// try_finish_set records a register op in the log once a majority stored
    /// its payload. The client is answered when the record commits.
    fn try_finish_set(&mut self, i: InstanceNo) -> Result<(), ReplicaError> {
        let done = match self.register_ops.get(&i) {
            Some(op) => op.phase == RegisterPhase::Set && quorum_reached(op.set_oks, self.n),
            None => false,
        };
        if !done {
            return Ok(());
        }
        let op = match self.register_ops.remove(&i) {
            Some(op) => op,
            None => return Ok(()),
        };

        let record = op.record_command();
        let mut p = op.proposal;
        p.command = record;
        p.registered = true;

        let slot_held = match self.log.get(i) {
            Some(inst) => inst.kind == InstanceKind::Register,
            None => false,
        };

        if slot_held {
            if let Some(inst) = self.log.get_mut(i) {
                inst.kind = InstanceKind::Log;
                inst.cmds = Some(vec![record]);
                inst.lb = Some(LeaderBookkeeping::new(vec![p]));
            }
            debug!("replica {}: instance {}: log register op {}", self.replica_id, i, record);
            return self.start_paxos(i, false);
        }

        info!(
            "replica {}: instance {} was taken, log register op {} elsewhere",
            self.replica_id, i, record
        );
        self.handle_propose(p)
    }

    /// release_register_slot hands the slot of a local register op to a
    /// paxos proposal that landed on it. An op still in its Get phase is
    /// given up and its client returned; an op in its Set phase goes on.
    pub(crate) fn release_register_slot(&mut self, i: InstanceNo) -> Vec<Propose> {
        let released = match self.log.get_mut(i) {
            Some(inst) => inst.to_log(),
            None => false,
        };
        if !released {
            return vec![];
        }

        let in_get = match self.register_ops.get(&i) {
            Some(op) => op.phase == RegisterPhase::Get,
            None => false,
        };
        if !in_get {
            return vec![];
        }
        match self.register_ops.remove(&i) {
            Some(op) => vec![op.proposal],
            None => vec![],
        }
    }
}
