use std::time::Instant;

use super::*;
use crate::instance::*;
use crate::proto::*;
use crate::transport::Propose;

impl Replica {
    pub(crate) fn propose_log(&mut self, i: InstanceNo, p: Propose) -> Result<(), ReplicaError> {
        let inst = Instance::proposal(vec![p.command], vec![p]);
        self.log.set(i, inst)?;
        self.start_paxos(i, true)
    }

    /// start_paxos drives instance `i`, which must hold a value and a
    /// bookkeeping: straight to Accept with the default ballot if this
    /// replica owns it, otherwise through Prepare with a fresh ballot.
    pub(crate) fn start_paxos(
        &mut self,
        i: InstanceNo,
        to_infinity: bool,
    ) -> Result<(), ReplicaError> {
        let me = self.replica_id;

        if let Some(b) = self.fast_ballot() {
            let cmds = {
                let inst = self.log.get_mut(i).ok_or(ReplicaError::NotProposer(i))?;
                inst.ballot = b;
                inst.accepted_ballot = b;
                inst.advance(InstanceStatus::Accepted);
                if let Some(lb) = inst.lb.as_mut() {
                    lb.start_round(b, Phase::Accept);
                }
                inst.cmds.clone().unwrap_or_default()
            };
            self.persist(i, true)?;

            debug!("replica {}: instance {}: accept at default ballot {}", me, i, b);

            let accept = Accept {
                leader_id: me,
                instance: i,
                ballot: b,
                cmds,
            };
            self.bcast(accept.into());
            return self.try_finish_accept(i);
        }

        self.prepare_instance(i, to_infinity)
    }

    /// prepare_instance runs the Prepare phase of instance `i` with a fresh
    /// ballot. The status is left as is: a recovered instance may already
    /// hold an accepted value.
    fn prepare_instance(&mut self, i: InstanceNo, to_infinity: bool) -> Result<(), ReplicaError> {
        let me = self.replica_id;
        let b = self.fresh_ballot();
        {
            let inst = self.log.get_mut(i).ok_or(ReplicaError::NotProposer(i))?;
            inst.ballot = b;
            let lb = inst.lb.as_mut().ok_or(ReplicaError::NotProposer(i))?;
            lb.start_round(b, Phase::Prepare);
            lb.to_infinity = to_infinity;
        }
        self.persist(i, false)?;

        debug!("replica {}: instance {}: prepare at ballot {}", me, i, b);

        let prepare = Prepare {
            leader_id: me,
            instance: i,
            ballot: b,
            to_infinity,
        };
        self.bcast(prepare.into());
        self.try_finish_prepare(i)
    }

    /// promised returns the ballot instance `i` is promised to. An instance
    /// paxos has not touched yet is covered by the default ballot.
    fn promised(&self, i: InstanceNo) -> Ballot {
        match self.log.get(i) {
            Some(inst) if inst.kind == InstanceKind::Log => inst.ballot,
            _ => self.default_ballot,
        }
    }

    /// decision returns the commit of instance `i` if it is decided here.
    fn decision(&self, i: InstanceNo) -> Option<PeerMsg> {
        let inst = self.log.get(i)?;
        if !inst.is_decided() {
            return None;
        }
        let commit = Commit {
            leader_id: self.replica_id,
            instance: i,
            ballot: inst.ballot,
            cmds: inst.cmds.clone().unwrap_or_default(),
        };
        Some(commit.into())
    }

    pub fn handle_prepare(&mut self, m: &Prepare) -> Result<(), ReplicaError> {
        self.note_ballot(m.ballot);

        let i = m.instance;
        let promised = self.promised(i);

        let mut requeued = vec![];
        let mut changed = false;
        let mut outrun = false;

        let reply: PeerMsg = if let Some(commit) = self.decision(i) {
            // a decided instance answers with its decision
            commit
        } else if m.ballot < promised {
            PrepareReply {
                instance: i,
                ok: false,
                ballot: promised,
                cmds: vec![],
                prepare_ballot: m.ballot,
            }
            .into()
        } else {
            requeued = self.release_register_slot(i);

            match self.log.get_mut(i) {
                Some(inst) => {
                    if m.ballot > inst.ballot && !inst.is_committed() {
                        outrun = inst.driving().is_some();
                        inst.ballot = m.ballot;
                        changed = true;
                    }
                }
                None => {
                    let inst = Instance::passive(None, m.ballot, InstanceStatus::Preparing);
                    self.log.set(i, inst)?;
                    changed = true;
                }
            }

            let inst = self.log.get(i).ok_or(ReplicaError::NotProposer(i))?;
            let cmds = if inst.accepted_ballot == NO_BALLOT {
                vec![]
            } else {
                inst.cmds.clone().unwrap_or_default()
            };
            PrepareReply {
                instance: i,
                ok: true,
                ballot: inst.accepted_ballot,
                cmds,
                prepare_ballot: m.ballot,
            }
            .into()
        };

        if changed {
            self.persist(i, false)?;
        }
        self.send(m.leader_id, reply);
        self.requeue(requeued);

        if m.to_infinity && m.ballot > self.default_ballot {
            info!(
                "replica {}: default ballot {} -> {} from replica {}",
                self.replica_id, self.default_ballot, m.ballot, m.leader_id
            );
            self.default_ballot = m.ballot;
        }

        if outrun {
            return self.on_contention(i, m.ballot);
        }
        Ok(())
    }

    pub fn handle_prepare_reply(
        &mut self,
        from: ReplicaId,
        m: &PrepareReply,
    ) -> Result<(), ReplicaError> {
        self.note_ballot(m.ballot);
        let n = self.n;

        let (requeued, lost) = {
            let inst = proposing(&mut self.log, m.instance)?;
            let status = inst.status;
            let lb = inst.lb.as_mut().ok_or(ReplicaError::NotProposer(m.instance))?;
            if lb.phase != Phase::Prepare {
                return Err(ReplicaError::DelayedReply(m.instance, status));
            }
            if m.prepare_ballot != lb.ballot {
                return Err(ReplicaError::StaleBallot(m.prepare_ballot, lb.ballot));
            }
            if !lb.prepare_replied.insert(from) {
                return Err(ReplicaError::Dup(from));
            }
            lb.observe(m.ballot);

            if m.ok {
                lb.prepare_oks += 1;

                // the value accepted at the highest ballot must be proposed
                let adopt = !m.cmds.is_empty() && m.ballot > lb.value_ballot;
                if adopt {
                    lb.value_ballot = m.ballot;
                    (inst.supersede(m.cmds.clone()), false)
                } else {
                    (vec![], false)
                }
            } else {
                lb.nacks += 1;
                (vec![], quorum_lost(lb.nacks, n))
            }
        };

        if !requeued.is_empty() {
            info!(
                "replica {}: instance {}: adopt value of ballot {}, requeue {} requests",
                self.replica_id,
                m.instance,
                m.ballot,
                requeued.len()
            );
            self.requeue(requeued);
        }

        if lost {
            return self.on_contention(m.instance, m.ballot);
        }
        self.try_finish_prepare(m.instance)
    }

    /// try_finish_prepare moves a prepared instance to its Accept phase. The
    /// instance is given up if a higher ballot was promised meanwhile.
    fn try_finish_prepare(&mut self, i: InstanceNo) -> Result<(), ReplicaError> {
        let me = self.replica_id;
        let n = self.n;

        let prepared = {
            let inst = match self.log.get_mut(i) {
                Some(inst) if inst.kind == InstanceKind::Log && !inst.is_committed() => inst,
                _ => return Ok(()),
            };
            let promised = inst.ballot;
            let lb = match inst.lb.as_mut() {
                Some(lb) if !lb.abandoned && lb.phase == Phase::Prepare => lb,
                _ => return Ok(()),
            };
            if !quorum_reached(lb.prepare_oks, n) {
                return Ok(());
            }

            if promised != lb.ballot {
                Err(promised)
            } else {
                lb.nacks = 0;
                lb.phase = Phase::Accept;
                let to_infinity = lb.to_infinity;
                inst.advance(InstanceStatus::Prepared);
                Ok((promised, to_infinity))
            }
        };

        let (ballot, to_infinity) = match prepared {
            Ok(p) => p,
            Err(higher) => return self.on_contention(i, higher),
        };
        self.persist(i, false)?;

        debug!("replica {}: instance {}: prepared at ballot {}", me, i, ballot);

        if to_infinity && ballot > self.default_ballot {
            info!("replica {}: owns default ballot {}", me, ballot);
            self.default_ballot = ballot;
        }

        // the proposer is the first to accept its value
        let cmds = {
            let inst = self.log.get_mut(i).ok_or(ReplicaError::NotProposer(i))?;
            inst.accepted_ballot = ballot;
            inst.advance(InstanceStatus::Accepted);
            inst.cmds.clone().unwrap_or_default()
        };
        self.persist(i, true)?;

        let accept = Accept {
            leader_id: me,
            instance: i,
            ballot,
            cmds,
        };
        self.bcast(accept.into());
        self.try_finish_accept(i)
    }

    pub fn handle_accept(&mut self, m: &Accept) -> Result<(), ReplicaError> {
        self.note_ballot(m.ballot);

        let i = m.instance;

        if let Some(commit) = self.decision(i) {
            self.send(m.leader_id, commit);
            return Ok(());
        }

        let promised = self.promised(i);
        let mut requeued = vec![];
        let mut outrun = false;
        let mut learned = false;

        let ok = m.ballot >= promised;
        if ok {
            requeued = self.release_register_slot(i);

            match self.log.get_mut(i) {
                Some(inst) => {
                    if inst.is_committed() {
                        // decided without its commands; a ballot at or above
                        // the decision carries the decided value
                        inst.cmds = Some(m.cmds.clone());
                        inst.accepted_ballot = m.ballot;
                        learned = true;
                    } else {
                        outrun = match inst.driving() {
                            Some(lb) => m.ballot > lb.ballot,
                            None => false,
                        };
                        requeued.extend(inst.supersede(m.cmds.clone()));
                        inst.ballot = m.ballot;
                        inst.accepted_ballot = m.ballot;
                        inst.advance(InstanceStatus::Accepted);
                    }
                }
                None => {
                    let cmds = Some(m.cmds.clone());
                    let inst = Instance::passive(cmds, m.ballot, InstanceStatus::Accepted);
                    self.log.set(i, inst)?;
                }
            }
            self.persist(i, true)?;
        }
        if learned {
            self.advance_committed();
        }

        let reply = AcceptReply {
            instance: i,
            ok,
            ballot: if ok { m.ballot } else { promised },
        };
        self.send(m.leader_id, reply.into());
        self.requeue(requeued);

        if outrun {
            return self.on_contention(i, m.ballot);
        }
        Ok(())
    }

    pub fn handle_accept_reply(
        &mut self,
        from: ReplicaId,
        m: &AcceptReply,
    ) -> Result<(), ReplicaError> {
        self.note_ballot(m.ballot);
        let n = self.n;

        let lost = {
            let inst = proposing(&mut self.log, m.instance)?;
            let status = inst.status;
            let lb = inst.lb.as_mut().ok_or(ReplicaError::NotProposer(m.instance))?;
            if lb.phase != Phase::Accept {
                return Err(ReplicaError::DelayedReply(m.instance, status));
            }
            // an ok names the ballot it accepted, a nack one above it
            let current = if m.ok {
                m.ballot == lb.ballot
            } else {
                m.ballot > lb.ballot
            };
            if !current {
                return Err(ReplicaError::StaleBallot(m.ballot, lb.ballot));
            }
            if !lb.accept_replied.insert(from) {
                return Err(ReplicaError::Dup(from));
            }
            lb.observe(m.ballot);

            if m.ok {
                lb.accept_oks += 1;
                lb.accepted_by.push(from);
                false
            } else {
                lb.nacks += 1;
                quorum_lost(lb.nacks, n)
            }
        };

        if lost {
            return self.on_contention(m.instance, m.ballot);
        }
        self.try_finish_accept(m.instance)
    }

    fn try_finish_accept(&mut self, i: InstanceNo) -> Result<(), ReplicaError> {
        let n = self.n;

        let (ballot, cmds, accepted_by) = {
            let inst = match self.log.get_mut(i) {
                Some(inst) if inst.kind == InstanceKind::Log && !inst.is_committed() => inst,
                _ => return Ok(()),
            };
            let promised = inst.ballot;
            let lb = match inst.lb.as_mut() {
                Some(lb) if !lb.abandoned && lb.phase == Phase::Accept && lb.ballot == promised => lb,
                _ => return Ok(()),
            };
            if !quorum_reached(lb.accept_oks, n) {
                return Ok(());
            }

            let accepted_by = lb.accepted_by.clone();
            inst.advance(InstanceStatus::Committed);
            (inst.ballot, inst.cmds.clone().unwrap_or_default(), accepted_by)
        };

        self.persist(i, false)?;

        debug!("replica {}: instance {}: committed at ballot {}", self.replica_id, i, ballot);

        self.reply_committed(i);
        self.advance_committed();
        self.bcast_commit(i, ballot, cmds, &accepted_by);
        Ok(())
    }

    /// bcast_commit sends the short form to peers that accepted the value and
    /// the full commands to everyone else.
    fn bcast_commit(
        &mut self,
        i: InstanceNo,
        ballot: Ballot,
        cmds: Vec<Command>,
        accepted_by: &[ReplicaId],
    ) {
        let me = self.replica_id;
        let count = cmds.len() as i32;

        for to in 0..self.n as ReplicaId {
            if to == me || !self.transport.alive(to) {
                continue;
            }

            let msg: PeerMsg = if accepted_by.contains(&to) {
                CommitShort {
                    leader_id: me,
                    instance: i,
                    count,
                    ballot,
                }
                .into()
            } else {
                Commit {
                    leader_id: me,
                    instance: i,
                    ballot,
                    cmds: cmds.clone(),
                }
                .into()
            };
            self.send(to, msg);
        }
    }

    pub fn handle_commit(&mut self, m: &Commit) -> Result<(), ReplicaError> {
        self.note_ballot(m.ballot);
        self.commit_instance(m.instance, m.ballot, Some(&m.cmds))
    }

    pub fn handle_commit_short(&mut self, m: &CommitShort) -> Result<(), ReplicaError> {
        self.note_ballot(m.ballot);
        self.commit_instance(m.instance, m.ballot, None)
    }

    /// commit_instance learns that instance `i` is decided at `ballot`. A
    /// short commit carries no commands: the value accepted at that ballot, or
    /// later, is the decided one.
    fn commit_instance(
        &mut self,
        i: InstanceNo,
        ballot: Ballot,
        cmds: Option<&Vec<Command>>,
    ) -> Result<(), ReplicaError> {
        let mut requeued = vec![];

        let decided = match self.log.get(i) {
            Some(inst) => inst.is_decided(),
            None => false,
        };
        if decided {
            if let (Some(c), Some(inst)) = (cmds, self.log.get(i)) {
                if inst.cmds.as_ref() != Some(c) {
                    warn!("instance {}: conflicting commit at ballot {} ignored", i, ballot);
                }
            }
            return Ok(());
        }

        if self.log.get(i).is_none() {
            let inst = Instance::passive(cmds.cloned(), ballot, InstanceStatus::Committed);
            self.log.set(i, inst)?;
        } else {
            requeued.extend(self.release_register_slot(i));
            let inst = self.log.get_mut(i).ok_or(ReplicaError::NotProposer(i))?;

            match cmds {
                Some(c) => {
                    requeued.extend(inst.supersede(c.clone()));
                    inst.accepted_ballot = inst.accepted_ballot.max(ballot);
                }
                None => {
                    if inst.accepted_ballot < ballot {
                        // what is held here is older than the decision
                        if let Some(lb) = inst.lb.as_mut() {
                            requeued.extend(lb.take_pending());
                        }
                        inst.cmds = None;
                    }
                }
            }

            inst.advance(InstanceStatus::Committed);
            inst.ballot = inst.ballot.max(ballot);
        }

        self.persist(i, cmds.is_some())?;
        self.reply_committed(i);
        self.requeue(requeued);
        self.advance_committed();
        Ok(())
    }

    /// on_contention gives up driving instance `i` after a nack majority or
    /// a higher ballot `seen`. Clients of a value accepted here stay with the
    /// instance, which is driven again after a backoff; the others are
    /// retried after a backoff in a new instance.
    fn on_contention(&mut self, i: InstanceNo, seen: Ballot) -> Result<(), ReplicaError> {
        let (props, max_recv) = {
            let inst = self.log.get_mut(i).ok_or(ReplicaError::NotProposer(i))?;
            let accepted = inst.accepted_ballot != NO_BALLOT;
            let lb = inst.lb.as_mut().ok_or(ReplicaError::NotProposer(i))?;
            lb.observe(seen);
            lb.abandoned = true;
            let props = if accepted { vec![] } else { lb.take_pending() };
            (props, lb.max_recv_ballot)
        };

        self.note_ballot(max_recv);

        if max_recv > self.default_ballot {
            if self.fast_ballot().is_some() {
                info!(
                    "replica {}: default ballot {} superseded by {}",
                    self.replica_id, self.default_ballot, max_recv
                );
            }
            self.default_ballot = max_recv;
        }

        warn!(
            "replica {}: instance {}: outrun by ballot {}, retry {} requests",
            self.replica_id,
            i,
            max_recv,
            props.len()
        );
        self.requeue_backoff(props);

        let now = Instant::now();
        self.stalled.push((now + self.retries.backoff(1), i));
        Ok(())
    }

    /// recover_stalled drives again every abandoned instance whose backoff
    /// passed, unless it got decided meanwhile. The value accepted locally,
    /// if any, is proposed again with its clients, otherwise a no-op.
    pub(crate) fn recover_stalled(&mut self, now: Instant) -> Result<(), ReplicaError> {
        let mut due = vec![];
        self.stalled.retain(|(deadline, i)| {
            if *deadline <= now {
                due.push(*i);
                false
            } else {
                true
            }
        });

        for i in due {
            let pending = {
                let inst = match self.log.get_mut(i) {
                    Some(inst) => inst,
                    None => continue,
                };
                if inst.is_committed() || inst.kind != InstanceKind::Log {
                    continue;
                }
                let accepted = inst.cmds.is_some() && inst.accepted_ballot != NO_BALLOT;
                let accepted_ballot = inst.accepted_ballot;

                let lb = match inst.lb.as_mut() {
                    Some(lb) if lb.abandoned => lb,
                    _ => continue,
                };
                if accepted {
                    lb.value_ballot = accepted_ballot;
                    vec![]
                } else {
                    let pending = lb.take_pending();
                    lb.value_ballot = NO_BALLOT;
                    inst.cmds = Some(vec![Command::noop()]);
                    pending
                }
            };
            self.requeue(pending);

            info!("replica {}: instance {}: recover abandoned instance", self.replica_id, i);
            self.prepare_instance(i, false)?;
        }
        Ok(())
    }
}
