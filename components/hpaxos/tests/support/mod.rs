#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{delay_for, timeout, Instant};

use hpaxos::proto::*;
use hpaxos::replica::*;
use hpaxos::transport::*;

/// LocalCluster runs `n` replicas in the current tokio runtime, connected by
/// a local mesh.
pub struct LocalCluster {
    pub handles: Vec<ReplicaHandle>,
    pub links: LinkControl,
    next_command_id: i32,
}

impl LocalCluster {
    /// start spawns every replica. Must be called inside a tokio runtime.
    pub fn start(n: usize, conf: ReplicaConf) -> LocalCluster {
        let (transports, inboxes, links) = local_mesh(n, conf.chan_size.max(1));

        let handles = transports
            .into_iter()
            .zip(inboxes.into_iter())
            .map(|(t, rx)| {
                let r = Replica::new(conf.clone(), Box::new(t), Wal::disabled());
                spawn_replica(r, rx)
            })
            .collect();

        LocalCluster {
            handles,
            links,
            next_command_id: 0,
        }
    }

    /// submit sends `cmd` to replica `rid` without waiting for the reply.
    pub async fn submit(
        &mut self,
        rid: ReplicaId,
        cmd: Command,
    ) -> Option<UnboundedReceiver<ProposeReply>> {
        self.next_command_id += 1;
        let id = self.next_command_id;

        let (h, rx) = ReplyHandle::new();
        let p = Propose::new(id, cmd, id as i64, h);

        let handle = self.handles.get_mut(rid as usize)?;
        handle.proposals.send(p).await.ok()?;
        Some(rx)
    }

    /// propose sends `cmd` to replica `rid` and waits for the reply, or gives
    /// up after `wait`.
    pub async fn propose_within(
        &mut self,
        rid: ReplicaId,
        cmd: Command,
        wait: Duration,
    ) -> Option<ProposeReply> {
        let mut rx = self.submit(rid, cmd).await?;
        timeout(wait, rx.recv()).await.ok()?
    }

    pub async fn propose(&mut self, rid: ReplicaId, cmd: Command) -> Option<ProposeReply> {
        self.propose_within(rid, cmd, Duration::from_secs(5)).await
    }

    /// wait_committed waits until replica `rid` has decided every instance
    /// up to `i`.
    pub async fn wait_committed(&self, rid: ReplicaId, i: InstanceNo) -> bool {
        self.wait_until(|| self.handles[rid as usize].committed_up_to() >= i)
            .await
    }

    pub async fn wait_executed(&self, rid: ReplicaId, i: InstanceNo) -> bool {
        self.wait_until(|| self.handles[rid as usize].executed_up_to() >= i)
            .await
    }

    /// applied returns the commands replica `rid` executed, in log order.
    pub fn applied(&self, rid: ReplicaId) -> Vec<Command> {
        self.handles[rid as usize].applied()
    }

    async fn wait_until<F: Fn() -> bool>(&self, f: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            delay_for(Duration::from_millis(2)).await;
        }
        f()
    }

    /// stop shuts every replica down and returns how each loop ended.
    pub async fn stop(&mut self) -> Vec<Result<(), ReplicaError>> {
        let mut res = vec![];
        for h in self.handles.iter_mut() {
            h.stop();
            res.push(h.join().await);
        }
        res
    }
}
