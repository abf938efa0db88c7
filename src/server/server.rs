use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::sync::oneshot::{self, Sender};
use tokio::task::JoinHandle;

use hpaxos::conf::{ClusterInfo, Node};
use hpaxos::proto::{InstanceNo, ReplicaId};
use hpaxos::replica::{spawn_replica, Replica, ReplicaHandle, Wal};
use storage::FileStore;

use crate::net::listen;
use crate::peer::{serve_peers, PeerLinks, TcpTransport};
use crate::RedisApi;
use crate::ServerError;

pub const TCP_BACKLOG: i32 = 1024;

/// Server runs one replica of a cluster: the redis protocol api for clients,
/// the replication listener for peers and the replica loop in between.
pub struct Server {
    cluster: ClusterInfo,
    replica_id: ReplicaId,
    node: Node,

    replica: Option<ReplicaHandle>,
    links: Option<PeerLinks>,
    stop_txs: Vec<(&'static str, Sender<()>)>,
    join_handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Server {
    pub fn new(cluster: ClusterInfo, replica_id: ReplicaId) -> Result<Server, ServerError> {
        let node = cluster
            .get_replica_node(replica_id)
            .ok_or(ServerError::UnknownReplica(replica_id))?
            .clone();

        Ok(Server {
            cluster,
            replica_id,
            node,
            replica: None,
            links: None,
            stop_txs: Vec::new(),
            join_handles: Vec::new(),
        })
    }

    /// open_wal opens the stable store of this replica if the cluster is
    /// configured durable. Without `path` it is `qkv-<replica_id>.wal` in the
    /// working directory.
    pub fn open_wal(&self, path: Option<&Path>) -> Result<Wal, ServerError> {
        if !self.cluster.replica.durable {
            return Ok(Wal::disabled());
        }

        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(format!("qkv-{}.wal", self.replica_id)),
        };
        let store = FileStore::open(&path)?;
        info!("replica {} writes ahead to {}", self.replica_id, path.display());

        Ok(Wal::new(Box::new(store)))
    }

    /// start binds both listeners, then spawns the replica loop and the
    /// servers feeding it. Must be called inside a tokio runtime.
    pub fn start(&mut self, wal: Wal) -> Result<(), ServerError> {
        let conf = self.cluster.replica.clone();
        let me = self.replica_id;
        let n = self.cluster.replica_count();

        let api_lis = listen(self.node.api_addr, TCP_BACKLOG)?;
        let repl_lis = listen(self.node.replication, TCP_BACKLOG)?;

        let peers: BTreeMap<ReplicaId, SocketAddr> = self
            .cluster
            .iter()
            .map(|(rid, node)| (*rid, node.replication))
            .collect();
        let transport = TcpTransport::connect(me, &peers, &conf);
        self.links = Some(transport.links());

        let (inbox_tx, inbox_rx) = mpsc::channel(conf.chan_size.max(1));

        let mut replica = Replica::new(conf.clone(), Box::new(transport), wal);
        if self.cluster.leader == Some(me) {
            replica.be_the_leader();
        }
        let handle = spawn_replica(replica, inbox_rx);

        let (tx1, rx1) = oneshot::channel::<()>();
        let (tx2, rx2) = oneshot::channel::<()>();

        let api = RedisApi::new(handle.proposals.clone());
        let j1 = tokio::spawn(async move {
            if let Err(e) = api.serve_with_shutdown(api_lis, rx1).await {
                error!("redis api: {}", e);
            }
        });
        let j2 = tokio::spawn(serve_peers(repl_lis, n, conf.endian, inbox_tx, rx2));

        info!(
            "replica {} serving: api {} replication {}",
            me, self.node.api_addr, self.node.replication
        );

        self.replica = Some(handle);
        self.stop_txs.push(("api", tx1));
        self.stop_txs.push(("replication", tx2));
        self.join_handles.push(("api", j1));
        self.join_handles.push(("replication", j2));

        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ServerError> {
        if let Some(h) = self.replica.as_mut() {
            h.stop();
        }

        while let Some((name, tx)) = self.stop_txs.pop() {
            tx.send(()).or(Err(ServerError::RxClosed))?;
            info!("{} stop signal sent", name);
        }
        Ok(())
    }

    /// join waits for every task started by `start` to return.
    pub async fn join(&mut self) -> Result<(), ServerError> {
        let mut h = self.replica.take().ok_or(ServerError::NotStarted)?;

        while let Some((name, j)) = self.join_handles.pop() {
            j.await
                .map_err(|e| ServerError::Join(format!("{}: {}", name, e)))?;
        }

        h.join().await?;
        Ok(())
    }

    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// peer_alive tells if the replication link to `rid` is up.
    pub fn peer_alive(&self, rid: ReplicaId) -> bool {
        match &self.links {
            Some(l) => l.is_alive(rid),
            None => false,
        }
    }

    pub fn committed_up_to(&self) -> Option<InstanceNo> {
        self.replica.as_ref().map(|h| h.committed_up_to())
    }

    pub fn executed_up_to(&self) -> Option<InstanceNo> {
        self.replica.as_ref().map(|h| h.executed_up_to())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
