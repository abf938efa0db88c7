use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::ConfError;
use crate::proto::{ReplicaId, MAX_REPLICAS};
use crate::replica::ReplicaConf;

/// Node is where a replica serves: `replication` for peers and `api_addr`
/// for clients.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Node {
    pub api_addr: SocketAddr,
    pub replication: SocketAddr,
}

/// ClusterInfo is the cluster config shared by every replica, e.g.:
///
/// ```yaml
/// replicas:
///     0: { api_addr: 127.0.0.1:6379, replication: 127.0.0.1:7070 }
///     1: { api_addr: 127.0.0.1:6380, replication: 127.0.0.1:7071 }
///     2: { api_addr: 127.0.0.1:6381, replication: 127.0.0.1:7072 }
/// leader: 0
/// replica:
///     exec: true
///     dreply: true
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClusterInfo {
    pub replicas: BTreeMap<ReplicaId, Node>,

    /// The replica marked as leader at startup. Advisory only.
    #[serde(default)]
    pub leader: Option<ReplicaId>,

    #[serde(default)]
    pub replica: ReplicaConf,
}

// let user to use c.get() just like c.replicas.get()
impl Deref for ClusterInfo {
    type Target = BTreeMap<ReplicaId, Node>;
    fn deref(&self) -> &Self::Target {
        &self.replicas
    }
}

impl ClusterInfo {
    /// from_file read cluster conf yaml from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClusterInfo, ConfError> {
        let content = fs::read_to_string(path)?;
        ClusterInfo::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<ClusterInfo, ConfError> {
        let cluster: ClusterInfo = serde_yaml::from_str(content)?;
        cluster.check_replicas()?;
        Ok(cluster)
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    pub fn get_replica_node(&self, rid: ReplicaId) -> Option<&Node> {
        self.replicas.get(&rid)
    }

    /// check_replicas checks the replica ids are 0, 1, .. n-1 and fit in a ballot.
    pub fn check_replicas(&self) -> Result<(), ConfError> {
        let n = self.replicas.len();
        if n == 0 {
            return Err(ConfError::NoReplica);
        }
        if n > MAX_REPLICAS {
            return Err(ConfError::TooManyReplicas(n, MAX_REPLICAS));
        }

        for (want, rid) in self.replicas.keys().enumerate() {
            if *rid != want as ReplicaId {
                return Err(ConfError::BadReplicaId(*rid, want as ReplicaId));
            }
        }

        if let Some(l) = self.leader {
            if !self.replicas.contains_key(&l) {
                return Err(ConfError::UnknownReplica(l));
            }
        }
        Ok(())
    }
}
