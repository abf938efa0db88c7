use crate::proto::ReplicaId;

quick_error! {
    #[derive(Debug)]
    pub enum ConfError {
        IOError(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
        }

        BadYaml(e: serde_yaml::Error) {
            from(e: serde_yaml::Error) -> (e)
        }

        NoReplica {
            display("no replica configured")
        }

        /// Replica ids occupy the low bits of a ballot.
        TooManyReplicas(n: usize, max: usize) {
            display("{} replicas configured, at most {} supported", n, max)
        }

        /// Replica ids must be 0, 1, .. n-1.
        BadReplicaId(rid: ReplicaId, want: ReplicaId) {
            display("replica id {} found where {} is expected", rid, want)
        }

        UnknownReplica(rid: ReplicaId) {
            display("replica {} is not in the cluster", rid)
        }
    }
}

impl PartialEq<ConfError> for ConfError {
    fn eq(&self, other: &ConfError) -> bool {
        match (self, other) {
            (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
            (Self::BadYaml(_), Self::BadYaml(_)) => true,
            (Self::NoReplica, Self::NoReplica) => true,
            (Self::TooManyReplicas(a, b), Self::TooManyReplicas(x, y)) => a == x && b == y,
            (Self::BadReplicaId(a, b), Self::BadReplicaId(x, y)) => a == x && b == y,
            (Self::UnknownReplica(a), Self::UnknownReplica(b)) => a == b,
            _ => false,
        }
    }
}
