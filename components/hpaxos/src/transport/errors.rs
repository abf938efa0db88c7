use crate::proto::ReplicaId;

quick_error! {
    #[derive(Debug, Eq, PartialEq)]
    pub enum TransportError {
        NoSuchPeer(rid: ReplicaId) {
            display("no such peer: {}", rid)
        }
        Dead(rid: ReplicaId) {
            display("peer {} is not alive", rid)
        }
        /// The send queue of a peer is full. The message is dropped.
        Full(rid: ReplicaId) {
            display("send queue to peer {} is full", rid)
        }
        Closed(rid: ReplicaId) {
            display("link to peer {} is closed", rid)
        }
        /// The client that sent a request went away before the reply.
        ClientGone(command_id: i32) {
            display("client of command {} is gone", command_id)
        }
    }
}
