use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;

/// listen binds `addr` with SO_REUSEADDR set, so that a restarted server can
/// take its port back at once. Must be called inside a tokio runtime.
pub fn listen(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let builder = match addr {
        SocketAddr::V4(_) => net2::TcpBuilder::new_v4()?,
        SocketAddr::V6(_) => net2::TcpBuilder::new_v6()?,
    };
    builder.reuse_address(true)?;
    let lis = builder.bind(addr)?.listen(backlog)?;

    TcpListener::from_std(lis)
}
