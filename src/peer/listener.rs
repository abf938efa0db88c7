use std::net::SocketAddr;

use futures::future::FutureExt;
use futures::{Future, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::Sender;
use tokio_util::codec::FramedRead;

use hpaxos::proto::*;

use super::*;

/// serve_peers accepts replication links and forwards every message read
/// from them to `inbox`, until `signal` resolves.
pub async fn serve_peers<F>(
    mut lis: TcpListener,
    n: usize,
    endian: Endian,
    inbox: Sender<Envelope>,
    signal: F,
) where
    F: Future + Send,
{
    // impl Unpin
    let mut sig = signal.boxed();

    loop {
        tokio::select! {
            _v = (&mut sig) => {
                break;
            },
            inc = lis.accept() => {
                match inc {
                    Ok((sock, addr)) => {
                        tokio::spawn(read_link(sock, addr, n, endian, inbox.clone()));
                    }
                    Err(e) => warn!("accept replication link: {}", e),
                }
            }
        }
    }

    info!("replication listener stopped");
}

/// read_link reads the handshake, then frames, from one inbound link. A
/// frame that does not decode closes the link.
async fn read_link(
    mut sock: TcpStream,
    addr: SocketAddr,
    n: usize,
    endian: Endian,
    mut inbox: Sender<Envelope>,
) {
    let mut buf = [0u8; HANDSHAKE_SIZE];
    if let Err(e) = sock.read_exact(&mut buf).await {
        warn!("link from {}: no handshake: {}", addr, e);
        return;
    }

    let from = match decode_handshake(&buf, endian) {
        Some(rid) if rid >= 0 && (rid as usize) < n => rid,
        other => {
            warn!("link from {}: unknown replica {:?}", addr, other);
            return;
        }
    };

    info!("link from replica {} at {}", from, addr);

    let mut frames = FramedRead::new(sock, PeerCodec::new(endian));
    while let Some(res) = frames.next().await {
        match res {
            Ok(msg) => {
                if inbox.send(Envelope { from, msg }).await.is_err() {
                    debug!("replica inbox closed");
                    return;
                }
            }
            Err(e) => {
                warn!("link from replica {}: {}; close link", from, e);
                return;
            }
        }
    }

    info!("link from replica {} closed", from);
}
