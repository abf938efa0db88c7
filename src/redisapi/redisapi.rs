use std::io;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
// for boxed()
use futures::future::FutureExt;
use futures::Future;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::Sender;

use hpaxos::proto::Command;
use hpaxos::transport::{Propose, ReplyHandle};
use parse::{parse_request, Request, Response};

use super::RedisApiError;

const READ_CHUNK: usize = 4096;

/// RedisApi serves clients in the redis protocol and turns every command into
/// a proposal to the local replica.
///
/// A connection has at most one request in flight: the next one is read after
/// the reply is written.
#[derive(Clone)]
pub struct RedisApi {
    proposals: Sender<Propose>,
    next_command_id: Arc<AtomicI32>,
}

impl RedisApi {
    pub fn new(proposals: Sender<Propose>) -> Self {
        RedisApi {
            proposals,
            next_command_id: Arc::new(AtomicI32::new(0)),
        }
    }

    pub async fn serve_with_shutdown<F>(self, mut lis: TcpListener, signal: F) -> io::Result<()>
    where
        F: Future + Send,
    {
        // impl Unpin
        let mut sig = signal.boxed();

        info!("redis api listened: {}", lis.local_addr()?);
        loop {
            tokio::select! {
                _v = (&mut sig) => {
                    break;
                },
                inc = lis.accept() => {
                    let (sock, cli_addr) = inc?;
                    debug!("new connection from {}", cli_addr);
                    let slf = self.clone();
                    tokio::spawn(async move {
                        slf.handle_new_conn(sock).await;
                    });
                }
            }
        }

        info!("RedisApi stopped");
        Ok(())
    }

    async fn handle_new_conn(mut self, mut sock: TcpStream) {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);

        loop {
            loop {
                let (req, used) = match parse_request(&buf) {
                    Ok(Some(v)) => v,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("bad request: {}", e);
                        let r = Response::Error(format!("ERR {}", e));
                        let _ = sock.write_all(&r.to_vec()).await;
                        return;
                    }
                };
                buf.advance(used);

                let r = self.exec_request(&req).await;
                if let Err(e) = sock.write_all(&r.to_vec()).await {
                    warn!("write response: {}", e);
                    return;
                }
            }

            buf.reserve(READ_CHUNK);
            match sock.read_buf(&mut buf).await {
                Ok(0) => {
                    debug!("client closed");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("read request: {}", e);
                    return;
                }
            }
        }
    }

    /// exec_request runs one client command. Errors are returned to the
    /// client as redis error replies.
    pub async fn exec_request(&mut self, req: &Request) -> Response {
        match self.exec(req).await {
            Ok(r) => r,
            Err(e) => Response::Error(format!("ERR {}", e)),
        }
    }

    async fn exec(&mut self, req: &Request) -> Result<Response, RedisApiError> {
        let name = req.name();
        let argc = req.args.len();

        let (cmd, want) = match name.as_str() {
            "PING" => return Ok(Response::Status("PONG".to_owned())),
            "SET" => (Command::put(int_arg(req, 1)?, int_arg(req, 2)?), 3),
            "GET" => (Command::get(int_arg(req, 1)?), 2),
            "INCRBY" => (Command::rmw(int_arg(req, 1)?, int_arg(req, 2)?), 3),
            "INCR" => (Command::rmw(int_arg(req, 1)?, 1), 2),
            _ => return Err(RedisApiError::UnknownCommand(name.clone())),
        };

        if argc != want {
            return Err(RedisApiError::WrongArgs(name.to_lowercase()));
        }

        let v = self.propose(cmd).await?;

        let r = match name.as_str() {
            "SET" => Response::Status("OK".to_owned()),
            _ => Response::Integer(v),
        };
        Ok(r)
    }

    /// propose hands `cmd` to the replica and waits for the result.
    async fn propose(&mut self, cmd: Command) -> Result<i64, RedisApiError> {
        let id = self.next_command_id.fetch_add(1, Ordering::Relaxed);
        let (h, mut rx) = ReplyHandle::new();
        let ts = chrono::Utc::now().timestamp_nanos();

        debug!("propose command {}: {}", id, cmd);
        self.proposals.send(Propose::new(id, cmd, ts, h)).await?;

        let reply = rx.recv().await.ok_or(RedisApiError::ReplicaGone)?;
        if !reply.ok {
            return Err(RedisApiError::Rejected(id));
        }
        Ok(reply.value)
    }
}

fn int_arg(req: &Request, i: usize) -> Result<i64, RedisApiError> {
    if i >= req.args.len() {
        return Err(RedisApiError::WrongArgs(req.name().to_lowercase()));
    }
    req.arg_i64(i).ok_or(RedisApiError::NotInteger)
}
