#[cfg(test)]
use pretty_assertions::assert_eq;

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use hpaxos::proto::{Command, OpCode};
use hpaxos::transport::Propose;
use parse::{Request, Response};

use super::*;
use crate::net::listen;

/// fake_replica answers every proposal without replicating it: a read
/// returns 7, a write returns the written value, an rmw returns key + delta.
/// Proposals on key 666 are rejected.
fn fake_replica() -> (RedisApi, mpsc::Receiver<Command>) {
    let (tx, mut rx) = mpsc::channel::<Propose>(16);
    let (seen_tx, seen_rx) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut seen_tx = seen_tx;
        while let Some(p) = rx.recv().await {
            let c = p.command;
            let _ = seen_tx.send(c).await;

            let v = match c.op {
                OpCode::Get => 7,
                OpCode::Put => c.value,
                _ => c.key + c.value,
            };
            let _ = p.respond(c.key != 666, v);
        }
    });

    (RedisApi::new(tx), seen_rx)
}

fn req(args: &[&str]) -> Request {
    Request {
        args: args.iter().map(|a| a.as_bytes().to_vec()).collect(),
    }
}

#[test]
fn test_exec_request() {
    _test_exec_request();
}

#[tokio::main]
async fn _test_exec_request() {
    let (mut api, mut seen) = fake_replica();

    let status = |s: &str| Response::Status(s.to_owned());
    let err = |s: &str| Response::Error(s.to_owned());

    // (request, response, command the replica sees)
    let cases = vec![
        (vec!["PING"], status("PONG"), None),
        (vec!["set", "1", "5"], status("OK"), Some(Command::put(1, 5))),
        (vec!["GET", "1"], Response::Integer(7), Some(Command::get(1))),
        (vec!["incrby", "3", "4"], Response::Integer(7), Some(Command::rmw(3, 4))),
        (vec!["INCR", "3"], Response::Integer(4), Some(Command::rmw(3, 1))),
        (
            vec!["SET", "1"],
            err("ERR wrong number of arguments for 'set' command"),
            None,
        ),
        (
            vec!["GET", "1", "2"],
            err("ERR wrong number of arguments for 'get' command"),
            None,
        ),
        (
            vec!["SET", "foo", "1"],
            err("ERR value is not an integer or out of range"),
            None,
        ),
        (vec!["DEL", "1"], err("ERR unknown command 'DEL'"), None),
        (
            vec!["SET", "666", "1"],
            err("ERR command 4 is not accepted"),
            Some(Command::put(666, 1)),
        ),
    ];

    for (args, want, want_cmd) in cases {
        let got = api.exec_request(&req(&args)).await;
        assert_eq!(want, got, "{:?}", args);

        if let Some(c) = want_cmd {
            assert_eq!(Some(c), seen.recv().await, "{:?}", args);
        }
    }
}

#[test]
fn test_replica_gone() {
    _test_replica_gone();
}

#[tokio::main]
async fn _test_replica_gone() {
    let (tx, rx) = mpsc::channel::<Propose>(1);
    drop(rx);

    let mut api = RedisApi::new(tx);
    let got = api.exec_request(&req(&["GET", "1"])).await;
    assert_eq!(Response::Error("ERR replica is not serving".to_owned()), got);
}

async fn read_exactly(sock: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0; n];
    timeout(Duration::from_secs(5), sock.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    buf
}

#[test]
fn test_serve() {
    _test_serve();
}

#[tokio::main]
async fn _test_serve() {
    let (api, _seen) = fake_replica();

    let lis = listen("127.0.0.1:0".parse().unwrap(), 16).unwrap();
    let addr = lis.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let j = tokio::spawn(api.serve_with_shutdown(lis, stop_rx));

    let mut sock = TcpStream::connect(addr).await.unwrap();

    // two pipelined requests, the second split across writes.
    sock.write_all(b"*3\r\n$3\r\nSET\r\n$1\r\n1\r\n$2\r\n42\r\n*2\r\n$3\r\nGET")
        .await
        .unwrap();
    assert_eq!(b"+OK\r\n".to_vec(), read_exactly(&mut sock, 5).await);

    sock.write_all(b"\r\n$1\r\n1\r\n").await.unwrap();
    assert_eq!(b":7\r\n".to_vec(), read_exactly(&mut sock, 4).await);

    // inline form
    sock.write_all(b"INCRBY 2 3\r\n").await.unwrap();
    assert_eq!(b":5\r\n".to_vec(), read_exactly(&mut sock, 4).await);

    // a malformed request closes the connection.
    sock.write_all(b"*1\r\n#3\r\n").await.unwrap();
    let mut rest = vec![];
    timeout(Duration::from_secs(5), sock.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert!(rest.starts_with(b"-ERR "), "{:?}", rest);

    stop_tx.send(()).unwrap();
    j.await.unwrap().unwrap();
}
