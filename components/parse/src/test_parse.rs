use crate::*;

use pretty_assertions::assert_eq;

fn req(args: &[&str]) -> Request {
    Request {
        args: args.iter().map(|a| a.as_bytes().to_vec()).collect(),
    }
}

#[test]
fn test_parse_request_multi_bulk() {
    let buf = b"*3\r\n$3\r\nSET\r\n$1\r\n5\r\n$2\r\n10\r\n";
    let (r, n) = parse_request(buf).unwrap().unwrap();
    assert_eq!(req(&["SET", "5", "10"]), r);
    assert_eq!(buf.len(), n);
    assert_eq!("SET", r.name());
    assert_eq!(Some(5), r.arg_i64(1));
    assert_eq!(Some(10), r.arg_i64(2));
    assert_eq!(None, r.arg_i64(3));
}

#[test]
fn test_parse_request_partial() {
    let full = b"*2\r\n$3\r\nget\r\n$2\r\nab\r\n";

    for i in 0..full.len() {
        assert_eq!(None, parse_request(&full[..i]).unwrap(), "prefix len: {}", i);
    }

    // two pipelined requests
    let mut buf = full.to_vec();
    buf.extend_from_slice(b"PING\r\n");

    let (r, n) = parse_request(&buf).unwrap().unwrap();
    assert_eq!("GET", r.name());
    assert_eq!(full.len(), n);

    let (r, n) = parse_request(&buf[n..]).unwrap().unwrap();
    assert_eq!(req(&["PING"]), r);
    assert_eq!(6, n);
}

#[test]
fn test_parse_request_inline() {
    let (r, n) = parse_request(b"incrby  3 4\r\nxx").unwrap().unwrap();
    assert_eq!(req(&["incrby", "3", "4"]), r);
    assert_eq!(13, n);
    assert_eq!(Some(3), r.arg_i64(1));
}

#[test]
fn test_parse_request_bad() {
    let cases: Vec<(&[u8], ParseError)> = vec![
        (
            b"*x\r\n",
            ParseError::BadProtocol("length \"x\": invalid digit found in string".into()),
        ),
        (
            b"*1\r\n:3\r\n",
            ParseError::BadProtocol("expect '$' but got: ':'".into()),
        ),
        (
            b"*1\r\n$-1\r\n",
            ParseError::BadProtocol("negative bulk len: -1".into()),
        ),
        (
            b"*1\r\n$1\r\nabc\r\n",
            ParseError::BadProtocol("bulk string not ended with CRLF".into()),
        ),
    ];

    for (buf, want) in cases.into_iter() {
        assert_eq!(want, parse_request(buf).unwrap_err(), "buf: {:?}", buf);
    }
}

#[test]
fn test_response_to_vec() {
    let cases = vec![
        (Response::Nil, "$-1\r\n"),
        (Response::Integer(-3), ":-3\r\n"),
        (Response::Data(b"ab".to_vec()), "$2\r\nab\r\n"),
        (Response::Status("OK".into()), "+OK\r\n"),
        (Response::Error("ERR a\nb".into()), "-ERR a b\r\n"),
        (
            Response::Array(vec![Response::Integer(1), Response::Nil]),
            "*2\r\n:1\r\n$-1\r\n",
        ),
    ];

    for (resp, want) in cases.iter() {
        assert_eq!(want.as_bytes().to_vec(), resp.to_vec(), "resp: {:?}", resp);
    }

    assert!(Response::Error("x".into()).is_error());
    assert!(!Response::Nil.is_error());
    assert!(Response::Status("OK".into()).is_status());
}
