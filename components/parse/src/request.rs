use std::str::from_utf8;

quick_error! {
    /// ParseError is returned when a client sends bytes that are not a valid
    /// redis-protocol request.
    #[derive(Debug, Eq, PartialEq)]
    pub enum ParseError {
        BadProtocol(msg: String) {
            display("bad redis protocol: {}", msg)
        }

        TooLarge(size: usize, limit: usize) {
            display("request too large: {} > {}", size, limit)
        }
    }
}

/// max size of a single bulk string.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Request is a parsed client command: a list of arguments, the first being
/// the command name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Request {
    pub args: Vec<Vec<u8>>,
}

impl Request {
    /// name returns the upper-cased command name, e.g. "SET".
    pub fn name(&self) -> String {
        match self.args.first() {
            Some(a) => String::from_utf8_lossy(a).to_uppercase(),
            None => String::new(),
        }
    }

    /// arg_i64 parses the i-th argument as a decimal i64.
    pub fn arg_i64(&self, i: usize) -> Option<i64> {
        let a = self.args.get(i)?;
        from_utf8(a).ok()?.trim().parse().ok()
    }
}

/// parse_request parses one request from the head of `buf`.
///
/// It returns `Ok(None)` if `buf` does not yet hold a complete request, or
/// the request and the number of bytes it occupies.
///
/// Both the multi-bulk form (`*2\r\n$3\r\nGET\r\n$1\r\na\r\n`) and the inline
/// form (`GET a\r\n`) are accepted.
pub fn parse_request(buf: &[u8]) -> Result<Option<(Request, usize)>, ParseError> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf[0] != b'*' {
        return parse_inline(buf);
    }

    let (n, mut pos) = match read_line_int(buf, 1)? {
        Some(v) => v,
        None => return Ok(None),
    };

    if n < 0 {
        return Err(ParseError::BadProtocol(format!("negative array len: {}", n)));
    }

    let mut args = Vec::with_capacity(n as usize);
    for _ in 0..n {
        if pos >= buf.len() {
            return Ok(None);
        }
        if buf[pos] != b'$' {
            return Err(ParseError::BadProtocol(format!(
                "expect '$' but got: {:?}",
                buf[pos] as char
            )));
        }

        let (len, p) = match read_line_int(buf, pos + 1)? {
            Some(v) => v,
            None => return Ok(None),
        };

        if len < 0 {
            return Err(ParseError::BadProtocol(format!("negative bulk len: {}", len)));
        }
        let len = len as usize;
        if len > MAX_BULK_LEN {
            return Err(ParseError::TooLarge(len, MAX_BULK_LEN));
        }

        if buf.len() < p + len + 2 {
            return Ok(None);
        }
        if &buf[p + len..p + len + 2] != b"\r\n" {
            return Err(ParseError::BadProtocol("bulk string not ended with CRLF".into()));
        }

        args.push(buf[p..p + len].to_vec());
        pos = p + len + 2;
    }

    Ok(Some((Request { args }, pos)))
}

fn parse_inline(buf: &[u8]) -> Result<Option<(Request, usize)>, ParseError> {
    let end = match find_crlf(buf, 0) {
        Some(e) => e,
        None => return Ok(None),
    };

    let line = from_utf8(&buf[..end])
        .map_err(|e| ParseError::BadProtocol(format!("inline command: {}", e)))?;

    let args = line
        .split_whitespace()
        .map(|s| s.as_bytes().to_vec())
        .collect();

    Ok(Some((Request { args }, end + 2)))
}

/// read a decimal integer terminated by CRLF, starting at `start`.
/// Returns the integer and the position right after CRLF.
fn read_line_int(buf: &[u8], start: usize) -> Result<Option<(i64, usize)>, ParseError> {
    let end = match find_crlf(buf, start) {
        Some(e) => e,
        None => return Ok(None),
    };

    let s = from_utf8(&buf[start..end])
        .map_err(|e| ParseError::BadProtocol(format!("length: {}", e)))?;
    let n = s
        .parse::<i64>()
        .map_err(|e| ParseError::BadProtocol(format!("length {:?}: {}", s, e)))?;

    Ok(Some((n, end + 2)))
}

fn find_crlf(buf: &[u8], start: usize) -> Option<usize> {
    if buf.len() < start + 2 {
        return None;
    }
    (start..buf.len() - 1).find(|&i| buf[i] == b'\r' && buf[i + 1] == b'\n')
}
