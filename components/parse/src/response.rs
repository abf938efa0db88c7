/// A command response to send to a client
#[derive(PartialEq, Debug)]
pub enum Response {
    /// No data
    Nil,
    /// A number
    Integer(i64),
    /// Binary data
    Data(Vec<u8>),
    /// A simple error string
    Error(String),
    /// A simple status string
    Status(String),
    /// An array of responses that may mix different types
    Array(Vec<Response>),
}

impl Response {
    /// write_to appends the redis-protocol encoding of the response to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Nil => buf.extend_from_slice(b"$-1\r\n"),
            Response::Data(d) => {
                buf.extend_from_slice(format!("${}\r\n", d.len()).as_bytes());
                buf.extend_from_slice(d);
                buf.extend_from_slice(b"\r\n");
            }
            Response::Integer(i) => buf.extend_from_slice(format!(":{}\r\n", i).as_bytes()),
            Response::Error(e) => {
                buf.push(b'-');
                buf.extend_from_slice(one_line(e).as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Response::Status(s) => {
                buf.push(b'+');
                buf.extend_from_slice(one_line(s).as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Response::Array(a) => {
                buf.extend_from_slice(format!("*{}\r\n", a.len()).as_bytes());
                for el in a.iter() {
                    el.write_to(buf);
                }
            }
        }
    }

    /// Serializes the response into an array of bytes using Redis protocol.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    /// Returns true if and only if the response is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Is the response a status
    pub fn is_status(&self) -> bool {
        matches!(self, Response::Status(_))
    }
}

// simple strings and errors must not contain a line break.
fn one_line(s: &str) -> String {
    s.replace(|c| c == '\r' || c == '\n', " ")
}
