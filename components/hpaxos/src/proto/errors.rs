use std::io;

quick_error! {
    /// ProtocolError is a malformed or truncated peer message.
    #[derive(Debug, Eq, PartialEq)]
    pub enum ProtocolError {
        /// Not enough bytes buffered yet to decode `what`.
        Incomplete(what: &'static str) {
            display("incomplete message: need more bytes for {}", what)
        }
        UnknownType(t: u8) {
            display("unknown message type: {}", t)
        }
        UnknownOp(op: u8) {
            display("unknown command op: {}", op)
        }
        BadVarint {
            display("varint overflows 64 bits")
        }
        BadLength(n: i64) {
            display("invalid command count: {}", n)
        }
        IO(msg: String) {
            from(e: io::Error) -> (e.to_string())
            display("io error: {}", msg)
        }
    }
}
