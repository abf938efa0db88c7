use tokio::sync::mpsc::error::SendError;

use hpaxos::transport::Propose;
use parse::ParseError;

quick_error! {
    #[derive(Debug, PartialEq)]
    pub enum RedisApiError {
        BadRequest(msg: String) {
            from(err: ParseError) -> (format!("{}", err))
            display("{}", msg)
        }

        WrongArgs(cmd: String) {
            display("wrong number of arguments for '{}' command", cmd)
        }

        NotInteger {
            display("value is not an integer or out of range")
        }

        UnknownCommand(cmd: String) {
            display("unknown command '{}'", cmd)
        }

        /// The replica stopped before answering.
        ReplicaGone {
            from(SendError<Propose>)
            display("replica is not serving")
        }

        Rejected(command_id: i32) {
            display("command {} is not accepted", command_id)
        }
    }
}
