mod errors;
pub use errors::*;

mod quorums;
pub use quorums::*;

mod retry;
pub use retry::*;

mod durable;
pub use durable::*;

mod replica;
pub use replica::*;

mod abd;
mod paxos;

mod exec;
pub use exec::*;

mod run;
pub use run::*;

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod test_durable;
#[cfg(test)]
mod test_exec;
#[cfg(test)]
mod test_quorums;
#[cfg(test)]
mod test_retry;
