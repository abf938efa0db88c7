mod errors;
pub use errors::*;

mod instance;
pub use instance::*;

mod log;
pub use log::*;

#[cfg(test)]
mod test_log;
