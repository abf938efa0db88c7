#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate slog_global;

#[macro_use]
pub mod macros;

pub mod conf;
pub mod instance;
pub mod proto;
pub mod replica;
pub mod transport;
