#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate slog_global;

pub mod net;
pub mod peer;
pub mod redisapi;
pub mod server;
pub mod setup;

pub use redisapi::*;
pub use server::*;
