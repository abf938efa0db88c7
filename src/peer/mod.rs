mod handshake;
pub use handshake::*;

mod tcp;
pub use tcp::*;

mod listener;
pub use listener::*;
