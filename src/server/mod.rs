mod errors;
pub use errors::*;

mod server;
pub use self::server::*;
