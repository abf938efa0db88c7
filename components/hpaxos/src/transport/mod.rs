mod errors;
pub use errors::*;

mod transport;
pub use transport::*;

mod local;
pub use local::*;
