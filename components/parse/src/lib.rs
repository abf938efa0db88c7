#[macro_use]
extern crate quick_error;

mod request;
pub use request::*;

mod response;
pub use response::*;

#[cfg(test)]
mod test_parse;
