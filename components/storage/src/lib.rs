#[macro_use]
extern crate quick_error;

mod errors;
pub use errors::*;

mod traits;
pub use traits::*;

mod mem_engine;
pub use mem_engine::*;

mod file_engine;
pub use file_engine::*;

#[cfg(test)]
mod test_engine;
