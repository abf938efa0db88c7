mod errors;
pub use errors::*;

mod redisapi;
pub use self::redisapi::*;

#[cfg(test)]
mod test_redisapi;
