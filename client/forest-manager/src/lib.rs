pub mod error;
pub(crate) mod prove;
pub mod rocksdb;
pub mod traits;
pub(crate) mod utils;

#[cfg(test)]
mod test_utils;

const LOG_TARGET: &str = "forest-storage";
