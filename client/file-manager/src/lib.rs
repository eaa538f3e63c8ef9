pub mod error;
pub mod rocksdb;
pub mod traits;

const LOG_TARGET: &str = "file-storage";
