pub mod blockchain_utils;
pub mod config;
pub mod consts;
pub mod events;
pub mod rocksdb;
pub mod task_context;
pub mod traits;
pub mod trusted_file_transfer;
pub mod typed_store;
pub mod types;
pub mod utils;
