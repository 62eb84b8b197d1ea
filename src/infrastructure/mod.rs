pub mod in_memory;
pub mod presenter;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod scripted;
pub mod worker;
