/// Key-value persistence backends for game records.
pub mod kv_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
