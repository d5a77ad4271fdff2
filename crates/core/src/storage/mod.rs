pub mod format;
pub mod intent_log;
pub mod record_store;
pub mod rest_store;
