pub mod config_io;
pub mod kv;
pub mod lock;
pub mod quest_store;
pub mod recovery;
pub mod store_dir;
