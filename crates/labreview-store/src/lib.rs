//! labreview-store: configuration and persistence backends.
//!
//! Implements the `ReviewStore` trait over JSON files and process memory,
//! and loads the `labreview.toml` configuration that selects between them.

pub mod config;
pub mod file;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, LabreviewConfig, StoreConfig};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
