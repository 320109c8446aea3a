pub mod app_config;
pub mod memory;

pub use app_config::{Config, StoreConfig};
pub use memory::InMemoryStore;
