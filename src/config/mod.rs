//! TOML configuration for the view manager.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{Config, ManagerConfig};
