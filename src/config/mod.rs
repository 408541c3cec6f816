pub mod loader;
pub mod types;

pub use loader::{load_default, load_from_toml};
pub use types::{AppConfig, L1Config, RollerConfig};
