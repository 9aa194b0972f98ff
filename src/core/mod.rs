pub mod config;
pub mod paths;

pub use config::{default_config, load_config, save_config, Config};
