//! Configuration for the tether client.
//!
//! Every knob is a plain number with a default so that changing a threshold
//! never requires touching data already persisted by the cache. Thresholds
//! simply apply on the next write.
//!
//! Files are layered (later overrides earlier):
//! - `~/.config/tether/config.toml` (or `$TETHER_CONFIG_DIR/config.toml`)
//! - `./tether.toml` (project-local)
//! - environment (`TETHER_SERVER_URL`, `TETHER_TOKEN`, `TETHER_DIRECTORY`)
//! - CLI arguments (handled by the binary)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    data_dir, load_config, load_config_file, load_config_with_options, save_config,
    xdg_config_dir, xdg_config_path, ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
