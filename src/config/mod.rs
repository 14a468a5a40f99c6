//! Reader configuration.
//!
//! Screen geometry, position debounce, cache location and log level come from
//! `conf/config.toml`. Absent keys take their defaults; an unreadable file is
//! logged and replaced by `AppConfig::default()`.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel};
