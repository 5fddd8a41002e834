//! Rule file loading and parsing for redit.
//!
//! This module handles:
//! - TOML rule file parsing and validation
//! - Discovery of the nearest `.redit.toml`
//! - The `--init` template

pub mod discover;
pub mod init;
pub mod parser;
pub mod types;

pub use discover::{CONFIG_FILE_NAME, find_config, resolve_config};
pub use init::generate_init_template;
pub use parser::{load_config, parse_config_file, parse_config_str};
pub use types::{Config, Count, Listing, LoadedConfig, Rule};
