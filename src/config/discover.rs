use crate::config::parser::load_config;
use crate::config::types::LoadedConfig;
use crate::error::{Result, ReditError};
use std::path::{Path, PathBuf};

/// File name looked up when no rule file is given explicitly.
pub const CONFIG_FILE_NAME: &str = ".redit.toml";

/// Find the nearest rule file.
///
/// Starts at `start_dir` and walks up the directory tree, returning the
/// first `.redit.toml` found.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
	let mut current_dir = start_dir.to_path_buf();

	loop {
		let config_path = current_dir.join(CONFIG_FILE_NAME);
		if config_path.is_file() {
			return Some(config_path);
		}

		// Move to parent directory
		if let Some(parent) = current_dir.parent() {
			current_dir = parent.to_path_buf();
		} else {
			return None;
		}
	}
}

/// Load the explicit rule file if given, otherwise the nearest one.
pub fn resolve_config(explicit: Option<&Path>, start_dir: &Path) -> Result<LoadedConfig> {
	let path = match explicit {
		Some(path) => path.to_path_buf(),
		None => find_config(start_dir).ok_or_else(|| ReditError::ConfigNotFound {
			start: start_dir.to_path_buf(),
		})?,
	};

	tracing::debug!(path = %path.display(), "using rule file");
	load_config(&path)
}
