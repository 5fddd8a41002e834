//! Document I/O for redit.
//!
//! Reading and writing happen once per document, around a pure rewrite pass.
//! Writes are skipped when the rewrite changed nothing.

use crate::error::{Result, ReditError};
use crate::rules::{CompiledRule, RewriteResult, rewrite};
use crate::table::Tables;
use std::path::{Path, PathBuf};

/// A document read from disk.
#[derive(Debug, Clone)]
pub struct Document {
	/// Where the document was read from.
	pub path: PathBuf,

	/// The original text, byte for byte.
	pub source: String,
}

impl Document {
	/// Read a whole document. Content must be valid UTF-8.
	pub fn read(path: &Path) -> Result<Self> {
		let bytes = std::fs::read(path).map_err(|source| ReditError::DocumentReadError {
			path: path.to_path_buf(),
			source,
		})?;

		let source = String::from_utf8(bytes).map_err(|source| ReditError::DocumentNotUtf8 {
			path: path.to_path_buf(),
			source,
		})?;

		Ok(Document {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Run a rule set over this document.
	pub fn rewrite(&self, rules: &[CompiledRule], tables: &Tables) -> RewriteResult {
		rewrite(&self.source, rules, tables)
	}

	/// Write the rewritten text back if it differs from the source.
	///
	/// Returns whether the file was written.
	pub fn persist(&self, result: &RewriteResult) -> Result<bool> {
		if !result.changed(&self.source) {
			tracing::debug!(path = %self.path.display(), "unchanged, not writing");
			return Ok(false);
		}

		std::fs::write(&self.path, &result.output).map_err(|source| {
			ReditError::DocumentWriteError {
				path: self.path.clone(),
				source,
			}
		})?;

		tracing::debug!(path = %self.path.display(), bytes = result.output.len(), "wrote document");
		Ok(true)
	}
}
