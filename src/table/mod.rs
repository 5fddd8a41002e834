//! Mapping tables for redit.
//!
//! This module handles:
//! - Ordered, unique key to token associations
//! - Loading tables declared inline or in separate TOML files

use crate::config::types::LoadedConfig;
use crate::error::{Result, ReditError};
use std::collections::HashMap;
use std::path::Path;

/// An ordered association from a symbolic key to a replacement token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
	entries: Vec<(String, String)>,
	index: HashMap<String, usize>,
}

impl MappingTable {
	/// Create an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append an entry. Keys must be unique within a table.
	pub fn insert(
		&mut self,
		table: &str,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Result<()> {
		let key = key.into();
		if self.index.contains_key(&key) {
			return Err(ReditError::DuplicateKey {
				table: table.to_string(),
				key,
			});
		}
		self.index.insert(key.clone(), self.entries.len());
		self.entries.push((key, value.into()));
		Ok(())
	}

	/// Look up a key. `None` means no mapping exists.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.index
			.get(key)
			.map(|&i| self.entries[i].1.as_str())
	}

	/// Iterate over entries in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Build a table from a parsed TOML table, preserving entry order.
	pub fn from_toml(name: &str, raw: &toml::Table) -> Result<Self> {
		let mut table = MappingTable::new();
		for (key, value) in raw {
			let token = value
				.as_str()
				.ok_or_else(|| ReditError::InvalidTableValue {
					table: name.to_string(),
					key: key.clone(),
				})?;
			table.insert(name, key.as_str(), token)?;
		}
		Ok(table)
	}
}

#[cfg(test)]
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MappingTable {
	/// Collect fixture pairs into a table. Panics on a duplicate key.
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut table = MappingTable::new();
		for (key, value) in iter {
			table
				.insert("fixture", key, value)
				.expect("duplicate key in fixture table");
		}
		table
	}
}

/// The named tables available to a rule set.
#[derive(Debug, Clone, Default)]
pub struct Tables {
	tables: HashMap<String, MappingTable>,
}

impl Tables {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a table under a name. A name may only be used once.
	pub fn add(&mut self, name: impl Into<String>, table: MappingTable) -> Result<()> {
		let name = name.into();
		if self.tables.contains_key(&name) {
			return Err(ReditError::DuplicateTable { name });
		}
		self.tables.insert(name, table);
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&MappingTable> {
		self.tables.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.tables.contains_key(name)
	}

	/// Table names, sorted for stable display.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<_> = self.tables.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}
}

/// Parse a table file: a flat TOML table of `key = "token"` entries.
pub fn parse_table_file(name: &str, path: &Path) -> Result<MappingTable> {
	let content = std::fs::read_to_string(path).map_err(|source| ReditError::TableReadError {
		path: path.to_path_buf(),
		source,
	})?;

	let raw: toml::Table =
		toml::from_str(&content).map_err(|source| ReditError::TableParseError {
			path: path.to_path_buf(),
			source,
		})?;

	MappingTable::from_toml(name, &raw)
}

/// Load every table a rule file declares, inline tables first.
///
/// Table file paths are resolved relative to the rule file's directory.
pub fn load_tables(loaded: &LoadedConfig) -> Result<Tables> {
	let mut tables = Tables::new();

	for (name, raw) in &loaded.config.tables {
		tables.add(name.as_str(), MappingTable::from_toml(name, raw)?)?;
	}

	for (name, rel_path) in &loaded.config.table_files {
		if tables.contains(name) {
			return Err(ReditError::DuplicateTable { name: name.clone() });
		}
		let path = loaded.base_dir().join(rel_path);
		tracing::debug!(table = %name, path = %path.display(), "loading table file");
		tables.add(name.as_str(), parse_table_file(name, &path)?)?;
	}

	Ok(tables)
}
