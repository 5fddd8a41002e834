use crate::error::ReditError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration from a `.redit.toml` rule file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
	/// Default target documents, relative to the rule file.
	#[serde(default)]
	pub files: Vec<PathBuf>,

	/// Inline mapping tables, keyed by table name. Entry order is preserved.
	#[serde(default)]
	pub tables: BTreeMap<String, toml::Table>,

	/// Mapping tables stored in separate TOML files, relative to the rule file.
	#[serde(default)]
	pub table_files: BTreeMap<String, PathBuf>,

	/// Rewrite rules, applied in order.
	#[serde(default)]
	pub rules: Vec<Rule>,
}

/// How many matches of a rule's matcher are rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Count {
	#[default]
	All,
	First,
}

/// A single rewrite rule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rule {
	/// Name shown in reports. Must be unique within a rule file.
	pub name: String,

	/// Exact text to find (mutually exclusive with pattern, sed and block_start).
	pub find: Option<String>,

	/// Regex to match (mutually exclusive with find, sed and block_start).
	pub pattern: Option<String>,

	/// Sed-like substitution (mutually exclusive with find, pattern and block_start).
	/// Format: "s/pattern/replacement/" or "s/pattern/replacement/g" for global.
	pub sed: Option<String>,

	/// Regex locating the start of a balanced block (mutually exclusive with find, pattern and sed).
	pub block_start: Option<String>,

	/// Opening delimiter for block rules. Defaults to "{".
	pub open: Option<String>,

	/// Closing delimiter for block rules. Defaults to "}".
	pub close: Option<String>,

	/// Replacement template. Supports `$1`, `$name`, `${name}`, `$value`, `$listing` and `$$`.
	pub replace: Option<String>,

	/// Rewrite all matches or only the first.
	#[serde(default)]
	pub count: Count,

	/// Mapping table consulted for each match.
	pub table: Option<String>,

	/// Capture group holding the lookup key. Defaults to "key".
	pub key: Option<String>,

	/// Text used for capture groups that did not participate in a match.
	#[serde(default)]
	pub defaults: BTreeMap<String, String>,

	/// Leave a match alone when it contains this marker.
	pub skip_if_contains: Option<String>,

	/// Leave a match alone when the text after it starts with this marker.
	pub skip_if_followed_by: Option<String>,

	/// Leave a match alone when the text before it ends with this marker.
	pub skip_if_preceded_by: Option<String>,

	/// Rules applied to the body of each matched block.
	#[serde(default)]
	pub inner: Vec<Rule>,

	/// Renders a whole table for `$listing`.
	pub listing: Option<Listing>,
}

/// Expansion of a whole mapping table into text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Listing {
	/// Table to render.
	pub table: String,

	/// Per-entry template. Supports `$key` and `$value`.
	pub entry: String,

	/// Separator between rendered entries.
	#[serde(default = "default_separator")]
	pub separator: String,
}

fn default_separator() -> String {
	"\n".to_string()
}

/// A loaded configuration with its source path for debugging/display.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
	/// The parsed configuration.
	pub config: Config,

	/// The path this config was loaded from.
	pub path: PathBuf,
}

impl LoadedConfig {
	/// Directory relative paths in the rule file are resolved against.
	pub fn base_dir(&self) -> &Path {
		match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		}
	}

	/// The configured target files, resolved against the rule file.
	pub fn target_files(&self) -> Vec<PathBuf> {
		self.config
			.files
			.iter()
			.map(|f| self.base_dir().join(f))
			.collect()
	}
}

impl Rule {
	/// The option names of the matchers this rule sets.
	fn matcher_fields(&self) -> Vec<&'static str> {
		[
			("find", self.find.is_some()),
			("pattern", self.pattern.is_some()),
			("sed", self.sed.is_some()),
			("block_start", self.block_start.is_some()),
		]
		.iter()
		.filter(|(_, is_set)| *is_set)
		.map(|(name, _)| *name)
		.collect()
	}

	/// Whether this rule locates balanced blocks.
	pub fn is_block(&self) -> bool {
		self.block_start.is_some()
	}

	/// Validate option combinations that don't need compiled patterns or tables.
	pub fn validate(&self) -> Result<(), ReditError> {
		if self.name.trim().is_empty() {
			return Err(ReditError::MissingOption {
				rule: self.name.clone(),
				option: "name".to_string(),
			});
		}

		let matchers = self.matcher_fields();
		if matchers.len() > 1 {
			return Err(ReditError::MutuallyExclusive {
				option1: matchers[0].to_string(),
				option2: matchers[1].to_string(),
			});
		}
		if matchers.is_empty() {
			return Err(ReditError::MissingOption {
				rule: self.name.clone(),
				option: "find, pattern, sed or block_start".to_string(),
			});
		}

		if self.sed.is_some() && self.replace.is_some() {
			return Err(ReditError::MutuallyExclusive {
				option1: "sed".to_string(),
				option2: "replace".to_string(),
			});
		}

		let has_rewrite =
			self.replace.is_some() || self.sed.is_some() || (self.is_block() && !self.inner.is_empty());
		if !has_rewrite {
			return Err(ReditError::MissingOption {
				rule: self.name.clone(),
				option: "replace".to_string(),
			});
		}

		if self.find.as_deref() == Some("") {
			return Err(ReditError::InvalidRule {
				rule: self.name.clone(),
				reason: "find must not be empty".to_string(),
			});
		}

		if self.is_block() {
			let open = self.open.as_deref().unwrap_or("{");
			let close = self.close.as_deref().unwrap_or("}");
			if open.is_empty() || close.is_empty() {
				return Err(ReditError::InvalidRule {
					rule: self.name.clone(),
					reason: "block delimiters must not be empty".to_string(),
				});
			}
			if open == close {
				return Err(ReditError::InvalidRule {
					rule: self.name.clone(),
					reason: format!("open and close delimiters are both {open:?}"),
				});
			}
		} else {
			if self.open.is_some() || self.close.is_some() {
				return Err(ReditError::InvalidRule {
					rule: self.name.clone(),
					reason: "open/close only apply to block_start rules".to_string(),
				});
			}
			if !self.inner.is_empty() {
				return Err(ReditError::InvalidRule {
					rule: self.name.clone(),
					reason: "inner rules only apply to block_start rules".to_string(),
				});
			}
		}

		validate_rules(&self.inner)?;
		Ok(())
	}
}

/// Validate a list of rules, including that names are unique.
fn validate_rules(rules: &[Rule]) -> Result<(), ReditError> {
	let mut seen = std::collections::HashSet::new();
	for rule in rules {
		rule.validate()?;
		if !seen.insert(rule.name.as_str()) {
			return Err(ReditError::DuplicateRuleName {
				name: rule.name.clone(),
			});
		}
	}
	Ok(())
}

impl Config {
	/// Validate all rules in this config.
	pub fn validate(&self) -> Result<(), ReditError> {
		for name in self.table_files.keys() {
			if self.tables.contains_key(name) {
				return Err(ReditError::DuplicateTable { name: name.clone() });
			}
		}
		validate_rules(&self.rules)
	}
}
