use std::path::PathBuf;

/// Library-level structured errors for redit.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum ReditError {
	#[error("No .redit.toml found in {start} or any parent directory")]
	ConfigNotFound { start: PathBuf },

	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid regex pattern in rule: {pattern}")]
	InvalidRegex {
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Invalid sed expression {expression:?}: {reason}")]
	InvalidSubstitution { expression: String, reason: String },

	#[error("Mutually exclusive options: {option1} and {option2}")]
	MutuallyExclusive { option1: String, option2: String },

	#[error("Rule {rule:?} is missing required option: {option}")]
	MissingOption { rule: String, option: String },

	#[error("Invalid rule {rule:?}: {reason}")]
	InvalidRule { rule: String, reason: String },

	#[error("Duplicate rule name: {name}")]
	DuplicateRuleName { name: String },

	#[error("Rule {rule:?} references unknown table: {table}")]
	UnknownTable { rule: String, table: String },

	#[error("Table declared more than once: {name}")]
	DuplicateTable { name: String },

	#[error("Duplicate key {key:?} in table {table}")]
	DuplicateKey { table: String, key: String },

	#[error("Value for key {key:?} in table {table} must be a string")]
	InvalidTableValue { table: String, key: String },

	#[error("Failed to read table file: {path}")]
	TableReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse table file: {path}")]
	TableParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to read document: {path}")]
	DocumentReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Document is not valid UTF-8: {path}")]
	DocumentNotUtf8 {
		path: PathBuf,
		#[source]
		source: std::string::FromUtf8Error,
	},

	#[error("Failed to write document: {path}")]
	DocumentWriteError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Result type alias using ReditError.
pub type Result<T> = std::result::Result<T, ReditError>;
