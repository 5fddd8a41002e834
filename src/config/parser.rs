use crate::config::types::{Config, LoadedConfig};
use crate::error::{Result, ReditError};
use std::path::Path;

/// Parse a config file from the given path.
pub fn parse_config_file(path: &Path) -> Result<Config> {
	let content = std::fs::read_to_string(path).map_err(|source| ReditError::ConfigReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_config_str(&content, path)
}

/// Parse a config from a string (useful for testing).
pub fn parse_config_str(content: &str, path: &Path) -> Result<Config> {
	let config: Config =
		toml::from_str(content).map_err(|source| ReditError::ConfigParseError {
			path: path.to_path_buf(),
			source,
		})?;

	// Validate the parsed config
	config.validate()?;

	Ok(config)
}

/// Parse a config file and keep its path alongside it.
pub fn load_config(path: &Path) -> Result<LoadedConfig> {
	let config = parse_config_file(path)?;
	Ok(LoadedConfig {
		config,
		path: path.to_path_buf(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::Count;
	use std::path::PathBuf;

	#[test]
	fn test_parse_empty_config() {
		let content = "";
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert!(config.files.is_empty());
		assert!(config.tables.is_empty());
		assert!(config.table_files.is_empty());
		assert!(config.rules.is_empty());
	}

	#[test]
	fn test_parse_rules_array_of_tables() {
		let content = r#"
files = ["src/pages/PropertyDetail.tsx"]

[tables.fields]
"fullProperty.address.listingPrice" = "7_listing_price"

[[rules]]
name = "add-field-key"
pattern = 'renderDataField\("([^"]+)", (fullProperty\.[a-zA-Z.]+)(?:, ([^)]+))?\)'
table = "fields"
key = "2"
replace = 'renderDataField("$1", $2, $3, undefined, "$value")'
defaults = { 3 = '"text"' }
skip_if_contains = '"$value"'

[[rules]]
name = "motion-import"
find = "import { useEffect } from 'react';"
replace = "import { useEffect } from 'react';\nimport { motion } from 'framer-motion';"
count = "first"
skip_if_followed_by = "\nimport { motion }"
"#;
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert_eq!(config.files, vec![PathBuf::from("src/pages/PropertyDetail.tsx")]);
		assert_eq!(config.rules.len(), 2);

		let rule1 = &config.rules[0];
		assert_eq!(rule1.name, "add-field-key");
		assert_eq!(rule1.table, Some("fields".to_string()));
		assert_eq!(rule1.key, Some("2".to_string()));
		assert_eq!(rule1.defaults.get("3"), Some(&"\"text\"".to_string()));
		assert_eq!(rule1.count, Count::All);

		let rule2 = &config.rules[1];
		assert_eq!(rule2.count, Count::First);
		assert_eq!(
			rule2.skip_if_followed_by,
			Some("\nimport { motion }".to_string())
		);
	}

	#[test]
	fn test_parse_block_rule_with_inner_rules() {
		let content = r#"
[[rules]]
name = "wrap-chart"
block_start = 'function Chart6_1_\w+\(\) '
skip_if_contains = "<motion.div"

[[rules.inner]]
name = "legend"
find = "<Legend />"
replace = '<SmartScaleLegend description="Flooring" />'
"#;
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();

		assert_eq!(config.rules.len(), 1);
		assert!(config.rules[0].is_block());
		assert_eq!(config.rules[0].inner.len(), 1);
		assert_eq!(config.rules[0].inner[0].name, "legend");
	}

	#[test]
	fn test_parse_listing() {
		let content = r#"
[[rules]]
name = "paths"
find = "const paths = {};"
replace = "const paths = {\n$listing\n};"
listing = { table = "fields", entry = "  '$value': '$key'," }
"#;
		let path = PathBuf::from("test.toml");
		let config = parse_config_str(content, &path).unwrap();
		let listing = config.rules[0].listing.as_ref().unwrap();
		assert_eq!(listing.table, "fields");
		assert_eq!(listing.separator, "\n");
	}

	#[test]
	fn test_mutually_exclusive_matchers() {
		let content = r#"
[[rules]]
name = "both"
find = "foo"
pattern = "bar"
replace = "baz"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);

		assert!(result.is_err());
		match result.unwrap_err() {
			ReditError::MutuallyExclusive { option1, option2 } => {
				assert_eq!(option1, "find");
				assert_eq!(option2, "pattern");
			}
			_ => panic!("Expected MutuallyExclusive error"),
		}
	}

	#[test]
	fn test_sed_and_replace_are_exclusive() {
		let content = r#"
[[rules]]
name = "sed"
sed = "s/foo/bar/g"
replace = "baz"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);
		assert!(matches!(
			result,
			Err(ReditError::MutuallyExclusive { ref option1, .. }) if option1 == "sed"
		));
	}

	#[test]
	fn test_missing_matcher() {
		let content = r#"
[[rules]]
name = "nothing"
replace = "baz"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);
		assert!(matches!(result, Err(ReditError::MissingOption { .. })));
	}

	#[test]
	fn test_missing_replacement() {
		let content = r#"
[[rules]]
name = "nothing"
pattern = "foo"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);
		match result.unwrap_err() {
			ReditError::MissingOption { rule, option } => {
				assert_eq!(rule, "nothing");
				assert_eq!(option, "replace");
			}
			_ => panic!("Expected MissingOption error"),
		}
	}

	#[test]
	fn test_duplicate_rule_names() {
		let content = r#"
[[rules]]
name = "same"
find = "a"
replace = "b"

[[rules]]
name = "same"
find = "c"
replace = "d"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);
		assert!(matches!(
			result,
			Err(ReditError::DuplicateRuleName { ref name }) if name == "same"
		));
	}

	#[test]
	fn test_block_delimiters_must_differ() {
		let content = r#"
[[rules]]
name = "quotes"
block_start = "x"
open = '"'
close = '"'
replace = ""
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);
		assert!(matches!(result, Err(ReditError::InvalidRule { .. })));
	}

	#[test]
	fn test_inner_rules_require_block() {
		let content = r#"
[[rules]]
name = "flat"
pattern = "x"
replace = "y"

[[rules.inner]]
name = "nested"
find = "a"
replace = "b"
"#;
		let path = PathBuf::from("test.toml");
		let result = parse_config_str(content, &path);
		assert!(matches!(result, Err(ReditError::InvalidRule { .. })));
	}

	#[test]
	fn test_invalid_toml() {
		let path = PathBuf::from("test.toml");
		let result = parse_config_str("invalid toml [[[", &path);
		assert!(matches!(result, Err(ReditError::ConfigParseError { .. })));
	}
}
