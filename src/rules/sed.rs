use crate::error::{Result, ReditError};
use crate::rules::matcher::compile_regex;
use regex::Regex;

/// Parsed substitution command (sed-like syntax).
#[derive(Debug)]
pub struct Substitution {
	/// The pattern to match.
	pub pattern: Regex,

	/// The replacement template.
	pub replacement: String,

	/// Whether to replace all occurrences (global flag).
	pub global: bool,
}

impl Substitution {
	/// Parse a substitution string in sed-like format: "s/pattern/replacement/" or "s/pattern/replacement/g"
	pub fn parse(input: &str) -> Result<Self> {
		let invalid = |reason: &str| ReditError::InvalidSubstitution {
			expression: input.to_string(),
			reason: reason.to_string(),
		};

		// Must start with 's'
		let rest = input
			.strip_prefix('s')
			.ok_or_else(|| invalid("substitution must start with 's'"))?;

		// Get the delimiter (character after 's')
		let delimiter = rest
			.chars()
			.next()
			.ok_or_else(|| invalid("substitution too short"))?;
		if delimiter.is_alphanumeric() || delimiter == '\\' {
			return Err(invalid("delimiter must be a punctuation character"));
		}

		// Split by delimiter, handling escapes
		let parts = split_by_delimiter(&rest[delimiter.len_utf8()..], delimiter);

		if parts.len() < 2 {
			return Err(invalid("substitution must have pattern and replacement"));
		}
		if parts.len() > 3 {
			return Err(invalid("unescaped delimiter in flags"));
		}

		let flags = parts.get(2).map(String::as_str).unwrap_or("");
		if let Some(flag) = flags.chars().find(|&c| c != 'g') {
			return Err(invalid(&format!("unsupported flag {flag:?}")));
		}

		Ok(Substitution {
			pattern: compile_regex(&parts[0])?,
			replacement: parts[1].clone(),
			global: flags.contains('g'),
		})
	}
}

/// Split a string by a delimiter, respecting backslash escapes.
fn split_by_delimiter(input: &str, delimiter: char) -> Vec<String> {
	let mut parts = Vec::new();
	let mut current = String::new();
	let mut chars = input.chars().peekable();

	while let Some(c) = chars.next() {
		if c == '\\' && chars.peek() == Some(&delimiter) {
			// Escaped delimiter becomes a literal delimiter
			current.push(delimiter);
			chars.next();
		} else if c == delimiter {
			parts.push(std::mem::take(&mut current));
		} else {
			current.push(c);
		}
	}

	// Add the last part
	parts.push(current);

	// A trailing delimiter leaves an empty flags part behind
	if parts.len() == 3 && parts[2].is_empty() {
		parts.pop();
	}

	parts
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_simple_substitution() {
		let sub = Substitution::parse("s/foo/bar/").unwrap();
		assert_eq!(sub.pattern.as_str(), "foo");
		assert_eq!(sub.replacement, "bar");
		assert!(!sub.global);
	}

	#[test]
	fn test_parse_global_substitution() {
		let sub = Substitution::parse("s/foo/bar/g").unwrap();
		assert_eq!(sub.replacement, "bar");
		assert!(sub.global);
	}

	#[test]
	fn test_parse_without_trailing_delimiter() {
		let sub = Substitution::parse("s/foo/bar").unwrap();
		assert_eq!(sub.replacement, "bar");
		assert!(!sub.global);
	}

	#[test]
	fn test_parse_different_delimiter() {
		let sub = Substitution::parse(r"s#home\.flooring_type#home.flooringType#g").unwrap();
		assert_eq!(sub.pattern.as_str(), r"home\.flooring_type");
		assert_eq!(sub.replacement, "home.flooringType");
	}

	#[test]
	fn test_parse_escaped_delimiter() {
		let sub = Substitution::parse(r"s/foo\/bar/baz/").unwrap();
		assert_eq!(sub.pattern.as_str(), "foo/bar");
		assert_eq!(sub.replacement, "baz");
	}

	#[test]
	fn test_parse_keeps_other_escapes() {
		let sub = Substitution::parse(r"s/(\w+)\.value/$1/g").unwrap();
		assert_eq!(sub.pattern.as_str(), r"(\w+)\.value");
		assert_eq!(sub.replacement, "$1");
	}

	#[test]
	fn test_invalid_substitution_no_s() {
		let result = Substitution::parse("foo/bar/");
		assert!(matches!(
			result,
			Err(ReditError::InvalidSubstitution { .. })
		));
	}

	#[test]
	fn test_invalid_substitution_too_short() {
		let result = Substitution::parse("s");
		assert!(result.is_err());
	}

	#[test]
	fn test_invalid_substitution_missing_replacement() {
		let result = Substitution::parse("s/foo");
		assert!(result.is_err());
	}

	#[test]
	fn test_invalid_flag() {
		let result = Substitution::parse("s/foo/bar/i");
		match result.unwrap_err() {
			ReditError::InvalidSubstitution { reason, .. } => {
				assert!(reason.contains("'i'"));
			}
			_ => panic!("Expected InvalidSubstitution error"),
		}
	}

	#[test]
	fn test_invalid_regex_in_substitution() {
		let result = Substitution::parse("s/[invalid/bar/");
		assert!(matches!(result, Err(ReditError::InvalidRegex { .. })));
	}
}
