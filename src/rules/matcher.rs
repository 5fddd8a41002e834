use crate::config::types::{Config, Count, Listing, Rule};
use crate::error::{Result, ReditError};
use crate::rules::scanner::{Delimiters, ScanError, find_block, match_close};
use crate::rules::sed::Substitution;
use crate::rules::template::Template;
use crate::table::Tables;
use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Range;

/// Names with a fixed meaning in templates. They shadow capture groups.
pub const RESERVED_NAMES: [&str; 2] = ["value", "listing"];

/// How a rule locates the regions it rewrites.
#[derive(Debug)]
enum MatcherKind {
	Literal(String),
	Regex(Regex),
	Block {
		start: Regex,
		delimiters: Delimiters,
	},
}

/// A compiled matcher plus the names of the groups its regions expose.
#[derive(Debug)]
pub struct Matcher {
	kind: MatcherKind,
	names: Vec<Option<String>>,
}

/// One matched region of a document, with its capture groups.
#[derive(Debug, Clone)]
pub struct Region<'a> {
	text: &'a str,

	/// Byte range of the whole match.
	pub span: Range<usize>,

	groups: Vec<Option<Range<usize>>>,
	names: &'a [Option<String>],
}

impl<'a> Region<'a> {
	/// The matched text.
	pub fn as_str(&self) -> &'a str {
		&self.text[self.span.clone()]
	}

	/// A capture group by index or name. `None` if it did not participate.
	pub fn get(&self, name: &str) -> Option<&'a str> {
		let index = match name.parse::<usize>() {
			Ok(index) => index,
			Err(_) => self
				.names
				.iter()
				.position(|n| n.as_deref() == Some(name))?,
		};
		let range = self.groups.get(index)?.clone()?;
		Some(&self.text[range])
	}

	/// Text after the match.
	pub fn after(&self) -> &'a str {
		&self.text[self.span.end..]
	}

	/// Text before the match.
	pub fn before(&self) -> &'a str {
		&self.text[..self.span.start]
	}
}

impl Matcher {
	/// Match an exact string.
	pub fn literal(find: &str) -> Self {
		Matcher {
			kind: MatcherKind::Literal(find.to_string()),
			names: vec![None],
		}
	}

	/// Match a regex; its capture groups become region groups.
	pub fn regex(regex: Regex) -> Self {
		let names = regex.capture_names().map(|n| n.map(String::from)).collect();
		Matcher {
			kind: MatcherKind::Regex(regex),
			names,
		}
	}

	/// Match balanced blocks introduced by `start`.
	///
	/// Regions expose `head` (start through the opening delimiter), `body`
	/// and `tail` (the closing delimiter).
	pub fn block(start: Regex, delimiters: Delimiters) -> Self {
		Matcher {
			kind: MatcherKind::Block { start, delimiters },
			names: vec![
				None,
				Some("head".to_string()),
				Some("body".to_string()),
				Some("tail".to_string()),
			],
		}
	}

	/// Whether regions of this matcher can expose the given group.
	pub fn has_group(&self, name: &str) -> bool {
		match name.parse::<usize>() {
			Ok(index) => index < self.names.len(),
			Err(_) => self.names.iter().any(|n| n.as_deref() == Some(name)),
		}
	}

	/// Locate all non-overlapping matches in `text`, left to right.
	pub fn find_all<'a>(&'a self, text: &'a str) -> std::result::Result<Vec<Region<'a>>, ScanError> {
		let region = |span: Range<usize>, groups: Vec<Option<Range<usize>>>| Region {
			text,
			span,
			groups,
			names: &self.names,
		};

		match &self.kind {
			MatcherKind::Literal(find) => Ok(text
				.match_indices(find.as_str())
				.map(|(start, m)| {
					let span = start..start + m.len();
					region(span.clone(), vec![Some(span)])
				})
				.collect()),
			MatcherKind::Regex(regex) => Ok(regex
				.captures_iter(text)
				.map(|caps| {
					let groups = caps.iter().map(|g| g.map(|m| m.range())).collect();
					let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
					region(span, groups)
				})
				.collect()),
			MatcherKind::Block { start, delimiters } => {
				let mut regions = Vec::new();
				let mut pos = 0;

				while pos <= text.len() {
					let Some(m) = start.find_at(text, pos) else {
						break;
					};

					// The opening delimiter ends the start match, or follows it.
					let block = if m.as_str().ends_with(delimiters.open.as_str()) {
						match_close(text, m.end() - delimiters.open.len(), delimiters)?
					} else {
						find_block(text, m.end(), delimiters)?
					};

					let span = m.start()..block.close.end;
					regions.push(region(
						span.clone(),
						vec![
							Some(span),
							Some(m.start()..block.open.end),
							Some(block.body()),
							Some(block.close.clone()),
						],
					));
					pos = block.close.end;
				}

				Ok(regions)
			}
		}
	}
}

/// A mapping-table lookup performed for each match.
#[derive(Debug, Clone)]
pub struct Lookup {
	/// Table name.
	pub table: String,

	/// Capture group holding the key.
	pub key: String,
}

/// A per-match idempotence check. When it holds, the match is left alone.
#[derive(Debug, Clone)]
pub enum Guard {
	/// The match contains the marker.
	Contains(Template),

	/// The text after the match starts with the marker.
	FollowedBy(Template),

	/// The text before the match ends with the marker.
	PrecededBy(Template),
}

impl Guard {
	fn template(&self) -> &Template {
		match self {
			Guard::Contains(t) | Guard::FollowedBy(t) | Guard::PrecededBy(t) => t,
		}
	}

	/// Check the guard against a region, rendering the marker with `resolve`.
	/// An empty marker never holds.
	pub fn holds<'v>(&self, region: &Region, resolve: impl Fn(&str) -> Option<&'v str>) -> bool {
		let marker = self.template().render(resolve);
		if marker.is_empty() {
			return false;
		}
		match self {
			Guard::Contains(_) => region.as_str().contains(&marker),
			Guard::FollowedBy(_) => region.after().starts_with(&marker),
			Guard::PrecededBy(_) => region.before().ends_with(&marker),
		}
	}
}

/// A compiled rule ready for rewriting.
#[derive(Debug)]
pub struct CompiledRule {
	/// Rule name, used in reports.
	pub name: String,

	/// Locates the regions to rewrite.
	pub matcher: Matcher,

	/// Replacement template. `None` only for block rules rewritten by inner rules.
	pub replace: Option<Template>,

	/// Rewrite all matches or only the first.
	pub count: Count,

	/// Mapping-table lookup, if the rule uses one.
	pub lookup: Option<Lookup>,

	/// Text for capture groups that did not participate in a match.
	pub defaults: BTreeMap<String, String>,

	/// Idempotence checks, tried in order.
	pub guards: Vec<Guard>,

	/// Rules applied to each matched block's body.
	pub inner: Vec<CompiledRule>,

	/// Pre-rendered `$listing` text.
	pub listing: Option<String>,
}

impl CompiledRule {
	/// Compile a rule, checking it against the available tables.
	pub fn compile(rule: &Rule, tables: &Tables) -> Result<Self> {
		let invalid = |reason: String| ReditError::InvalidRule {
			rule: rule.name.clone(),
			reason,
		};

		let mut count = rule.count;
		let mut replace = rule.replace.as_deref().map(Template::parse);

		let matcher = if let Some(ref find) = rule.find {
			Matcher::literal(find)
		} else if let Some(ref pattern) = rule.pattern {
			Matcher::regex(compile_regex(pattern)?)
		} else if let Some(ref expression) = rule.sed {
			let sub = Substitution::parse(expression)?;
			if !sub.global {
				count = Count::First;
			}
			replace = Some(Template::parse(&sub.replacement));
			Matcher::regex(sub.pattern)
		} else if let Some(ref start) = rule.block_start {
			let defaults = Delimiters::default();
			let delimiters = Delimiters {
				open: rule.open.clone().unwrap_or(defaults.open),
				close: rule.close.clone().unwrap_or(defaults.close),
			};
			Matcher::block(compile_regex(start)?, delimiters)
		} else {
			return Err(ReditError::MissingOption {
				rule: rule.name.clone(),
				option: "find, pattern, sed or block_start".to_string(),
			});
		};

		let lookup = match rule.table {
			Some(ref table) => {
				if !tables.contains(table) {
					return Err(ReditError::UnknownTable {
						rule: rule.name.clone(),
						table: table.clone(),
					});
				}
				let key = rule.key.clone().unwrap_or_else(|| "key".to_string());
				if !matcher.has_group(&key) {
					return Err(invalid(format!("key group {key:?} is not captured by the matcher")));
				}
				Some(Lookup {
					table: table.clone(),
					key,
				})
			}
			None => None,
		};

		let listing = rule
			.listing
			.as_ref()
			.map(|listing| render_listing(&rule.name, listing, tables))
			.transpose()?;

		let guards: Vec<Guard> = [
			rule.skip_if_contains.as_deref().map(|m| Guard::Contains(Template::parse(m))),
			rule.skip_if_followed_by.as_deref().map(|m| Guard::FollowedBy(Template::parse(m))),
			rule.skip_if_preceded_by.as_deref().map(|m| Guard::PrecededBy(Template::parse(m))),
		]
		.into_iter()
		.flatten()
		.collect();

		let templates = replace.iter().chain(guards.iter().map(Guard::template));
		for template in templates {
			if template.refers_to("value") && lookup.is_none() {
				return Err(invalid("$value is only available to rules with a table".to_string()));
			}
			if template.refers_to("listing") && listing.is_none() {
				return Err(invalid("$listing requires a listing".to_string()));
			}
		}

		let inner = rule
			.inner
			.iter()
			.map(|r| CompiledRule::compile(r, tables))
			.collect::<Result<Vec<_>>>()?;

		Ok(CompiledRule {
			name: rule.name.clone(),
			matcher,
			replace,
			count,
			lookup,
			defaults: rule.defaults.clone(),
			guards,
			inner,
			listing,
		})
	}
}

/// Render every entry of a table through the listing's entry template.
fn render_listing(rule: &str, listing: &Listing, tables: &Tables) -> Result<String> {
	let table = tables
		.get(&listing.table)
		.ok_or_else(|| ReditError::UnknownTable {
			rule: rule.to_string(),
			table: listing.table.clone(),
		})?;

	let entry = Template::parse(&listing.entry);
	let rendered: Vec<String> = table
		.iter()
		.map(|(key, value)| {
			entry.render(|name| match name {
				"key" => Some(key),
				"value" => Some(value),
				_ => None,
			})
		})
		.collect();

	Ok(rendered.join(&listing.separator))
}

/// Compile a regex pattern string.
pub fn compile_regex(pattern: &str) -> Result<Regex> {
	Regex::new(pattern).map_err(|source| ReditError::InvalidRegex {
		pattern: pattern.to_string(),
		source,
	})
}

/// Compile all rules in a config, in order.
pub fn compile_rules(config: &Config, tables: &Tables) -> Result<Vec<CompiledRule>> {
	config
		.rules
		.iter()
		.map(|rule| CompiledRule::compile(rule, tables))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::table::MappingTable;

	fn fields_tables() -> Tables {
		let mut tables = Tables::new();
		tables
			.add(
				"fields",
				[("a.b.c", "7_price"), ("d.e", "8_sqft")].into_iter().collect::<MappingTable>(),
			)
			.unwrap();
		tables
	}

	#[test]
	fn test_compile_valid_regex() {
		let result = compile_regex(r"renderDataField\(");
		assert!(result.is_ok());
	}

	#[test]
	fn test_compile_invalid_regex() {
		let result = compile_regex(r"[invalid");
		assert!(result.is_err());
		match result.unwrap_err() {
			ReditError::InvalidRegex { pattern, .. } => {
				assert_eq!(pattern, "[invalid");
			}
			_ => panic!("Expected InvalidRegex error"),
		}
	}

	#[test]
	fn test_literal_matches_are_non_overlapping() {
		let matcher = Matcher::literal("aa");
		let regions = matcher.find_all("aaaa a").unwrap();
		let spans: Vec<_> = regions.iter().map(|r| r.span.clone()).collect();
		assert_eq!(spans, vec![0..2, 2..4]);
	}

	#[test]
	fn test_regex_region_groups() {
		let matcher = Matcher::regex(compile_regex(r"call\((?P<key>[\w.]+)(, (\w+))?\)").unwrap());
		let regions = matcher.find_all("call(a.b) call(x, y)").unwrap();
		assert_eq!(regions.len(), 2);

		assert_eq!(regions[0].as_str(), "call(a.b)");
		assert_eq!(regions[0].get("key"), Some("a.b"));
		assert_eq!(regions[0].get("1"), Some("a.b"));
		assert_eq!(regions[0].get("3"), None);

		assert_eq!(regions[1].get("key"), Some("x"));
		assert_eq!(regions[1].get("3"), Some("y"));
		assert_eq!(regions[1].get("nope"), None);
		assert_eq!(regions[1].before(), "call(a.b) ");
	}

	#[test]
	fn test_block_region_spans_nested_braces() {
		let matcher = Matcher::block(compile_regex(r"outer\{").unwrap(), Delimiters::default());
		let text = "outer{ inner{ inner2{ } } }end";
		let regions = matcher.find_all(text).unwrap();

		assert_eq!(regions.len(), 1);
		assert_eq!(regions[0].as_str(), "outer{ inner{ inner2{ } } }");
		assert_eq!(regions[0].get("head"), Some("outer{"));
		assert_eq!(regions[0].get("body"), Some(" inner{ inner2{ } } "));
		assert_eq!(regions[0].get("tail"), Some("}"));
		assert_eq!(regions[0].after(), "end");
	}

	#[test]
	fn test_block_open_after_start() {
		let matcher = Matcher::block(
			compile_regex(r"function Chart\d+\(\)").unwrap(),
			Delimiters::default(),
		);
		let text = "function Chart1() { a { } }\nfunction Chart2() { b }";
		let regions = matcher.find_all(text).unwrap();

		assert_eq!(regions.len(), 2);
		assert_eq!(regions[0].get("head"), Some("function Chart1() {"));
		assert_eq!(regions[1].get("body"), Some(" b "));
	}

	#[test]
	fn test_block_unbalanced_is_scan_error() {
		let matcher = Matcher::block(compile_regex("start").unwrap(), Delimiters::default());
		let result = matcher.find_all("start { { }");
		assert!(matches!(result, Err(ScanError::Unclosed { .. })));
	}

	#[test]
	fn test_has_group() {
		let matcher = Matcher::regex(compile_regex(r"(a)(?P<name>b)").unwrap());
		assert!(matcher.has_group("0"));
		assert!(matcher.has_group("2"));
		assert!(!matcher.has_group("3"));
		assert!(matcher.has_group("name"));
		assert!(!matcher.has_group("key"));

		let block = Matcher::block(compile_regex("x").unwrap(), Delimiters::default());
		assert!(block.has_group("body"));
		assert!(!block.has_group("4"));
	}

	#[test]
	fn test_compile_sed_rule_sets_count() {
		let rule = Rule {
			name: "sed".to_string(),
			sed: Some("s/foo/bar/".to_string()),
			..Default::default()
		};
		let compiled = CompiledRule::compile(&rule, &Tables::new()).unwrap();
		assert_eq!(compiled.count, Count::First);
		assert!(compiled.replace.is_some());

		let rule = Rule {
			name: "sed-global".to_string(),
			sed: Some("s/foo/bar/g".to_string()),
			..Default::default()
		};
		let compiled = CompiledRule::compile(&rule, &Tables::new()).unwrap();
		assert_eq!(compiled.count, Count::All);
	}

	#[test]
	fn test_compile_unknown_table() {
		let rule = Rule {
			name: "lookup".to_string(),
			pattern: Some(r"call\((?P<key>[\w.]+)\)".to_string()),
			table: Some("missing".to_string()),
			replace: Some("$value".to_string()),
			..Default::default()
		};
		let result = CompiledRule::compile(&rule, &fields_tables());
		match result.unwrap_err() {
			ReditError::UnknownTable { rule, table } => {
				assert_eq!(rule, "lookup");
				assert_eq!(table, "missing");
			}
			_ => panic!("Expected UnknownTable error"),
		}
	}

	#[test]
	fn test_compile_key_group_must_exist() {
		let rule = Rule {
			name: "lookup".to_string(),
			pattern: Some(r"call\(([\w.]+)\)".to_string()),
			table: Some("fields".to_string()),
			replace: Some("$value".to_string()),
			..Default::default()
		};
		let result = CompiledRule::compile(&rule, &fields_tables());
		assert!(matches!(result, Err(ReditError::InvalidRule { .. })));
	}

	#[test]
	fn test_compile_value_requires_table() {
		let rule = Rule {
			name: "no-table".to_string(),
			find: Some("x".to_string()),
			replace: Some("$value".to_string()),
			..Default::default()
		};
		let result = CompiledRule::compile(&rule, &Tables::new());
		assert!(matches!(result, Err(ReditError::InvalidRule { .. })));
	}

	#[test]
	fn test_compile_listing() {
		let rule = Rule {
			name: "paths".to_string(),
			find: Some("PATHS".to_string()),
			replace: Some("{\n$listing\n}".to_string()),
			listing: Some(Listing {
				table: "fields".to_string(),
				entry: "  '$value': '$key',".to_string(),
				separator: "\n".to_string(),
			}),
			..Default::default()
		};
		let compiled = CompiledRule::compile(&rule, &fields_tables()).unwrap();
		assert_eq!(
			compiled.listing.as_deref(),
			Some("  '7_price': 'a.b.c',\n  '8_sqft': 'd.e',")
		);
	}

	#[test]
	fn test_compile_listing_unknown_table() {
		let rule = Rule {
			name: "paths".to_string(),
			find: Some("PATHS".to_string()),
			replace: Some("$listing".to_string()),
			listing: Some(Listing {
				table: "nope".to_string(),
				entry: "$key".to_string(),
				separator: "\n".to_string(),
			}),
			..Default::default()
		};
		let result = CompiledRule::compile(&rule, &fields_tables());
		assert!(matches!(result, Err(ReditError::UnknownTable { .. })));
	}

	#[test]
	fn test_guards() {
		let matcher = Matcher::literal("import a;");
		let regions = matcher.find_all("import a;\nimport m;").unwrap();
		let region = &regions[0];

		let followed = Guard::FollowedBy(Template::parse("\nimport m;"));
		assert!(followed.holds(region, |_| None));

		let preceded = Guard::PrecededBy(Template::parse("x"));
		assert!(!preceded.holds(region, |_| None));

		let contains = Guard::Contains(Template::parse("$value"));
		assert!(contains.holds(region, |n| (n == "value").then_some(" a")));
		// An empty marker never holds
		assert!(!contains.holds(region, |_| None));
	}
}
