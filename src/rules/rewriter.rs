use crate::config::types::Count;
use crate::rules::matcher::{CompiledRule, Region};
use crate::rules::scanner::ScanError;
use crate::table::Tables;
use std::collections::BTreeMap;

/// What happened when a single rule ran over a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleReport {
	/// Rule name.
	pub name: String,

	/// Texts the rule ran over. Inner rules of a block whose every match
	/// was skipped never run.
	pub runs: usize,

	/// Matches that were rewritten.
	pub matches: usize,

	/// Matches left alone because they were already in the target shape.
	pub skipped: usize,

	/// Lookup keys with no mapping, in document order.
	pub misses: Vec<String>,

	/// Set when the rule could not run and was skipped entirely.
	pub malformed: Option<ScanError>,

	/// Reports of inner rules, summed over every block they ran in.
	pub inner: Vec<RuleReport>,
}

impl RuleReport {
	/// An empty report for a rule and its inner rules.
	pub fn for_rule(rule: &CompiledRule) -> Self {
		RuleReport {
			name: rule.name.clone(),
			inner: rule.inner.iter().map(RuleReport::for_rule).collect(),
			..Default::default()
		}
	}

	/// Whether the rule ran at least once.
	pub fn ran(&self) -> bool {
		self.runs > 0
	}

	/// Whether the rule ran but its matcher found nothing at all.
	pub fn matched_nothing(&self) -> bool {
		self.ran()
			&& self.matches == 0
			&& self.skipped == 0
			&& self.misses.is_empty()
			&& self.malformed.is_none()
	}

	/// Whether a human should look at this rule: nothing matched, a lookup
	/// missed, or the rule was skipped as malformed. Includes inner rules.
	/// A rule that never ran needs no attention.
	pub fn needs_attention(&self) -> bool {
		if !self.ran() {
			return false;
		}
		self.matched_nothing()
			|| !self.misses.is_empty()
			|| self.malformed.is_some()
			|| self.inner.iter().any(RuleReport::needs_attention)
	}

	/// Fold another run of the same rule into this report.
	fn absorb(&mut self, other: RuleReport) {
		self.runs += other.runs;
		self.matches += other.matches;
		self.skipped += other.skipped;
		self.misses.extend(other.misses);
		if self.malformed.is_none() {
			self.malformed = other.malformed;
		}
		for (mine, theirs) in self.inner.iter_mut().zip(other.inner) {
			mine.absorb(theirs);
		}
	}
}

/// Output of a rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
	/// The rewritten text.
	pub output: String,

	/// One report per rule, in rule order.
	pub applied: Vec<RuleReport>,
}

impl RewriteResult {
	/// Whether the output differs from the given source.
	pub fn changed(&self, source: &str) -> bool {
		self.output != source
	}

	/// Rewritten matches across all top-level rules.
	pub fn total_matches(&self) -> usize {
		self.applied.iter().map(|r| r.matches).sum()
	}
}

/// Apply an ordered rule set to a text.
///
/// Rules run strictly in order; each sees the output of the previous one.
/// The function is pure: no I/O, and the result depends only on the inputs.
pub fn rewrite(source: &str, rules: &[CompiledRule], tables: &Tables) -> RewriteResult {
	let mut text = source.to_string();
	let mut applied = Vec::with_capacity(rules.len());

	for rule in rules {
		let (output, report) = apply_rule(&text, rule, tables);
		if let Some(output) = output {
			text = output;
		}
		applied.push(report);
	}

	RewriteResult {
		output: text,
		applied,
	}
}

/// Outcome of substituting a single region.
enum Outcome {
	Replace(String),
	Skip,
	Miss(String),
}

/// Run one rule. Returns `None` as the text when nothing changed.
fn apply_rule(text: &str, rule: &CompiledRule, tables: &Tables) -> (Option<String>, RuleReport) {
	let mut report = RuleReport::for_rule(rule);
	report.runs = 1;

	let regions = match rule.matcher.find_all(text) {
		Ok(regions) => regions,
		Err(e) => {
			tracing::warn!(rule = %rule.name, error = %e, "skipping rule: malformed input");
			report.malformed = Some(e);
			return (None, report);
		}
	};

	let limit = match rule.count {
		Count::All => regions.len(),
		Count::First => 1,
	};

	let mut output = String::with_capacity(text.len());
	let mut last = 0;

	for region in regions.iter().take(limit) {
		match substitute(rule, region, tables, &mut report) {
			Outcome::Replace(replacement) => {
				output.push_str(&text[last..region.span.start]);
				output.push_str(&replacement);
				last = region.span.end;
				report.matches += 1;
			}
			Outcome::Skip => report.skipped += 1,
			Outcome::Miss(key) => {
				tracing::debug!(rule = %rule.name, key = %key, "no mapping for key");
				report.misses.push(key);
			}
		}
	}

	tracing::debug!(
		rule = %rule.name,
		matches = report.matches,
		skipped = report.skipped,
		misses = report.misses.len(),
		"applied rule"
	);

	if report.matches == 0 {
		return (None, report);
	}
	output.push_str(&text[last..]);
	(Some(output), report)
}

/// Values templates of a single match can refer to.
struct Bindings<'a> {
	region: &'a Region<'a>,
	value: Option<&'a str>,
	listing: Option<&'a str>,
	body: Option<&'a str>,
	defaults: &'a BTreeMap<String, String>,
}

impl<'a> Bindings<'a> {
	fn resolve(&self, name: &str) -> Option<&'a str> {
		match name {
			"value" if self.value.is_some() => self.value,
			"listing" if self.listing.is_some() => self.listing,
			"body" if self.body.is_some() => self.body,
			_ => self
				.region
				.get(name)
				.or_else(|| self.defaults.get(name).map(String::as_str)),
		}
	}
}

fn substitute(
	rule: &CompiledRule,
	region: &Region,
	tables: &Tables,
	report: &mut RuleReport,
) -> Outcome {
	let value = match rule.lookup {
		Some(ref lookup) => {
			let key = region
				.get(&lookup.key)
				.or_else(|| rule.defaults.get(&lookup.key).map(String::as_str))
				.unwrap_or("");
			match tables.get(&lookup.table).and_then(|t| t.get(key)) {
				Some(value) => Some(value),
				None => return Outcome::Miss(key.to_string()),
			}
		}
		None => None,
	};

	let mut bindings = Bindings {
		region,
		value,
		listing: rule.listing.as_deref(),
		body: None,
		defaults: &rule.defaults,
	};

	if rule
		.guards
		.iter()
		.any(|guard| guard.holds(region, |name| bindings.resolve(name)))
	{
		return Outcome::Skip;
	}

	// Inner rules only ever see the block body.
	let rewritten_body = if rule.inner.is_empty() {
		None
	} else {
		let body = region.get("body").unwrap_or("");
		let result = rewrite(body, &rule.inner, tables);
		for (mine, theirs) in report.inner.iter_mut().zip(result.applied) {
			mine.absorb(theirs);
		}
		Some(result.output)
	};
	bindings.body = rewritten_body.as_deref();

	let replacement = match rule.replace {
		Some(ref template) => template.render(|name| bindings.resolve(name)),
		None => [
			region.get("head").unwrap_or(""),
			bindings.body.unwrap_or(""),
			region.get("tail").unwrap_or(""),
		]
		.concat(),
	};

	if replacement == region.as_str() {
		Outcome::Skip
	} else {
		Outcome::Replace(replacement)
	}
}
