/// A piece of a parsed replacement template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
	Literal(String),
	Ref(String),
}

/// Replacement template using regex-style references.
///
/// `$1`, `$name` and `${name}` refer to capture groups or reserved names;
/// `$$` is a literal dollar sign. A `$` that starts no valid reference is
/// kept as-is. `$name` takes the longest run of `[_0-9A-Za-z]`, so use
/// `${name}` when the reference is followed by a word character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	pieces: Vec<Piece>,
}

impl Template {
	/// Parse a template string. Parsing never fails.
	pub fn parse(input: &str) -> Self {
		let mut pieces = Vec::new();
		let mut literal = String::new();
		let mut rest = input;

		while let Some(pos) = rest.find('$') {
			literal.push_str(&rest[..pos]);
			let after = &rest[pos + 1..];

			if let Some(stripped) = after.strip_prefix('$') {
				literal.push('$');
				rest = stripped;
				continue;
			}

			let reference = if let Some(braced) = after.strip_prefix('{') {
				braced
					.find('}')
					.filter(|&end| end > 0)
					.map(|end| (&braced[..end], &braced[end + 1..]))
			} else {
				let len = after
					.find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
					.unwrap_or(after.len());
				(len > 0).then(|| (&after[..len], &after[len..]))
			};

			match reference {
				Some((name, remainder)) => {
					if !literal.is_empty() {
						pieces.push(Piece::Literal(std::mem::take(&mut literal)));
					}
					pieces.push(Piece::Ref(name.to_string()));
					rest = remainder;
				}
				None => {
					literal.push('$');
					rest = after;
				}
			}
		}

		literal.push_str(rest);
		if !literal.is_empty() {
			pieces.push(Piece::Literal(literal));
		}

		Template { pieces }
	}

	/// Render the template. References `resolve` can't answer expand to nothing.
	pub fn render<'v>(&self, resolve: impl Fn(&str) -> Option<&'v str>) -> String {
		let mut out = String::new();
		for piece in &self.pieces {
			match piece {
				Piece::Literal(text) => out.push_str(text),
				Piece::Ref(name) => out.push_str(resolve(name).unwrap_or("")),
			}
		}
		out
	}

	/// Names this template refers to, in order of appearance.
	pub fn references(&self) -> impl Iterator<Item = &str> {
		self.pieces.iter().filter_map(|piece| match piece {
			Piece::Ref(name) => Some(name.as_str()),
			Piece::Literal(_) => None,
		})
	}

	/// Whether the template refers to `name`.
	pub fn refers_to(&self, name: &str) -> bool {
		self.references().any(|r| r == name)
	}
}
