//! Depth-aware scanning for balanced blocks.
//!
//! Regexes can't follow nesting, so block matchers locate their closing
//! delimiter by counting opening and closing delimiters instead.

use std::ops::Range;

/// Why a balanced block couldn't be located.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
	#[error("no opening {open:?} after offset {offset}")]
	MissingOpen { open: String, offset: usize },

	#[error("unbalanced {open:?}/{close:?}: block opened at offset {offset} is still {depth} deep at end of text")]
	Unclosed {
		open: String,
		close: String,
		offset: usize,
		depth: usize,
	},
}

/// Opening and closing delimiters of a block. Either may be several characters long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
	pub open: String,
	pub close: String,
}

impl Default for Delimiters {
	fn default() -> Self {
		Delimiters {
			open: "{".to_string(),
			close: "}".to_string(),
		}
	}
}

/// Location of a balanced block's delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	/// The opening delimiter.
	pub open: Range<usize>,

	/// The matching closing delimiter at the same depth.
	pub close: Range<usize>,
}

impl Block {
	/// Text strictly between the delimiters.
	pub fn body(&self) -> Range<usize> {
		self.open.end..self.close.start
	}
}

/// Find the first opening delimiter at or after `from` and its matching close.
pub fn find_block(text: &str, from: usize, delimiters: &Delimiters) -> Result<Block, ScanError> {
	let open_start = text[from..]
		.find(delimiters.open.as_str())
		.map(|i| from + i)
		.ok_or_else(|| ScanError::MissingOpen {
			open: delimiters.open.clone(),
			offset: from,
		})?;

	match_close(text, open_start, delimiters)
}

/// Given an opening delimiter at `open_start`, find its closing delimiter.
pub fn match_close(
	text: &str,
	open_start: usize,
	delimiters: &Delimiters,
) -> Result<Block, ScanError> {
	let open = delimiters.open.as_str();
	let close = delimiters.close.as_str();
	let mut depth = 0usize;
	let mut i = open_start;

	while i < text.len() {
		let rest = &text[i..];
		if rest.starts_with(open) {
			depth += 1;
			i += open.len();
		} else if rest.starts_with(close) {
			depth -= 1;
			if depth == 0 {
				return Ok(Block {
					open: open_start..open_start + open.len(),
					close: i..i + close.len(),
				});
			}
			i += close.len();
		} else {
			i += rest.chars().next().map_or(1, char::len_utf8);
		}
	}

	Err(ScanError::Unclosed {
		open: open.to_string(),
		close: close.to_string(),
		offset: open_start,
		depth,
	})
}
