//! Rule compilation and rewriting for redit.
//!
//! This module handles:
//! - Literal, regex, sed-like and depth-aware block matchers
//! - Replacement templates with capture and table references
//! - The pure `rewrite` pass and its per-rule reports

pub mod matcher;
pub mod rewriter;
pub mod scanner;
pub mod sed;
pub mod template;

pub use matcher::{CompiledRule, Guard, Lookup, Matcher, Region, compile_regex, compile_rules};
pub use rewriter::{RewriteResult, RuleReport, rewrite};
pub use scanner::{Block, Delimiters, ScanError};
pub use sed::Substitution;
pub use template::Template;
