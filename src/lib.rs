//! Redit - CLI tool for pattern-driven source rewrites.
//!
//! This library provides the core functionality for redit, including:
//! - Rule file parsing and discovery
//! - Mapping tables loaded from configuration data
//! - Literal, regex, sed-like and depth-aware block rewrite rules
//! - Document reading and change-only writing
//!
//! # Example
//!
//! ```no_run
//! use redit_cli::config::resolve_config;
//! use redit_cli::document::Document;
//! use redit_cli::rules::compile_rules;
//! use redit_cli::table::load_tables;
//! use std::path::Path;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let loaded = resolve_config(None, &cwd).unwrap();
//! let tables = load_tables(&loaded).unwrap();
//! let rules = compile_rules(&loaded.config, &tables).unwrap();
//!
//! let doc = Document::read(Path::new("src/pages/PropertyDetail.tsx")).unwrap();
//! let result = doc.rewrite(&rules, &tables);
//! for report in &result.applied {
//!     println!("{}: {} matches", report.name, report.matches);
//! }
//! doc.persist(&result).unwrap();
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod rules;
pub mod table;

pub use error::{ReditError, Result};
