use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use redit_cli::config::{CONFIG_FILE_NAME, LoadedConfig, generate_init_template, resolve_config};
use redit_cli::document::Document;
use redit_cli::rules::{CompiledRule, RewriteResult, RuleReport, compile_rules};
use redit_cli::table::{Tables, load_tables};

#[derive(Parser)]
#[command(name = "redit")]
#[command(
	author,
	version,
	about = "CLI tool for pattern-driven source rewrites with mapping tables"
)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Rule file to use instead of the nearest .redit.toml
	#[arg(long, short = 'c', value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Create a template .redit.toml in the current directory
	#[arg(long)]
	init: bool,

	/// Overwrite existing .redit.toml when using --init
	#[arg(long, requires = "init")]
	force: bool,

	/// Report what would change without writing anything
	#[arg(long)]
	dry_run: bool,

	/// Print rewritten documents to stdout instead of writing them
	#[arg(long)]
	stdout: bool,

	/// Exit with failure if any document would change; never writes
	#[arg(long)]
	check: bool,

	/// Exit with failure if any rule matched nothing, missed a mapping or was malformed
	#[arg(long)]
	strict: bool,

	/// Log each rule as it runs (overrides REDIT_LOG)
	#[arg(long, short = 'v', global = true)]
	verbose: bool,

	/// Documents to rewrite (defaults to `files` in the rule file)
	files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
	/// Rule file management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the rule file, its tables and rules
	Show,
	/// Check the rule file, its tables and rules without rewriting anything
	Validate,
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	// Handle --init
	if cli.init {
		return handle_init(cli.force);
	}

	// Handle subcommands
	if let Some(ref command) = cli.command {
		return match command {
			Commands::Config { action } => match action {
				ConfigAction::Show => handle_config_show(cli.config.as_deref()),
				ConfigAction::Validate => handle_config_validate(cli.config.as_deref()),
			},
		};
	}

	handle_rewrite(&cli)
}

fn init_tracing(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_env("REDIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let config_path = PathBuf::from(CONFIG_FILE_NAME);

	if config_path.exists() && !force {
		anyhow::bail!("{CONFIG_FILE_NAME} already exists. Use --force to overwrite.");
	}

	let template = generate_init_template();
	std::fs::write(&config_path, template)
		.with_context(|| format!("Failed to write {}", config_path.display()))?;

	println!("Created {CONFIG_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

/// Load the rule file, its tables, and compile its rules.
fn load_rule_set(explicit: Option<&Path>) -> Result<(LoadedConfig, Tables, Vec<CompiledRule>)> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let loaded = resolve_config(explicit, &cwd).context("Failed to load rule file")?;
	let tables = load_tables(&loaded)
		.with_context(|| format!("Failed to load tables for {}", loaded.path.display()))?;
	let rules = compile_rules(&loaded.config, &tables)
		.with_context(|| format!("Failed to compile rules in {}", loaded.path.display()))?;
	Ok((loaded, tables, rules))
}

fn handle_config_show(explicit: Option<&Path>) -> Result<ExitCode> {
	let (loaded, tables, _) = load_rule_set(explicit)?;
	let config = &loaded.config;

	println!("# Source: {}", loaded.path.display());
	println!("# files: {}", config.files.len());
	for file in loaded.target_files() {
		println!("#   {}", file.display());
	}
	println!("# tables: {}", tables.names().len());
	for name in tables.names() {
		if let Some(table) = tables.get(name) {
			println!("#   {} ({} entries)", name, table.len());
		}
	}
	println!("# rules: {}", config.rules.len());
	println!();

	for (i, rule) in config.rules.iter().enumerate() {
		println!("  Rule {}: {}", i + 1, rule.name);
		print!("{}", describe_rule(rule, "    "));
		println!();
	}

	Ok(ExitCode::SUCCESS)
}

fn describe_rule(rule: &redit_cli::config::Rule, indent: &str) -> String {
	let mut out = String::new();
	let fields = [
		("find", rule.find.as_deref()),
		("pattern", rule.pattern.as_deref()),
		("sed", rule.sed.as_deref()),
		("block_start", rule.block_start.as_deref()),
		("open", rule.open.as_deref()),
		("close", rule.close.as_deref()),
		("replace", rule.replace.as_deref()),
		("table", rule.table.as_deref()),
		("key", rule.key.as_deref()),
		("skip_if_contains", rule.skip_if_contains.as_deref()),
		("skip_if_followed_by", rule.skip_if_followed_by.as_deref()),
		("skip_if_preceded_by", rule.skip_if_preceded_by.as_deref()),
	];
	for (name, value) in fields {
		if let Some(value) = value {
			let _ = writeln!(out, "{indent}{name}: {value:?}");
		}
	}
	let _ = writeln!(out, "{indent}count: {:?}", rule.count);
	for (group, default) in &rule.defaults {
		let _ = writeln!(out, "{indent}default ${group}: {default:?}");
	}
	if let Some(ref listing) = rule.listing {
		let _ = writeln!(out, "{indent}listing: table {} entry {:?}", listing.table, listing.entry);
	}
	for inner in &rule.inner {
		let _ = writeln!(out, "{indent}inner rule: {}", inner.name);
		out.push_str(&describe_rule(inner, &format!("{indent}  ")));
	}
	out
}

fn handle_config_validate(explicit: Option<&Path>) -> Result<ExitCode> {
	match load_rule_set(explicit) {
		Ok((loaded, tables, rules)) => {
			println!(
				"Rule file is valid: {} ({} rules, {} tables)",
				loaded.path.display(),
				rules.len(),
				tables.names().len()
			);
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {e:#}");
			Ok(ExitCode::FAILURE)
		}
	}
}

fn handle_rewrite(cli: &Cli) -> Result<ExitCode> {
	let (loaded, tables, rules) = load_rule_set(cli.config.as_deref())?;

	if rules.is_empty() {
		eprintln!("warning: {} has no rules", loaded.path.display());
	}

	let files = if cli.files.is_empty() {
		loaded.target_files()
	} else {
		cli.files.clone()
	};
	if files.is_empty() {
		anyhow::bail!(
			"No documents to rewrite: pass FILES or set `files` in {}",
			loaded.path.display()
		);
	}

	let write = !(cli.dry_run || cli.check || cli.stdout);
	let mut would_change = false;
	let mut needs_attention = false;
	let mut failed = false;

	for path in &files {
		match rewrite_document(cli, path, &rules, &tables, write) {
			Ok(outcome) => {
				would_change |= outcome.changed;
				needs_attention |= outcome.needs_attention;
			}
			Err(e) => {
				// One bad document must not stop the others.
				if cli.stdout {
					eprintln!("{}: error", path.display());
				} else {
					println!("{}: error", path.display());
				}
				eprintln!("error: {e:#}");
				failed = true;
			}
		}
	}

	if failed {
		return Ok(ExitCode::FAILURE);
	}
	if cli.check && would_change {
		return Ok(ExitCode::FAILURE);
	}
	if cli.strict && needs_attention {
		return Ok(ExitCode::FAILURE);
	}
	Ok(ExitCode::SUCCESS)
}

/// What rewriting one document found.
struct DocumentOutcome {
	changed: bool,
	needs_attention: bool,
}

/// Read, rewrite, report and (when `write`) persist a single document.
fn rewrite_document(
	cli: &Cli,
	path: &Path,
	rules: &[CompiledRule],
	tables: &Tables,
	write: bool,
) -> Result<DocumentOutcome> {
	let doc = Document::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
	let result = doc.rewrite(rules, tables);
	let changed = result.changed(&doc.source);

	let status = match (changed, write) {
		(false, _) => "unchanged",
		(true, true) => "written",
		(true, false) => "would change",
	};
	let report = format_report(&doc.path, &result, status);

	if write {
		doc.persist(&result)
			.with_context(|| format!("Failed to write {}", doc.path.display()))?;
	}

	if cli.stdout {
		print!("{}", result.output);
		eprint!("{report}");
	} else {
		print!("{report}");
	}

	Ok(DocumentOutcome {
		changed,
		needs_attention: result.applied.iter().any(RuleReport::needs_attention),
	})
}

/// Per-document audit: every rule, how often it fired, and anything a human should check.
fn format_report(path: &Path, result: &RewriteResult, status: &str) -> String {
	let mut out = String::new();
	let _ = writeln!(
		out,
		"{}: {} ({} matches)",
		path.display(),
		status,
		result.total_matches()
	);
	for report in &result.applied {
		format_rule_report(&mut out, report, 1);
	}
	out
}

fn format_rule_report(out: &mut String, report: &RuleReport, depth: usize) {
	let indent = "  ".repeat(depth);

	let summary = if !report.ran() {
		"not run".to_string()
	} else if let Some(ref e) = report.malformed {
		format!("skipped, malformed input: {e}")
	} else if report.matched_nothing() {
		"warning: no match".to_string()
	} else {
		let mut parts = vec![plural(report.matches, "match", "matches")];
		if report.skipped > 0 {
			parts.push(format!("{} already applied", report.skipped));
		}
		if !report.misses.is_empty() {
			parts.push(plural(report.misses.len(), "mapping miss", "mapping misses"));
		}
		parts.join(", ")
	};
	let _ = writeln!(out, "{indent}{}: {summary}", report.name);

	for key in &report.misses {
		let _ = writeln!(out, "{indent}  miss: {key}");
	}
	for inner in &report.inner {
		format_rule_report(out, inner, depth + 1);
	}
}

fn plural(n: usize, one: &str, many: &str) -> String {
	if n == 1 {
		format!("{n} {one}")
	} else {
		format!("{n} {many}")
	}
}
