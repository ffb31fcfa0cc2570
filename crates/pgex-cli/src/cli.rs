//! pg-explain - render PostgreSQL EXPLAIN ANALYZE output as an annotated tree
//!
//! ```text
//! psql -XqAt -c "EXPLAIN (ANALYZE, FORMAT JSON) SELECT ..." > plan.json
//! pg-explain plan.json
//! pg-explain --format json < plan.json
//! ```

mod config;
mod logging;
mod render;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use config::CliConfig;
use logging::LoggingConfig;
use pgex_analyzer::{QueryAnalyzer, parse_explain_json};
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "pg-explain",
    version,
    about = "Visualize PostgreSQL EXPLAIN ANALYZE JSON output as an annotated tree"
)]
struct Cli {
    /// File containing EXPLAIN (ANALYZE, FORMAT JSON) output; `-` or nothing reads stdin
    file: Option<PathBuf>,

    /// Same as FILE, kept for compatibility with existing scripts
    #[arg(long, value_name = "FILE", conflicts_with = "file")]
    json_input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Config file (TOML)
    #[arg(short, long, env = "PG_EXPLAIN_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write logs to stderr as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&LoggingConfig::from_verbosity(cli.verbose, cli.log_json)) {
        eprintln!("Warning: {err:#}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "pg-explain failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = CliConfig::resolve(cli.config.as_deref())?;

    let input = cli.json_input.as_deref().or(cli.file.as_deref());
    let raw = read_input(input)?;

    let plan = parse_explain_json(&raw).context("Parse error")?;
    let analysis = QueryAnalyzer::with_config(config.analyzer.clone()).analyze(&plan);

    let output = match cli.format {
        OutputFormat::Text => render::render_text(&plan, &analysis, &config.render),
        OutputFormat::Json => render::render_json(&plan, &analysis)?,
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}").context("Failed to write output")?;
    Ok(())
}

/// Reads the whole report from `path`, or from stdin for `None` / `-`
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => {
            tracing::debug!(path = %path.display(), "Reading EXPLAIN output from file");
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))
        }
        _ => {
            let stdin = std::io::stdin();
            let interactive = stdin.is_terminal();
            read_stdin(stdin.lock(), interactive)
        }
    }
}

/// Refuses to wait on a terminal: without a file or a pipe there is no report to read
fn read_stdin(mut reader: impl Read, interactive: bool) -> Result<String> {
    if interactive {
        anyhow::bail!("No input: pass a FILE or --json-input, or pipe EXPLAIN JSON on stdin");
    }

    tracing::debug!("Reading EXPLAIN output from stdin");
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .context("Failed to read stdin")?;
    Ok(raw)
}
