//! delve CLI - content search, glob listing and fuzzy path lookup over one workspace.
//!
//! Results are written to stdout (plain text, or JSON with `--json`); logs go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use delve_config::DelveConfig;
use delve_tools::{SearchService, SearchSettings};
use delve_types::{EntryKind, FileEntry, Guarded, SafeError, SearchRequest};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "delve",
    version,
    about = "Search code with ripgrep: content, glob and fuzzy path lookup"
)]
struct Cli {
    /// Workspace root; every searched path must stay inside it (defaults to the current dir)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file to use instead of ~/.delve/config.toml
    #[arg(long, global = true, env = "DELVE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the structured result as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search file contents for a regex or literal pattern
    Grep(GrepArgs),
    /// List files matching a glob, newest first
    Glob {
        pattern: String,
        path: Option<String>,
    },
    /// Fuzzy-find files and folders by path
    Find {
        query: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct GrepArgs {
    pattern: String,
    /// File or directory to search, relative to the root
    path: Option<String>,
    /// Only search files matching this glob
    #[arg(long = "glob", short = 'g')]
    file_pattern: Option<String>,
    #[arg(long)]
    max_results: Option<usize>,
    /// Lines of context around each match
    #[arg(long, short = 'C')]
    context: Option<u32>,
    #[arg(long, short = 's', conflicts_with = "ignore_case")]
    case_sensitive: bool,
    #[arg(long, short = 'i')]
    ignore_case: bool,
    #[arg(long, short = 'F')]
    fixed_strings: bool,
    #[arg(long, short = 'v')]
    invert_match: bool,
    #[arg(long, short = 'w')]
    word_match: bool,
}

impl GrepArgs {
    fn into_request(self) -> SearchRequest {
        let mut request = SearchRequest::new(self.pattern)
            .with_fixed_strings(self.fixed_strings)
            .with_invert_match(self.invert_match)
            .with_word_match(self.word_match);
        if let Some(path) = self.path {
            request = request.with_path(path);
        }
        if let Some(glob) = self.file_pattern {
            request = request.with_file_pattern(glob);
        }
        if let Some(n) = self.max_results {
            request = request.with_max_results(n);
        }
        if let Some(n) = self.context {
            request = request.with_context(n);
        }
        // Neither flag: smart case.
        if self.case_sensitive {
            request = request.with_case_sensitive(true);
        } else if self.ignore_case {
            request = request.with_case_sensitive(false);
        }
        request
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Results go to stdout; logs must not interleave with them.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn load_settings(explicit: Option<&PathBuf>) -> Result<SearchSettings> {
    let config = match explicit {
        Some(path) => Some(DelveConfig::load_from(path)?),
        None => DelveConfig::load()?,
    };
    Ok(config.unwrap_or_default().to_settings())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref()).context("failed to load config")?;
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let service = SearchService::new(settings, &root)
        .with_context(|| format!("invalid workspace root {}", root.display()))?;

    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Glob { pattern, path } => {
            let result = service.glob(&pattern, path.as_deref()).await?;
            match result {
                Guarded::Found(listing) if cli.json => {
                    serde_json::to_writer_pretty(&mut stdout, &listing)?;
                    writeln!(stdout)?;
                }
                Guarded::Found(listing) => writeln!(stdout, "{}", listing.text())?,
                Guarded::Rejected(reason) => write_rejection(&mut stdout, &reason, cli.json)?,
            }
        }
        Command::Find { query, limit } => {
            let entries = service
                .fuzzy(query.as_deref().unwrap_or_default(), limit)
                .await?;
            if cli.json {
                serde_json::to_writer_pretty(&mut stdout, &entries)?;
                writeln!(stdout)?;
            } else {
                for entry in &entries {
                    writeln!(stdout, "{}", display_entry(entry))?;
                }
            }
        }
        Command::Grep(args) => {
            let request = args.into_request();
            let result = service.content(&request).await?;
            if cli.json {
                serde_json::to_writer_pretty(&mut stdout, &result)?;
                writeln!(stdout)?;
            } else {
                write!(stdout, "{}", result.output)?;
                if let Some(diagnostic) = &result.diagnostic {
                    eprintln!("{diagnostic}");
                }
            }
        }
    }
    stdout.flush()?;
    Ok(())
}

fn write_rejection(out: &mut impl Write, reason: &SafeError, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({ "error": reason.to_string() });
        serde_json::to_writer_pretty(&mut *out, &value)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{reason}")?;
    }
    Ok(())
}

fn display_entry(entry: &FileEntry) -> String {
    match entry.kind {
        EntryKind::Folder => format!("{}/", entry.path),
        EntryKind::File => entry.path.clone(),
    }
}
