//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{self, Config};
use crate::directory::{DirectorySource, FinnhubSource, JsonFileSource};
use crate::output;
use crate::pipeline::SearchPipeline;

/// Stockfind: fuzzy search over an exchange's stock symbols
#[derive(Parser, Debug)]
#[command(
    name = "stockfind",
    version,
    about = "Fuzzy search over an exchange's stock symbol directory",
    long_about = "Stockfind downloads the full symbol directory of an exchange once and \
                  answers typo-tolerant searches over ticker symbols and company names.\n\n\
                  Run 'stockfind' with no arguments to launch interactive mode."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to ~/.stockfind/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Load symbols from a saved JSON response instead of the provider
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Exchange code to list symbols for (overrides config)
    #[arg(long, global = true, value_name = "CODE")]
    pub exchange: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the symbol directory once and print the matches
    ///
    /// Examples:
    ///   stockfind search apple
    ///   stockfind search APL --limit 5
    ///   stockfind search micro --json --pretty
    Search {
        /// Partial symbol or company name
        query: String,

        /// Maximum number of results (defaults to result_limit from config)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Search as you type (default when no command is given)
    ///
    /// Keys: Up/Down move, Enter selects, Tab switches between results and
    /// selection, Ctrl+X removes the highlighted selection,
    /// Ctrl+R refreshes the directory, Esc quits. Selected symbols are printed
    /// on exit.
    Interactive {
        /// Print the selection as JSON on exit
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",   // Default: only warnings and errors
            1 => "info",   // -v: show info messages
            2 => "debug",  // -vv: show debug messages
            _ => "trace",  // -vvv: show trace messages
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let mut config = config::load_config(self.config.as_deref())?;
        if let Some(exchange) = self.exchange {
            config.provider.exchange = exchange;
            config.validate()?;
        }

        match self.command {
            None => handle_interactive(config, self.file, false),
            Some(Command::Interactive { json }) => handle_interactive(config, self.file, json),
            Some(Command::Search { query, limit, json, pretty }) => {
                handle_search(config, self.file, query, limit, json, pretty)
            }
            Some(Command::Config) => handle_config(&config),
        }
    }
}

/// Current-thread runtime that drives the pipeline task
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")
}

fn build_source(config: &Config, file: Option<PathBuf>) -> Result<Arc<dyn DirectorySource>> {
    match file {
        Some(path) => {
            log::info!("Loading symbols from {}", path.display());
            Ok(Arc::new(JsonFileSource::new(path)))
        }
        None => Ok(Arc::new(FinnhubSource::from_config(&config.provider)?)),
    }
}

/// Handle the `search` subcommand
fn handle_search(
    config: Config,
    file: Option<PathBuf>,
    query: String,
    limit: Option<usize>,
    as_json: bool,
    pretty_json: bool,
) -> Result<()> {
    log::info!("Starting search command");

    let mut search_config = config.search.clone();
    if query.is_empty() || query.trim().chars().count() < search_config.min_query_len {
        anyhow::bail!(
            "Query must be at least {} characters long. Got: {:?}",
            search_config.min_query_len,
            query
        );
    }
    if let Some(limit) = limit {
        if limit == 0 {
            anyhow::bail!("--limit must be greater than 0");
        }
        search_config.result_limit = limit;
    }
    // One-shot input has nothing to debounce
    search_config.debounce_ms = 0;
    search_config.auto_fetch = true;

    let source = build_source(&config, file)?;
    let start = Instant::now();

    let results = runtime()?.block_on(async move {
        let pipeline = SearchPipeline::spawn(search_config, source);

        let loaded = pipeline
            .wait_for(|v| !v.loading && (v.fetched_at.is_some() || v.error.is_some()))
            .await?;
        if let Some(error) = loaded.error {
            anyhow::bail!(error);
        }
        log::info!("Directory loaded with {} symbols", loaded.directory_len);

        pipeline.set_query(query);
        let view = pipeline.wait_for(|v| v.searches_run > 0).await?;
        pipeline.shutdown();

        Ok::<_, anyhow::Error>(view.results.to_vec())
    })?;

    log::info!("Search completed in {:?}", start.elapsed());

    if as_json {
        output::json(&results, pretty_json)?;
    } else if results.is_empty() {
        output::warn("No matching symbols found.");
    } else {
        output::entries(&results);
    }

    Ok(())
}

/// Handle interactive mode (default when no command is given)
fn handle_interactive(config: Config, file: Option<PathBuf>, as_json: bool) -> Result<()> {
    log::info!("Launching interactive mode");

    let source = build_source(&config, file)?;
    let search_config = config.search.clone();

    let selection = runtime()?.block_on(async move {
        let pipeline = SearchPipeline::spawn(search_config, source);
        let selection = crate::interactive::run_interactive(pipeline.clone()).await;
        pipeline.shutdown();
        selection
    })?;

    if as_json {
        output::json(&selection, false)?;
    } else if !selection.is_empty() {
        println!("{}", "Selected stocks:".bold());
        output::entries(&selection);
    }

    Ok(())
}

/// Handle the `config` subcommand
fn handle_config(config: &Config) -> Result<()> {
    if let Some(path) = config::default_config_path() {
        let state = if path.exists() { "found" } else { "not found, using defaults" };
        println!("# {} ({})", path.display(), state);
    }
    print!("{}", config.to_redacted_toml()?);
    Ok(())
}
