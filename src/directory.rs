//! Symbol directory retrieval and caching
//!
//! A [`DirectorySource`] performs the bulk retrieval. [`DirectoryCache`] owns the
//! current snapshot and tracks exactly one in-flight retrieval at a time:
//! starting a new retrieval cancels the previous one, and any outcome that
//! arrives for a superseded retrieval is discarded.
//!
//! # Lifecycle
//!
//! ```text
//! fetch()            -> loading=true, error=None, generation += 1, task spawned
//! task finishes      -> FetchOutcome { generation, result } sent to the owner
//! complete(outcome)  -> stale generation: ignored
//!                       Completed(Ok)    : snapshot replaced, loading=false
//!                       Completed(Err)   : error set, snapshot kept, loading=false
//!                       Cancelled        : loading=false, no error
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ProviderConfig;
use crate::models::{Directory, RetrievalStatus, SymbolRecord};

/// Something that can list every symbol on an exchange
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Retrieve the full symbol list
    ///
    /// Dropping the returned future must abort any underlying I/O.
    async fn fetch(&self) -> Result<Vec<SymbolRecord>>;

    /// Source name (for logging)
    fn name(&self) -> &str;
}

/// Finnhub-compatible HTTP symbol provider
///
/// Issues `GET {endpoint}?exchange={exchange}&token={token}` and expects a
/// JSON array of symbol records.
pub struct FinnhubSource {
    client: reqwest::Client,
    endpoint: String,
    exchange: String,
    token: String,
}

impl FinnhubSource {
    pub fn new(
        endpoint: impl Into<String>,
        exchange: impl Into<String>,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            endpoint: endpoint.into(),
            exchange: exchange.into(),
            token: token.into(),
        })
    }

    /// Build from provider config, resolving the token from config or environment
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        Self::new(
            config.endpoint.clone(),
            config.exchange.clone(),
            token,
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl DirectorySource for FinnhubSource {
    async fn fetch(&self) -> Result<Vec<SymbolRecord>> {
        log::debug!("Requesting symbol directory for exchange {}", self.exchange);

        // without_url() keeps the token out of error messages
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("exchange", self.exchange.as_str()), ("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to send request to symbol provider")?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let error_text = error_text.trim();
            if error_text.is_empty() {
                anyhow::bail!("HTTP error! status: {}", status);
            }
            anyhow::bail!("HTTP error! status: {} ({})", status, error_text);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to parse symbol provider response as JSON")?;

        let (records, skipped) = SymbolRecord::parse_list(body)?;
        if skipped > 0 {
            log::warn!("Skipped {} malformed symbol records from {}", skipped, self.name());
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        "finnhub"
    }
}

/// Reads a previously saved provider response from disk
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DirectorySource for JsonFileSource {
    async fn fetch(&self) -> Result<Vec<SymbolRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read symbol file {}", self.path.display()))?;

        let body: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse symbol file {}", self.path.display()))?;

        let (records, skipped) = SymbolRecord::parse_list(body)?;
        if skipped > 0 {
            log::warn!("Skipped {} malformed symbol records in {}", skipped, self.path.display());
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// How a retrieval task ended
#[derive(Debug)]
pub enum FetchResult {
    Completed(Result<Vec<SymbolRecord>>),
    /// Superseded or torn down before the source answered
    Cancelled,
}

/// Message from a retrieval task back to its cache
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub result: FetchResult,
}

/// What applying an outcome did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A new snapshot replaced the old one
    Replaced,
    /// The retrieval failed; the old snapshot is kept
    Failed,
    /// The retrieval was cancelled; nothing changed
    Cancelled,
    /// Outcome belonged to a superseded retrieval and was discarded
    Stale,
}

/// Cancellable handle to the in-flight retrieval task
struct FetchHandle {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl FetchHandle {
    fn cancel(&self) {
        self.token.cancel();
    }
}

/// Current directory snapshot plus the state of its retrieval
pub struct DirectoryCache {
    source: Arc<dyn DirectorySource>,
    directory: Arc<Directory>,
    status: RetrievalStatus,
    generation: u64,
    in_flight: Option<FetchHandle>,
    outcomes: mpsc::UnboundedSender<FetchOutcome>,
}

impl DirectoryCache {
    /// Create an empty cache
    ///
    /// Retrieval outcomes are delivered on the returned receiver and must be
    /// handed back through [`DirectoryCache::complete`].
    pub fn new(source: Arc<dyn DirectorySource>) -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = Self {
            source,
            directory: Arc::new(Directory::empty()),
            status: RetrievalStatus::default(),
            generation: 0,
            in_flight: None,
            outcomes: tx,
        };
        (cache, rx)
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    pub fn status(&self) -> &RetrievalStatus {
        &self.status
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a retrieval, cancelling any retrieval still in flight
    ///
    /// Must be called from within a tokio runtime. Returns the generation of
    /// the new retrieval.
    pub fn fetch(&mut self) -> u64 {
        if let Some(previous) = self.in_flight.take() {
            log::debug!("Cancelling superseded retrieval #{}", previous.generation);
            previous.cancel();
        }

        self.generation += 1;
        self.status = RetrievalStatus {
            loading: true,
            error: None,
        };

        let generation = self.generation;
        let token = CancellationToken::new();
        let source = Arc::clone(&self.source);
        let outcomes = self.outcomes.clone();
        let task_token = token.clone();

        log::info!("Starting symbol retrieval #{} from {}", generation, source.name());

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = task_token.cancelled() => FetchResult::Cancelled,
                result = source.fetch() => FetchResult::Completed(result),
            };
            // Receiver gone means the owner was torn down
            let _ = outcomes.send(FetchOutcome { generation, result });
        });

        self.in_flight = Some(FetchHandle {
            generation,
            token,
            task,
        });

        generation
    }

    /// Apply a retrieval outcome
    pub fn complete(&mut self, outcome: FetchOutcome) -> Completion {
        if outcome.generation != self.generation {
            log::debug!(
                "Discarding outcome of superseded retrieval #{} (current #{})",
                outcome.generation,
                self.generation
            );
            return Completion::Stale;
        }

        self.in_flight = None;
        self.status.loading = false;

        match outcome.result {
            FetchResult::Completed(Ok(records)) => {
                let directory = Directory::from_records(records);
                log::info!(
                    "Symbol retrieval #{} loaded {} symbols",
                    outcome.generation,
                    directory.len()
                );
                self.directory = Arc::new(directory);
                self.status.error = None;
                Completion::Replaced
            }
            FetchResult::Completed(Err(e)) => {
                log::warn!("Symbol retrieval #{} failed: {:#}", outcome.generation, e);
                self.status.error = Some(format!("Error fetching symbols: {:#}", e));
                Completion::Failed
            }
            FetchResult::Cancelled => {
                log::debug!("Symbol retrieval #{} cancelled", outcome.generation);
                Completion::Cancelled
            }
        }
    }

    /// Cancel the in-flight retrieval, if any
    ///
    /// Its outcome will be reported as stale. The snapshot and error are kept.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            log::debug!("Cancelling retrieval #{}", handle.generation);
            handle.cancel();
            // Bump so a completion racing the cancel cannot land
            self.generation += 1;
        }
        self.status.loading = false;
    }
}

impl Drop for DirectoryCache {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.cancel();
            handle.task.abort();
        }
    }
}
