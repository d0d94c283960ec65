//! Query pipeline coordinator
//!
//! One task owns every piece of pipeline state and reacts to three inputs:
//!
//! - commands from [`PipelineHandle`] (`set_query`, `refresh_directory`, `shutdown`)
//! - the debounce deadline of the current query
//! - outcomes of directory retrievals
//!
//! ```text
//!   set_query ──> Debouncer ──(quiet period)──> search MatchIndex ──┐
//!                                                                   ├──> PipelineView (watch)
//!   refresh ────> DirectoryCache ──(outcome)──> rebuild MatchIndex ─┘
//! ```
//!
//! Every transition is handled to completion before the next one starts, and
//! the resulting [`PipelineView`] is published as a fresh immutable snapshot.
//! Readers never see a half-updated view or a partially built index.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::SearchConfig;
use crate::debounce::Debouncer;
use crate::directory::{Completion, DirectoryCache, DirectorySource, FetchOutcome};
use crate::index::MatchIndex;
use crate::models::{DirectoryEntry, PipelineView};

#[derive(Debug)]
enum Command {
    SetQuery(String),
    Refresh,
    Shutdown,
}

/// Cloneable handle to a running pipeline
///
/// The pipeline stops when [`PipelineHandle::shutdown`] is called or when the
/// last handle is dropped. Stopping cancels any pending debounce and any
/// in-flight retrieval.
#[derive(Clone)]
pub struct PipelineHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<PipelineView>,
}

impl PipelineHandle {
    /// Replace the raw query; results follow after the debounce delay
    pub fn set_query(&self, query: impl Into<String>) {
        self.send(Command::SetQuery(query.into()));
    }

    /// Start a new directory retrieval, superseding any in flight
    pub fn refresh_directory(&self) {
        self.send(Command::Refresh);
    }

    /// Stop the pipeline
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Latest published view
    pub fn view(&self) -> PipelineView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every published view
    pub fn subscribe(&self) -> watch::Receiver<PipelineView> {
        self.view.clone()
    }

    /// Wait until a published view satisfies `predicate`
    ///
    /// Fails if the pipeline stops first.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&PipelineView) -> bool) -> Result<PipelineView> {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_| anyhow::anyhow!("Search pipeline stopped"))?;
        Ok(view.clone())
    }

    /// Wait until the pipeline task has exited
    pub async fn closed(&self) {
        self.commands.closed().await
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::debug!("Search pipeline already stopped, command dropped");
        }
    }
}

/// The coordinator task and its state cells
pub struct SearchPipeline {
    config: SearchConfig,
    /// Raw query as last set by the caller
    query: String,
    debounced: Debouncer<String>,
    cache: DirectoryCache,
    index: MatchIndex,
    results: Arc<[DirectoryEntry]>,
    searches_run: u64,
    view: watch::Sender<PipelineView>,
}

impl SearchPipeline {
    /// Spawn the coordinator on the current tokio runtime
    ///
    /// If `config.auto_fetch` is set the first directory retrieval starts
    /// immediately.
    pub fn spawn(config: SearchConfig, source: Arc<dyn DirectorySource>) -> PipelineHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(PipelineView::default());
        let (cache, outcomes) = DirectoryCache::new(source);

        let pipeline = SearchPipeline {
            debounced: Debouncer::new(config.debounce(), String::new()),
            index: MatchIndex::build(Arc::clone(cache.directory()), config.threshold),
            config,
            query: String::new(),
            cache,
            results: Arc::from(Vec::new()),
            searches_run: 0,
            view: view_tx,
        };

        tokio::spawn(pipeline.run(command_rx, outcomes));

        PipelineHandle {
            commands: command_tx,
            view: view_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<FetchOutcome>,
    ) {
        log::debug!(
            "Search pipeline started (debounce {}ms, min length {}, threshold {}, limit {})",
            self.config.debounce_ms,
            self.config.min_query_len,
            self.config.threshold,
            self.config.result_limit
        );

        if self.config.auto_fetch {
            self.start_retrieval();
        }

        loop {
            let deadline = self.debounced.deadline();
            // Only polled while a query is pending
            let debounce = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::SetQuery(query)) => self.on_query(query),
                    Some(Command::Refresh) => self.start_retrieval(),
                    Some(Command::Shutdown) | None => break,
                },
                _ = debounce, if deadline.is_some() => self.on_debounce_elapsed(),
                Some(outcome) = outcomes.recv() => self.on_retrieval_outcome(outcome),
            }
        }

        self.teardown();
    }

    fn on_query(&mut self, query: String) {
        log::trace!("Query updated: {:?}", query);
        self.query = query.clone();
        self.debounced.update(query, Instant::now());
    }

    fn on_debounce_elapsed(&mut self) {
        if let Some(query) = self.debounced.fire(Instant::now()) {
            self.searches_run += 1;
            self.results = self.search(&query);
            self.publish();
        }
    }

    fn start_retrieval(&mut self) {
        self.cache.fetch();
        self.publish();
    }

    fn on_retrieval_outcome(&mut self, outcome: FetchOutcome) {
        match self.cache.complete(outcome) {
            Completion::Replaced => {
                if !self.index.is_built_from(self.cache.directory()) {
                    self.index = MatchIndex::build(Arc::clone(self.cache.directory()), self.config.threshold);
                    log::debug!("Match index rebuilt over {} symbols", self.index.len());
                }

                if self.config.rerun_on_refresh {
                    let query = self.debounced.current().clone();
                    self.results = self.search(&query);
                }
            }
            Completion::Failed | Completion::Cancelled => {}
            Completion::Stale => return,
        }
        self.publish();
    }

    fn search(&self, query: &str) -> Arc<[DirectoryEntry]> {
        if query.trim().chars().count() < self.config.min_query_len {
            return Arc::from(Vec::new());
        }

        let results = self.index.search_entries(query, self.config.result_limit);
        log::debug!("Query {:?} -> {} results", query.trim(), results.len());
        Arc::from(results)
    }

    fn publish(&self) {
        let status = self.cache.status();
        let directory = self.cache.directory();

        self.view.send_replace(PipelineView {
            results: Arc::clone(&self.results),
            loading: status.loading,
            error: status.error.clone(),
            debounced_query: self.debounced.current().clone(),
            directory_len: directory.len(),
            fetched_at: directory.fetched_at,
            searches_run: self.searches_run,
        });
    }

    fn teardown(&mut self) {
        log::debug!("Search pipeline stopping");
        self.debounced.cancel();
        self.cache.cancel();
        self.publish();
    }
}
