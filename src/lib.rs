//! Stockfind: debounced fuzzy search over a stock symbol directory
//!
//! Stockfind retrieves the complete symbol list of an exchange once, keeps it
//! in memory, and answers typo-tolerant queries against ticker symbols and
//! company names as the user types.
//!
//! # Architecture
//!
//! - **Debouncer**: turns keystrokes into a settled query after a quiet period
//! - **Directory cache**: one cancellable bulk retrieval at a time; late
//!   responses from superseded retrievals are discarded
//! - **Match index**: immutable fuzzy index rebuilt for every new directory
//! - **Pipeline**: a single task that wires the three together and publishes
//!   `(results, loading, error)` snapshots
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockfind::{JsonFileSource, SearchConfig, SearchPipeline};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = Arc::new(JsonFileSource::new("symbols.json"));
//! let pipeline = SearchPipeline::spawn(SearchConfig::default(), source);
//!
//! pipeline.set_query("apple");
//! let view = pipeline.wait_for(|v| v.searches_run > 0).await?;
//! for entry in view.results.iter() {
//!     println!("{} - {}", entry.symbol, entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod debounce;
pub mod directory;
pub mod index;
pub mod interactive;
pub mod models;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use config::{Config, ProviderConfig, SearchConfig};
pub use debounce::Debouncer;
pub use directory::{DirectoryCache, DirectorySource, FinnhubSource, JsonFileSource};
pub use index::{MatchIndex, Match, MatchField};
pub use models::{Directory, DirectoryEntry, PipelineView, RetrievalStatus, SymbolRecord};
pub use pipeline::{PipelineHandle, SearchPipeline};
