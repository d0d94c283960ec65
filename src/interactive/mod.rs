// Interactive mode modules
mod app;
mod input;
mod results;
mod ui;

use anyhow::Result;
use app::InteractiveApp;

use crate::models::DirectoryEntry;
use crate::pipeline::PipelineHandle;

/// Main entry point for interactive mode
///
/// Runs the TUI against `pipeline` until the user quits and returns the
/// symbols they selected.
pub async fn run_interactive(pipeline: PipelineHandle) -> Result<Vec<DirectoryEntry>> {
    InteractiveApp::new(pipeline).run().await
}
