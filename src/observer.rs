//! Progress and diagnostic reporting for a pipeline run.
//!
//! The workflow reports through a [`PipelineObserver`] handed to it rather
//! than logging on its own, so callers decide how progress is shown and
//! tests can assert on the events.

use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::SubtitlerError;
use crate::workflow::PipelineState;

pub trait PipelineObserver: Send + Sync {
    /// The pipeline entered `state`
    fn state_changed(&self, state: PipelineState);

    /// The work of `state` finished successfully
    fn stage_completed(&self, state: PipelineState, elapsed: Duration);

    fn workspace_acquired(&self, path: &Path);

    /// Intermediate files were kept at `path` on request
    fn workspace_retained(&self, path: &Path);

    /// Removing an intermediate file or directory failed; never fatal
    fn cleanup_warning(&self, path: &Path, error: &io::Error);

    fn job_failed(&self, state: PipelineState, error: &SubtitlerError);

    fn job_completed(&self, output: &Path, elapsed: Duration);
}

/// Reports everything through `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn state_changed(&self, state: PipelineState) {
        match state.step() {
            Some((step, total)) => info!("[{}/{}] {}...", step, total, state.description()),
            None => debug!("Pipeline state: {}", state.description()),
        }
    }

    fn stage_completed(&self, state: PipelineState, elapsed: Duration) {
        info!("{} finished in {:.1}s", state.description(), elapsed.as_secs_f64());
    }

    fn workspace_acquired(&self, path: &Path) {
        info!("Using temporary directory: {}", path.display());
    }

    fn workspace_retained(&self, path: &Path) {
        info!("Temporary files kept at: {}", path.display());
    }

    fn cleanup_warning(&self, path: &Path, error: &io::Error) {
        warn!("Failed to remove temporary files at {}: {}", path.display(), error);
    }

    fn job_failed(&self, state: PipelineState, error: &SubtitlerError) {
        error!("{} failed: {}", state.description(), error);
        if let Some(diagnostics) = error.diagnostics() {
            debug!("Tool diagnostics:\n{}", diagnostics);
        }
    }

    fn job_completed(&self, output: &Path, elapsed: Duration) {
        info!(
            "Successfully created subtitled video: {} ({:.1}s)",
            output.display(),
            elapsed.as_secs_f64()
        );
    }
}

/// Spinner on the terminal showing the running stage, on top of tracing output
pub struct ProgressObserver {
    bar: ProgressBar,
    inner: TracingObserver,
}

impl ProgressObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);

        Self {
            bar,
            inner: TracingObserver,
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineObserver for ProgressObserver {
    fn state_changed(&self, state: PipelineState) {
        if let Some((step, total)) = state.step() {
            if step == 1 {
                self.bar.enable_steady_tick(Duration::from_millis(120));
            }
            self.bar.set_message(format!("[{}/{}] {}", step, total, state.description()));
        }
        self.bar.suspend(|| self.inner.state_changed(state));
    }

    fn stage_completed(&self, state: PipelineState, elapsed: Duration) {
        self.bar.suspend(|| self.inner.stage_completed(state, elapsed));
    }

    fn workspace_acquired(&self, path: &Path) {
        self.bar.suspend(|| self.inner.workspace_acquired(path));
    }

    fn workspace_retained(&self, path: &Path) {
        self.bar.suspend(|| self.inner.workspace_retained(path));
    }

    fn cleanup_warning(&self, path: &Path, error: &io::Error) {
        self.bar.suspend(|| self.inner.cleanup_warning(path, error));
    }

    fn job_failed(&self, state: PipelineState, error: &SubtitlerError) {
        self.bar.abandon_with_message(format!("{} failed", state.description()));
        self.inner.job_failed(state, error);
    }

    fn job_completed(&self, output: &Path, elapsed: Duration) {
        self.bar.finish_and_clear();
        self.inner.job_completed(output, elapsed);
    }
}
