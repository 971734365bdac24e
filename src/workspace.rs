use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::Result;
use crate::observer::PipelineObserver;

const WORKSPACE_PREFIX: &str = "subtitler_";
const AUDIO_FILE: &str = "extracted.wav";
// Whisper names its output after the audio stem
const SUBTITLE_FILE: &str = "extracted.srt";

/// Scoped temporary directory holding one job's intermediate artifacts.
///
/// Dropping a workspace without calling [`Workspace::release`] still
/// removes the directory.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    audio_path: PathBuf,
    subtitle_path: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace in the system temp directory
    pub fn acquire() -> Result<Self> {
        Self::acquire_in(std::env::temp_dir())
    }

    /// Create a fresh workspace under `parent`
    pub fn acquire_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)?;

        debug!("Created temporary directory: {}", dir.path().display());

        let audio_path = dir.path().join(AUDIO_FILE);
        let subtitle_path = dir.path().join(SUBTITLE_FILE);

        Ok(Self {
            dir,
            audio_path,
            subtitle_path,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the extracted audio goes
    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Where the subtitle artifact goes
    pub fn subtitle_path(&self) -> &Path {
        &self.subtitle_path
    }

    /// Tear the workspace down, or keep it when `keep` is set.
    ///
    /// Returns the retained location. Removal failures are reported to the
    /// observer and otherwise ignored.
    pub fn release(self, keep: bool, observer: &dyn PipelineObserver) -> Option<PathBuf> {
        let Workspace { dir, .. } = self;

        if keep {
            let path = dir.keep();
            observer.workspace_retained(&path);
            return Some(path);
        }

        let path = dir.path().to_path_buf();
        debug!("Cleaning up temporary directory: {}", path.display());
        if let Err(e) = dir.close() {
            observer.cleanup_warning(&path, &e);
        }

        None
    }
}
