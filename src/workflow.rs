use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::config::{Config, JobConfig};
use crate::error::Result;
use crate::media::{AudioExtractor, MediaProcessorFactory, VideoComposer};
use crate::observer::{PipelineObserver, TracingObserver};
use crate::subtitle::SubtitleProcessor;
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::workspace::Workspace;

/// Where a run currently is. Transitions only move forward; `Failed` can be
/// entered from any state before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Validating,
    Extracting,
    Transcribing,
    Normalizing,
    Composing,
    Done,
    Failed,
}

impl PipelineState {
    /// Position among the four working stages, for progress display
    pub fn step(&self) -> Option<(usize, usize)> {
        match self {
            PipelineState::Extracting => Some((1, 4)),
            PipelineState::Transcribing => Some((2, 4)),
            PipelineState::Normalizing => Some((3, 4)),
            PipelineState::Composing => Some((4, 4)),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PipelineState::Validating => "Validating job",
            PipelineState::Extracting => "Extracting audio",
            PipelineState::Transcribing => "Transcribing and translating audio",
            PipelineState::Normalizing => "Normalizing subtitles",
            PipelineState::Composing => "Burning subtitles into video",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        }
    }

    /// The state that follows on success
    pub fn next(&self) -> PipelineState {
        match self {
            PipelineState::Validating => PipelineState::Extracting,
            PipelineState::Extracting => PipelineState::Transcribing,
            PipelineState::Transcribing => PipelineState::Normalizing,
            PipelineState::Normalizing => PipelineState::Composing,
            PipelineState::Composing | PipelineState::Done => PipelineState::Done,
            PipelineState::Failed => PipelineState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Tracks the current state and reports every transition
struct StateMachine<'a> {
    state: PipelineState,
    entered_at: Instant,
    observer: &'a dyn PipelineObserver,
}

impl<'a> StateMachine<'a> {
    fn start(observer: &'a dyn PipelineObserver) -> Self {
        observer.state_changed(PipelineState::Validating);
        Self {
            state: PipelineState::Validating,
            entered_at: Instant::now(),
            observer,
        }
    }

    fn advance(&mut self) {
        debug_assert!(!self.state.is_terminal(), "advance from terminal state {:?}", self.state);
        self.observer.stage_completed(self.state, self.entered_at.elapsed());
        self.state = self.state.next();
        self.entered_at = Instant::now();
        self.observer.state_changed(self.state);
    }

    /// Stage that was running when the failure happened
    fn fail(&mut self) -> PipelineState {
        let failed_in = self.state;
        self.state = PipelineState::Failed;
        self.observer.state_changed(PipelineState::Failed);
        failed_in
    }
}

/// Runs one job: validate, extract, transcribe, normalize, compose
pub struct Workflow {
    extractor: Box<dyn AudioExtractor>,
    transcriber: Box<dyn Transcriber>,
    composer: Box<dyn VideoComposer>,
    subtitles: SubtitleProcessor,
    observer: Arc<dyn PipelineObserver>,
    temp_root: Option<PathBuf>,
}

impl Workflow {
    /// Workflow backed by ffmpeg and whisper, reporting through tracing
    pub fn new(config: Config) -> Self {
        let extractor = MediaProcessorFactory::create_extractor(config.media.clone());
        let composer = MediaProcessorFactory::create_composer(config.media.clone());
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());

        Self::with_components(config, extractor, transcriber, composer)
    }

    /// Workflow with explicit adapters
    pub fn with_components(
        config: Config,
        extractor: Box<dyn AudioExtractor>,
        transcriber: Box<dyn Transcriber>,
        composer: Box<dyn VideoComposer>,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            composer,
            subtitles: SubtitleProcessor::new(config.subtitles, config.style),
            observer: Arc::new(TracingObserver),
            temp_root: None,
        }
    }

    /// Report progress through `observer` instead of plain tracing
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Create workspaces under `dir` instead of the system temp directory
    pub fn with_temp_root<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Run the job to completion and return the output video path.
    ///
    /// On failure the error names the failing stage; intermediate files are
    /// removed either way unless the job asks to keep them.
    pub async fn run(&self, job: &JobConfig) -> Result<PathBuf> {
        let started = Instant::now();
        let observer = self.observer.as_ref();
        let mut machine = StateMachine::start(observer);

        if let Err(e) = self.validate(job).await {
            let failed_in = machine.fail();
            observer.job_failed(failed_in, &e);
            return Err(e);
        }

        let workspace = match self.acquire_workspace() {
            Ok(workspace) => workspace,
            Err(e) => {
                let failed_in = machine.fail();
                observer.job_failed(failed_in, &e);
                return Err(e);
            }
        };
        observer.workspace_acquired(workspace.path());

        let result = self.process(job, &workspace, &mut machine).await;

        match result {
            Ok(()) => {
                machine.advance();
                workspace.release(job.keep_temp, observer);
                observer.job_completed(&job.output, started.elapsed());
                Ok(job.output.clone())
            }
            Err(e) => {
                let failed_in = machine.fail();
                observer.job_failed(failed_in, &e);
                workspace.release(job.keep_temp, observer);
                Err(e)
            }
        }
    }

    /// Job checks first, so a bad input never reaches an external process
    async fn validate(&self, job: &JobConfig) -> Result<()> {
        job.validate()?;

        debug!("Checking external tools");
        self.extractor.check_availability().await?;
        self.transcriber.check_availability().await?;
        self.composer.check_availability().await?;

        Ok(())
    }

    fn acquire_workspace(&self) -> Result<Workspace> {
        match &self.temp_root {
            Some(dir) => Workspace::acquire_in(dir),
            None => Workspace::acquire(),
        }
    }

    async fn process(&self, job: &JobConfig, workspace: &Workspace, machine: &mut StateMachine<'_>) -> Result<()> {
        machine.advance();
        self.extractor.extract(&job.input, workspace.audio_path()).await?;

        machine.advance();
        let subtitle_path = self
            .transcriber
            .transcribe(workspace.audio_path(), workspace.subtitle_path(), &job.language, job.model)
            .await?;

        machine.advance();
        let params = self.subtitles.normalize(&subtitle_path, &job.style).await?;

        machine.advance();
        self.composer
            .compose(&job.input, &subtitle_path, &params, &job.output)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSize;
    use crate::error::{SubtitlerError, ToolFailure};
    use crate::media::{MockAudioExtractor, MockVideoComposer};
    use crate::observer::testing::{Event, RecordingObserver};
    use crate::style::{Position, SubtitleStyle};
    use crate::transcribe::MockTranscriber;
    use assert_fs::prelude::*;
    use std::path::Path;

    const TRANSLATED_SRT: &str = "1\n00:00:00,000 --> 00:00:02,000\nGood morning.\n\n2\n00:00:01,500 --> 00:00:04,000\nLet us begin.\n\n";

    struct Fixture {
        temp: assert_fs::TempDir,
        scratch: assert_fs::TempDir,
        observer: Arc<RecordingObserver>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = assert_fs::TempDir::new().unwrap();
            temp.child("lecture.mp4").write_binary(b"original video bytes").unwrap();
            Self {
                temp,
                scratch: assert_fs::TempDir::new().unwrap(),
                observer: Arc::new(RecordingObserver::default()),
            }
        }

        fn job(&self) -> JobConfig {
            JobConfig::new(
                self.temp.child("lecture.mp4").to_path_buf(),
                None,
                "de".to_string(),
                ModelSize::Medium,
                SubtitleStyle::default(),
            )
        }

        fn workflow(
            &self,
            extractor: MockAudioExtractor,
            transcriber: MockTranscriber,
            composer: MockVideoComposer,
        ) -> Workflow {
            Workflow::with_components(
                Config::default(),
                Box::new(extractor),
                Box::new(transcriber),
                Box::new(composer),
            )
            .with_observer(self.observer.clone())
            .with_temp_root(self.scratch.path())
        }

        fn scratch_is_empty(&self) -> bool {
            std::fs::read_dir(self.scratch.path()).unwrap().next().is_none()
        }
    }

    fn available_extractor() -> MockAudioExtractor {
        let mut extractor = MockAudioExtractor::new();
        extractor.expect_check_availability().returning(|| Ok(()));
        extractor
    }

    fn available_transcriber() -> MockTranscriber {
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_check_availability().returning(|| Ok(()));
        transcriber
    }

    fn available_composer() -> MockVideoComposer {
        let mut composer = MockVideoComposer::new();
        composer.expect_check_availability().returning(|| Ok(()));
        composer
    }

    fn extracting() -> MockAudioExtractor {
        let mut extractor = available_extractor();
        extractor.expect_extract().times(1).returning(|_, audio: &Path| {
            std::fs::write(audio, b"RIFF")?;
            Ok(())
        });
        extractor
    }

    fn transcribing(srt: &'static str) -> MockTranscriber {
        let mut transcriber = available_transcriber();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(move |_, subtitle_path: &Path, _, _| {
                std::fs::write(subtitle_path, srt)?;
                Ok(subtitle_path.to_path_buf())
            });
        transcriber
    }

    fn composing() -> MockVideoComposer {
        let mut composer = available_composer();
        composer.expect_compose().times(1).returning(|_, _, _, output: &Path| {
            std::fs::write(output, b"subtitled video")?;
            Ok(())
        });
        composer
    }

    #[tokio::test]
    async fn test_successful_run() {
        let fixture = Fixture::new();
        let workflow = fixture.workflow(extracting(), transcribing(TRANSLATED_SRT), composing());

        let output = workflow.run(&fixture.job()).await.unwrap();

        assert_eq!(output, fixture.temp.child("lecture_subtitled.mp4").to_path_buf());
        assert_eq!(std::fs::read(&output).unwrap(), b"subtitled video");
        assert_eq!(
            std::fs::read(fixture.temp.child("lecture.mp4").path()).unwrap(),
            b"original video bytes"
        );
        assert_eq!(
            fixture.observer.entered_states(),
            vec![
                PipelineState::Validating,
                PipelineState::Extracting,
                PipelineState::Transcribing,
                PipelineState::Normalizing,
                PipelineState::Composing,
                PipelineState::Done,
            ]
        );
        assert!(fixture.observer.events().contains(&Event::Finished(output)));
        assert!(!fixture.observer.workspace().unwrap().exists());
        assert!(fixture.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_composer_receives_normalized_cues_and_styling() {
        let fixture = Fixture::new();
        let mut composer = available_composer();
        composer
            .expect_compose()
            .times(1)
            .returning(|_, subtitles: &Path, params, output: &Path| {
                let content = std::fs::read_to_string(subtitles).unwrap();
                // Second cue started before the first ended
                assert!(content.contains("2\n00:00:02,000 --> 00:00:04,000\nLet us begin."));
                assert_eq!(params.alignment, 7);
                assert_eq!(params.font_size, 30);
                std::fs::write(output, b"video")?;
                Ok(())
            });

        let mut job = fixture.job();
        job.language = "fr".to_string();
        job.style = SubtitleStyle {
            font_size: 30,
            position: Position::UpperLeft,
        };

        let mut transcriber = available_transcriber();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, subtitle_path: &Path, language: &str, model| {
                assert_eq!(language, "fr");
                assert_eq!(model, ModelSize::Medium);
                std::fs::write(subtitle_path, TRANSLATED_SRT)?;
                Ok(subtitle_path.to_path_buf())
            });

        let workflow = fixture.workflow(extracting(), transcriber, composer);
        workflow.run(&job).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_any_tool_runs() {
        let fixture = Fixture::new();
        let mut extractor = MockAudioExtractor::new();
        extractor.expect_check_availability().times(0);
        extractor.expect_extract().times(0);
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_check_availability().times(0);
        let mut composer = MockVideoComposer::new();
        composer.expect_check_availability().times(0);

        let mut job = fixture.job();
        job.input = fixture.temp.child("missing.mp4").to_path_buf();

        let result = fixture.workflow(extractor, transcriber, composer).run(&job).await;

        assert!(matches!(result, Err(SubtitlerError::Validation(_))));
        assert_eq!(
            fixture.observer.entered_states(),
            vec![PipelineState::Validating, PipelineState::Failed]
        );
        assert!(fixture.observer.workspace().is_none());
        assert!(fixture.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_missing_transcriber_tool_fails_during_validation() {
        let fixture = Fixture::new();
        let mut extractor = available_extractor();
        extractor.expect_extract().times(0);
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_check_availability().returning(|| {
            Err(SubtitlerError::Transcription(ToolFailure::NotFound {
                program: "whisper".to_string(),
            }))
        });
        let composer = MockVideoComposer::new();

        let result = fixture
            .workflow(extractor, transcriber, composer)
            .run(&fixture.job())
            .await;

        assert!(matches!(
            result,
            Err(SubtitlerError::Transcription(ToolFailure::NotFound { .. }))
        ));
        assert!(!fixture.temp.child("lecture_subtitled.mp4").exists());
    }

    #[tokio::test]
    async fn test_extraction_failure_releases_workspace() {
        let fixture = Fixture::new();
        let mut extractor = available_extractor();
        extractor.expect_extract().times(1).returning(|_, _| {
            Err(SubtitlerError::Extraction(ToolFailure::Exited {
                program: "ffmpeg".to_string(),
                status: Some(1),
                stderr: "lecture.mp4: Invalid data found when processing input".to_string(),
            }))
        });
        let mut transcriber = available_transcriber();
        transcriber.expect_transcribe().times(0);
        let mut composer = available_composer();
        composer.expect_compose().times(0);

        let result = fixture
            .workflow(extractor, transcriber, composer)
            .run(&fixture.job())
            .await;

        match result {
            Err(e @ SubtitlerError::Extraction(_)) => {
                assert_eq!(e.exit_code(), 3);
                assert!(e.diagnostics().unwrap().contains("Invalid data"));
            }
            other => panic!("expected extraction error, got {:?}", other),
        }

        let events = fixture.observer.events();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::Failed(PipelineState::Extracting, _))));
        assert!(fixture.scratch_is_empty());
        assert!(!fixture.temp.child("lecture_subtitled.mp4").exists());
    }

    #[tokio::test]
    async fn test_no_speech_fails_without_output() {
        let fixture = Fixture::new();
        let mut transcriber = available_transcriber();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, subtitle_path: &Path, _, _| {
                Err(SubtitlerError::Transcription(ToolFailure::NoSpeech(
                    subtitle_path.to_path_buf(),
                )))
            });
        let mut composer = available_composer();
        composer.expect_compose().times(0);

        let result = fixture
            .workflow(extracting(), transcriber, composer)
            .run(&fixture.job())
            .await;

        assert!(matches!(
            result,
            Err(SubtitlerError::Transcription(ToolFailure::NoSpeech(_)))
        ));
        assert!(!fixture.temp.child("lecture_subtitled.mp4").exists());
        assert!(fixture.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_subtitles_fail_normalization() {
        let fixture = Fixture::new();
        let mut composer = available_composer();
        composer.expect_compose().times(0);

        let result = fixture
            .workflow(extracting(), transcribing("garbage without timing\n"), composer)
            .run(&fixture.job())
            .await;

        assert!(matches!(result, Err(SubtitlerError::SubtitleFormat(_))));
        assert!(fixture
            .observer
            .events()
            .iter()
            .any(|event| matches!(event, Event::Failed(PipelineState::Normalizing, _))));
    }

    #[tokio::test]
    async fn test_composition_failure_is_reported() {
        let fixture = Fixture::new();
        let mut composer = available_composer();
        composer.expect_compose().times(1).returning(|_, _, _, _| {
            Err(SubtitlerError::Composition(ToolFailure::Exited {
                program: "ffmpeg".to_string(),
                status: Some(234),
                stderr: "Unable to open subtitles".to_string(),
            }))
        });

        let result = fixture
            .workflow(extracting(), transcribing(TRANSLATED_SRT), composer)
            .run(&fixture.job())
            .await;

        assert!(matches!(result, Err(SubtitlerError::Composition(_))));
        assert_eq!(fixture.observer.entered_states().last(), Some(&PipelineState::Failed));
        assert!(fixture.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_fail_the_job() {
        let fixture = Fixture::new();
        let mut composer = available_composer();
        composer
            .expect_compose()
            .times(1)
            .returning(|_, subtitles: &Path, _, output: &Path| {
                std::fs::write(output, b"subtitled video")?;
                // Workspace disappears before teardown
                std::fs::remove_dir_all(subtitles.parent().unwrap())?;
                Ok(())
            });

        let workflow = fixture.workflow(extracting(), transcribing(TRANSLATED_SRT), composer);
        let output = workflow.run(&fixture.job()).await.unwrap();

        assert!(output.exists());
        let workspace = fixture.observer.workspace().unwrap();
        let events = fixture.observer.events();
        assert!(events.contains(&Event::CleanupWarning(workspace)));
        assert!(events.contains(&Event::Finished(output)));
    }

    #[tokio::test]
    async fn test_keep_temp_retains_workspace() {
        let fixture = Fixture::new();
        let mut job = fixture.job();
        job.keep_temp = true;

        let workflow = fixture.workflow(extracting(), transcribing(TRANSLATED_SRT), composing());
        workflow.run(&job).await.unwrap();

        let workspace = fixture.observer.workspace().unwrap();
        assert!(workspace.join("extracted.wav").exists());
        assert!(workspace.join("extracted.srt").exists());
        assert!(fixture
            .observer
            .events()
            .contains(&Event::WorkspaceRetained(workspace.clone())));
    }

    #[tokio::test]
    async fn test_keep_temp_retains_workspace_after_failure() {
        let fixture = Fixture::new();
        let mut job = fixture.job();
        job.keep_temp = true;

        let mut composer = available_composer();
        composer.expect_compose().times(0);
        let workflow = fixture.workflow(extracting(), transcribing(""), composer);

        assert!(matches!(workflow.run(&job).await, Err(SubtitlerError::SubtitleFormat(_))));
        let workspace = fixture.observer.workspace().unwrap();
        assert!(workspace.join("extracted.wav").exists());
        assert!(!fixture.temp.child("lecture_subtitled.mp4").exists());
    }

    #[tokio::test]
    async fn test_two_runs_with_distinct_outputs() {
        let fixture = Fixture::new();
        let first = fixture.temp.child("first.mp4").to_path_buf();
        let second = fixture.temp.child("second.mp4").to_path_buf();

        for output in [&first, &second] {
            let mut job = fixture.job();
            job.output = output.clone();
            let workflow = fixture.workflow(extracting(), transcribing(TRANSLATED_SRT), composing());
            assert_eq!(&workflow.run(&job).await.unwrap(), output);
        }

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        assert!(fixture.scratch_is_empty());
    }

    #[test]
    fn test_state_transitions_only_move_forward() {
        let mut state = PipelineState::Validating;
        let mut seen = vec![state];
        while !state.is_terminal() {
            state = state.next();
            seen.push(state);
        }

        assert_eq!(seen.len(), 6);
        assert_eq!(state, PipelineState::Done);
        assert_eq!(PipelineState::Failed.next(), PipelineState::Failed);
        assert_eq!(PipelineState::Transcribing.step(), Some((2, 4)));
        assert_eq!(PipelineState::Validating.step(), None);
    }
}
