//! Request lifecycle for one user session.
//!
//! ```text
//! Idle -> Cloning -> Sampling -> Synthesizing -> Done
//!            \           \             \
//!             +-----------+-------------+--> Failed
//! ```
//!
//! `Done` holds the generated README until [`Session::regenerate`] drops it.

use crate::{
    clone::RepoCloner,
    config::Config,
    error::{Error, FailureKind, Result},
    pipeline::{Generation, Pipeline, PipelineStats, Step},
    synth::{ModelClient, Synthesizer},
};
use std::fmt;
use tracing::{debug, info};

/// Why a request ended in [`Stage::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Failure class
    pub kind: FailureKind,
    /// Diagnostic text carried by the underlying error
    pub diagnostic: String,
}

impl Failure {
    /// Message shown to the user.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.kind.user_message()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  {}", self.message(), self.diagnostic)
    }
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.failure_kind(),
            diagnostic: error.diagnostic(),
        }
    }
}

/// Current state of the session's single request slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Waiting for input
    Idle,
    /// Fetching the repository
    Cloning,
    /// Walking the snapshot
    Sampling,
    /// Waiting for the model
    Synthesizing,
    /// Finished, holding the result
    Done(Box<Generation>),
    /// Terminated with an error
    Failed(Failure),
}

/// Payload-free view of [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// See [`Stage::Idle`]
    Idle,
    /// See [`Stage::Cloning`]
    Cloning,
    /// See [`Stage::Sampling`]
    Sampling,
    /// See [`Stage::Synthesizing`]
    Synthesizing,
    /// See [`Stage::Done`]
    Done,
    /// See [`Stage::Failed`]
    Failed,
}

impl Stage {
    /// Returns the payload-free kind.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        match self {
            Self::Idle => StageKind::Idle,
            Self::Cloning => StageKind::Cloning,
            Self::Sampling => StageKind::Sampling,
            Self::Synthesizing => StageKind::Synthesizing,
            Self::Done(_) => StageKind::Done,
            Self::Failed(_) => StageKind::Failed,
        }
    }
}

impl From<Step> for Stage {
    fn from(step: Step) -> Self {
        match step {
            Step::Cloning => Self::Cloning,
            Step::Sampling => Self::Sampling,
            Step::Synthesizing => Self::Synthesizing,
        }
    }
}

/// Holds the state of one user's generation requests.
///
/// Only [`Session::generate`] and [`Session::regenerate`] write the stage;
/// renderers read it through [`Session::stage`] and [`Session::result`].
#[derive(Debug)]
pub struct Session {
    stage: Stage,
    stats: Option<PipelineStats>,
    history: Vec<StageKind>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            stats: None,
            history: vec![StageKind::Idle],
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The held README, if the last request succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&Generation> {
        match &self.stage {
            Stage::Done(generation) => Some(&**generation),
            _ => None,
        }
    }

    /// Statistics of the last successful request.
    #[must_use]
    pub const fn stats(&self) -> Option<&PipelineStats> {
        self.stats.as_ref()
    }

    /// Stages visited since the last reset, oldest first.
    #[must_use]
    pub fn history(&self) -> &[StageKind] {
        &self.history
    }

    /// Runs one request to completion.
    ///
    /// Any previous result is discarded first. An invalid request is
    /// rejected before any I/O and leaves the session idle.
    ///
    /// # Errors
    ///
    /// Returns the terminal error; the stage then holds the matching
    /// [`Failure`] (except for invalid requests, which never start).
    pub fn generate<R, C>(
        &mut self,
        config: Config,
        cloner: &R,
        synthesizer: &Synthesizer<C>,
    ) -> Result<&Generation>
    where
        R: RepoCloner + ?Sized,
        C: ModelClient,
    {
        self.reset();

        let pipeline = Pipeline::new(config).inspect_err(|e| {
            info!("Request rejected: {}", e);
        })?;

        let outcome = pipeline.run(cloner, synthesizer, |step| {
            debug!("Session stage -> {:?}", step);
            self.stage = Stage::from(step);
            self.history.push(self.stage.kind());
        });

        match outcome {
            Ok((generation, stats)) => {
                self.stats = Some(stats);
                self.transition(Stage::Done(Box::new(generation)));
                self.result()
                    .ok_or_else(|| Error::synthesis("result missing after completion"))
            }
            Err(e) => {
                self.transition(Stage::Failed(Failure::from(&e)));
                Err(e)
            }
        }
    }

    /// Drops the held result and returns to [`Stage::Idle`].
    pub fn regenerate(&mut self) {
        info!("Discarding previous result");
        self.reset();
    }

    fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.stats = None;
        self.history.clear();
        self.history.push(StageKind::Idle);
    }

    fn transition(&mut self, stage: Stage) {
        debug!("Session stage -> {:?}", stage.kind());
        self.history.push(stage.kind());
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{
        readme_app_and_binary, test_config, FailingCloner, FixtureCloner, ScriptedClient,
    };

    #[test]
    fn test_successful_request() {
        let mut session = Session::new();
        let cloner = readme_app_and_binary();
        let synthesizer = Synthesizer::new(ScriptedClient::answering("# Demo"));

        let generation = session
            .generate(test_config(), &cloner, &synthesizer)
            .unwrap();
        assert_eq!(generation.markdown, "# Demo");

        assert_eq!(session.stage().kind(), StageKind::Done);
        assert_eq!(
            session.history(),
            &[
                StageKind::Idle,
                StageKind::Cloning,
                StageKind::Sampling,
                StageKind::Synthesizing,
                StageKind::Done
            ]
        );
        assert_eq!(session.stats().unwrap().sample.sampled_files, 2);
        assert!(!cloner.dest().exists());
    }

    #[test]
    fn test_empty_repository() {
        let mut session = Session::new();
        let cloner = FixtureCloner::new(vec![]);
        let synthesizer = Synthesizer::new(ScriptedClient::answering("unused"));

        let err = session
            .generate(test_config(), &cloner, &synthesizer)
            .unwrap_err();
        assert!(err.is_empty_corpus());

        match session.stage() {
            Stage::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::EmptyCorpus);
                assert!(failure.message().contains("appears to be empty"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert_eq!(session.history().last(), Some(&StageKind::Failed));
        assert!(!session.history().contains(&StageKind::Synthesizing));
        assert_eq!(synthesizer.client().calls.get(), 0);
        assert!(!cloner.dest().exists());
    }

    #[test]
    fn test_synthesis_failure() {
        let mut session = Session::new();
        let cloner = readme_app_and_binary();
        let synthesizer = Synthesizer::new(ScriptedClient::failing("transport error: timed out"));

        session
            .generate(test_config(), &cloner, &synthesizer)
            .unwrap_err();

        match session.stage() {
            Stage::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::Synthesis);
                assert_eq!(
                    failure.message(),
                    "Something went wrong while processing the repository."
                );
                assert!(failure.diagnostic.contains("timed out"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert!(session.result().is_none());
        assert!(session.stats().is_none());
        assert!(!cloner.dest().exists());
    }

    #[test]
    fn test_failure_display_states_message_once() {
        let failure = Failure::from(&Error::synthesis("transport error: timed out"));

        let text = failure.to_string();
        assert_eq!(
            text,
            "Something went wrong while processing the repository.\n  transport error: timed out"
        );
        assert_eq!(text.matches("Something went wrong").count(), 1);
    }

    #[test]
    fn test_clone_failure() {
        let mut session = Session::new();
        let synthesizer = Synthesizer::new(ScriptedClient::answering("unused"));

        let cloner = FailingCloner::new();
        session
            .generate(test_config(), &cloner, &synthesizer)
            .unwrap_err();

        assert_eq!(
            session.history(),
            &[StageKind::Idle, StageKind::Cloning, StageKind::Failed]
        );
        match session.stage() {
            Stage::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::Clone);
                assert!(failure.diagnostic.contains("repository not found"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert!(!cloner.dest().exists());
    }

    #[test]
    fn test_invalid_request_never_starts() {
        let mut session = Session::new();
        let cloner = readme_app_and_binary();
        let synthesizer = Synthesizer::new(ScriptedClient::answering("unused"));

        let mut config = test_config();
        config.model.api_key = String::new();

        let err = session.generate(config, &cloner, &synthesizer).unwrap_err();

        assert_eq!(err.failure_kind(), FailureKind::InvalidRequest);
        assert_eq!(session.stage(), &Stage::Idle);
        assert!(cloner.dest.borrow().is_none());
    }

    #[test]
    fn test_regenerate_discards_result() {
        let mut session = Session::new();
        let cloner = readme_app_and_binary();
        let synthesizer = Synthesizer::new(ScriptedClient::answering("# First"));

        session
            .generate(test_config(), &cloner, &synthesizer)
            .unwrap();
        assert!(session.result().is_some());

        session.regenerate();

        assert_eq!(session.stage(), &Stage::Idle);
        assert!(session.result().is_none());
        assert!(session.stats().is_none());
        assert_eq!(session.history(), &[StageKind::Idle]);
        assert_eq!(synthesizer.client().calls.get(), 1);

        session
            .generate(test_config(), &readme_app_and_binary(), &synthesizer)
            .unwrap();
        assert_eq!(synthesizer.client().calls.get(), 2);
    }
}
