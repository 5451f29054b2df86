//! Live training session: a scene engine plus its side effects.
//!
//! The session owns the countdown, triggers narration and hands every
//! recorded event to the outbox after each successful operation. Rejected
//! operations record nothing, so nothing is sent.

use std::sync::Arc;

use skillpass_catalog::ModuleCatalog;
use skillpass_catalog::markup::plain_text;
use skillpass_core::clock::Clock;
use skillpass_core::error::DomainError;
use skillpass_core::ports::{Narrator, RetakeStatus, RetakeStatusLookup};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::countdown::{CountdownHandle, spawn_countdown};
use crate::application::outbox::{FinalizeRequest, ProgressOutbox};
use crate::application::ports::VariationGenerator;
use crate::application::variations::load_variations;
use crate::domain::engine::{FinalizeOutcome, RunSetup, SceneChange, SceneEngine};
use crate::domain::timer::{CountdownTimer, TimerState};

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct TrainingServices {
    /// Loaded module catalog.
    pub catalog: Arc<ModuleCatalog>,
    /// Prior-attempt lookup.
    pub retake_lookup: Arc<dyn RetakeStatusLookup>,
    /// Retake content source.
    pub variations: Arc<dyn VariationGenerator>,
    /// Narration side effect.
    pub narrator: Arc<dyn Narrator>,
    /// Outbound persistence queue.
    pub outbox: ProgressOutbox,
    /// Time source for event metadata.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TrainingServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingServices")
            .field("modules", &self.catalog.len())
            .field("outbox", &self.outbox)
            .finish_non_exhaustive()
    }
}

/// Request to open a module for a candidate.
#[derive(Debug, Clone)]
pub struct StartSession {
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The candidate.
    pub candidate_id: Uuid,
    /// Module id or slug.
    pub module: String,
}

/// A candidate's open module.
pub struct TrainingSession {
    engine: SceneEngine,
    timer: CountdownHandle,
    narrator: Arc<dyn Narrator>,
    outbox: ProgressOutbox,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TrainingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingSession")
            .field("engine", &self.engine)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

impl TrainingSession {
    /// Resolves the module, applies retake content and opens the run at
    /// scene 0 with the countdown running.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ModuleNotFound` if no module matches. Retake
    /// lookup and variation failures degrade to first-attempt base content.
    pub async fn start(
        services: &TrainingServices,
        request: StartSession,
    ) -> Result<Self, DomainError> {
        let module = services
            .catalog
            .find(&request.module)
            .cloned()
            .ok_or_else(|| DomainError::ModuleNotFound(request.module.clone()))?;

        let retake = services
            .retake_lookup
            .check_retake_status(request.candidate_id, &module.id)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    candidate_id = %request.candidate_id,
                    module_id = %module.id,
                    error = %e,
                    "retake lookup failed, treating as first attempt"
                );
                RetakeStatus::FIRST_ATTEMPT
            });
        let variations = load_variations(services.variations.as_ref(), &module, retake).await;

        let run_id = Uuid::new_v4();
        let engine = SceneEngine::start(
            RunSetup {
                run_id,
                candidate_id: request.candidate_id,
                module: Arc::clone(&module),
                retake,
                catalog_version: services.catalog.version_hash().to_owned(),
            },
            &variations,
            request.correlation_id,
            services.clock.as_ref(),
        )?;
        let timer = spawn_countdown(run_id, CountdownTimer::for_duration(&module.duration));

        let mut session = Self {
            engine,
            timer,
            narrator: Arc::clone(&services.narrator),
            outbox: services.outbox.clone(),
            clock: Arc::clone(&services.clock),
        };
        session.speak_current();
        session.flush();
        info!(
            %run_id,
            candidate_id = %request.candidate_id,
            module_id = %module.id,
            attempt = retake.attempt_number,
            varied_scenes = variations.len(),
            "training session started"
        );
        Ok(session)
    }

    /// The run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.engine.run().id
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &SceneEngine {
        &self.engine
    }

    /// Current countdown state.
    #[must_use]
    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    /// See [`SceneEngine::go_to_next`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on the last scene.
    pub fn go_to_next(&mut self, correlation_id: Uuid) -> Result<SceneChange, DomainError> {
        let change = self.engine.go_to_next(correlation_id, self.clock.as_ref())?;
        self.after_move(change);
        Ok(change)
    }

    /// See [`SceneEngine::go_to_previous`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on the first scene.
    pub fn go_to_previous(&mut self, correlation_id: Uuid) -> Result<SceneChange, DomainError> {
        let change = self
            .engine
            .go_to_previous(correlation_id, self.clock.as_ref())?;
        self.after_move(change);
        Ok(change)
    }

    /// See [`SceneEngine::navigate_to`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for locked or unknown scenes.
    pub fn navigate_to(
        &mut self,
        index: usize,
        correlation_id: Uuid,
    ) -> Result<SceneChange, DomainError> {
        let change = self
            .engine
            .navigate_to(index, correlation_id, self.clock.as_ref())?;
        self.after_move(change);
        Ok(change)
    }

    /// See [`SceneEngine::select_choice`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the choice cannot be selected.
    pub fn select_choice(&mut self, choice_id: &str) -> Result<(), DomainError> {
        self.engine.select_choice(choice_id)
    }

    /// See [`SceneEngine::submit_choice`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when nothing can be submitted.
    pub fn submit_choice(&mut self, correlation_id: Uuid) -> Result<u32, DomainError> {
        let points = self
            .engine
            .submit_choice(correlation_id, self.clock.as_ref())?;
        self.flush();
        Ok(points)
    }

    /// See [`SceneEngine::set_reflection_text`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside an open reflection scene.
    pub fn set_reflection_text(&mut self, text: &str) -> Result<(), DomainError> {
        self.engine.set_reflection_text(text)
    }

    /// See [`SceneEngine::submit_reflection`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the draft is too short.
    pub fn submit_reflection(
        &mut self,
        correlation_id: Uuid,
    ) -> Result<Option<SceneChange>, DomainError> {
        let change = self
            .engine
            .submit_reflection(correlation_id, self.clock.as_ref())?;
        match change {
            Some(change) => self.after_move(change),
            None => self.flush(),
        }
        Ok(change)
    }

    /// See [`SceneEngine::submit_reflection_text`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the text is too short or the
    /// scene does not take a reflection.
    pub fn submit_reflection_text(
        &mut self,
        text: &str,
        correlation_id: Uuid,
    ) -> Result<Option<SceneChange>, DomainError> {
        let change =
            self.engine
                .submit_reflection_text(text, correlation_id, self.clock.as_ref())?;
        match change {
            Some(change) => self.after_move(change),
            None => self.flush(),
        }
        Ok(change)
    }

    /// See [`SceneEngine::answer_question`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for invalid answers.
    pub fn answer_question(&mut self, question: usize, option: usize) -> Result<(), DomainError> {
        self.engine.answer_question(question, option)
    }

    /// See [`SceneEngine::submit_quiz`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when answers are missing.
    pub fn submit_quiz(&mut self, correlation_id: Uuid) -> Result<u32, DomainError> {
        let score = self.engine.submit_quiz(correlation_id, self.clock.as_ref())?;
        self.flush();
        Ok(score)
    }

    /// Finalizes the module: stops the countdown and queues the completion
    /// record. Repeated calls send nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` away from the completion scene.
    pub fn complete_module(&mut self, correlation_id: Uuid) -> Result<FinalizeOutcome, DomainError> {
        let outcome = self
            .engine
            .complete_module(correlation_id, self.clock.as_ref())?;
        if let FinalizeOutcome::Finalized {
            total_score,
            passed,
        } = outcome
        {
            self.timer.stop();
            self.flush();
            let run = self.engine.run();
            self.outbox.finalize_module(FinalizeRequest {
                run_id: run.id,
                candidate_id: run.candidate_id().unwrap_or_default(),
                module_id: self.engine.module().id.clone(),
                total_score,
                passed,
                occurred_at: self.clock.now(),
            });
            info!(run_id = %run.id, total_score, passed, "module completed");
        }
        Ok(outcome)
    }

    /// Leaves the module: cancels the countdown and any narration.
    pub fn close(self) {
        self.narrator.cancel();
        let run_id = self.run_id();
        self.timer.cancel();
        info!(%run_id, "training session closed");
    }

    fn after_move(&mut self, change: SceneChange) {
        if change.from != change.to {
            self.narrator.cancel();
            if change.first_visit {
                self.speak_current();
            }
        }
        self.flush();
    }

    fn speak_current(&self) {
        let text = plain_text(&self.engine.current_scene().content);
        if !text.is_empty() {
            self.narrator.speak(&text);
        }
    }

    fn flush(&mut self) {
        let run_id = self.engine.run().id;
        let (expected_version, events) = self.engine.take_uncommitted_events();
        self.outbox.append_events(run_id, expected_version, events);
    }
}
