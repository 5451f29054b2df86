//! Scene engine: the state machine that drives a candidate through a module.
//!
//! Owns the `TrainingRun` aggregate (durable cursor, progress and score) and
//! the transient per-scene interaction state. Every rejected operation
//! returns `DomainError::Validation` and leaves both untouched.

use std::sync::Arc;

use serde::Serialize;
use skillpass_catalog::{Module, Scene, SceneKind};
use skillpass_core::clock::Clock;
use skillpass_core::error::DomainError;
use skillpass_core::ports::RetakeStatus;
use skillpass_core::repository::StoredEvent;
use tracing::debug;
use uuid::Uuid;

use super::progress::{ProgressTracker, SceneResponse};
use super::run::TrainingRun;
use super::variation::{VariationMap, resolve_all};

/// Fixed score of a submitted reflection.
pub const REFLECTION_POINTS: u32 = 10;

/// Score of a quiz answered entirely correctly.
pub const QUIZ_MAX_POINTS: u32 = 30;

/// Quiz score for `correct` of `total` answers, rounded half away from zero.
#[must_use]
pub fn quiz_score(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let max = QUIZ_MAX_POINTS as usize;
    let score = (correct.min(total) * max * 2 + total) / (2 * total);
    u32::try_from(score).unwrap_or(QUIZ_MAX_POINTS)
}

/// Input state of the scene on screen. Reset on every scene change and
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InteractionState {
    /// Choice option picked but not necessarily submitted.
    pub selected_choice: Option<String>,
    /// Feedback is visible; the choice can no longer change.
    pub show_feedback: bool,
    /// Reflection draft.
    pub reflection_text: String,
    /// Selected option per quiz question.
    pub quiz_answers: Vec<Option<usize>>,
    /// The quiz has been scored and is review-only.
    pub quiz_submitted: bool,
    /// The scene was completed earlier and is shown read-only.
    pub review: bool,
}

/// A cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SceneChange {
    /// Index left.
    pub from: usize,
    /// Index entered.
    pub to: usize,
    /// First time the entered scene is shown in this session.
    pub first_visit: bool,
}

/// Result of the explicit finalize action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The module was finalized by this call.
    Finalized {
        /// Score handed to persistence.
        total_score: u32,
        /// Whether the passing threshold was met.
        passed: bool,
    },
    /// A previous call already finalized the module.
    AlreadyFinalized,
}

/// Everything needed to open a run.
#[derive(Debug, Clone)]
pub struct RunSetup {
    /// Identifier of the new run.
    pub run_id: Uuid,
    /// Candidate taking the module.
    pub candidate_id: Uuid,
    /// Module resolved from the catalog.
    pub module: Arc<Module>,
    /// Attempt information from the retake lookup.
    pub retake: RetakeStatus,
    /// Fingerprint of the catalog the module came from.
    pub catalog_version: String,
}

/// Drives one candidate through one module.
#[derive(Debug)]
pub struct SceneEngine {
    module: Arc<Module>,
    scenes: Vec<Scene>,
    run: TrainingRun,
    interaction: InteractionState,
    visited: Vec<bool>,
}

impl SceneEngine {
    /// Opens a run at scene 0 over the module's scenes with `variations`
    /// overlaid.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the module has no scenes.
    pub fn start(
        setup: RunSetup,
        variations: &VariationMap,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let scenes = resolve_all(&setup.module.scenes, variations);
        let mut run = TrainingRun::new(setup.run_id);
        run.start(
            setup.candidate_id,
            &setup.module.id,
            scenes.iter().map(|scene| scene.id.clone()).collect(),
            setup.retake,
            &setup.catalog_version,
            correlation_id,
            clock,
        )?;

        let mut visited = vec![false; scenes.len()];
        visited[0] = true;
        let mut engine = Self {
            module: setup.module,
            scenes,
            run,
            interaction: InteractionState::default(),
            visited,
        };
        engine.interaction = engine.interaction_for(0);
        debug!(run_id = %engine.run.id, module_id = %engine.module.id, "scene engine started");
        Ok(engine)
    }

    /// Advances to the following scene, completing the current one with a
    /// zero score if it has no completion yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on the last scene.
    pub fn go_to_next(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SceneChange, DomainError> {
        let current = self.current_index();
        if current + 1 >= self.scenes.len() {
            return Err(DomainError::Validation(
                "already at the last scene".to_owned(),
            ));
        }

        if !self.current_completed() && !self.run.is_module_completed() {
            self.run
                .complete_scene(current, 0, None, correlation_id, clock)?;
        }
        self.enter(current + 1, correlation_id, clock)
    }

    /// Steps back one scene. Progress is left as is.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on the first scene.
    pub fn go_to_previous(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SceneChange, DomainError> {
        let current = self.current_index();
        if current == 0 {
            return Err(DomainError::Validation(
                "already at the first scene".to_owned(),
            ));
        }
        self.enter(current - 1, correlation_id, clock)
    }

    /// Jumps to an unlocked scene.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `index` is out of range or locked.
    pub fn navigate_to(
        &mut self,
        index: usize,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SceneChange, DomainError> {
        if index >= self.scenes.len() {
            return Err(DomainError::Validation(format!(
                "scene index {index} is out of range"
            )));
        }
        if !self.is_unlocked(index) {
            return Err(DomainError::Validation(format!(
                "scene {index} is locked"
            )));
        }
        let current = self.current_index();
        if index == current {
            return Ok(SceneChange {
                from: current,
                to: current,
                first_visit: false,
            });
        }
        self.enter(index, correlation_id, clock)
    }

    /// Scene 0 is always unlocked; scene `i` is unlocked once scene `i - 1`
    /// is completed.
    #[must_use]
    pub fn is_unlocked(&self, index: usize) -> bool {
        match index {
            0 => !self.scenes.is_empty(),
            i if i < self.scenes.len() => self.run.progress().is_completed(&self.scenes[i - 1].id),
            _ => false,
        }
    }

    /// Picks a choice option without submitting it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside a choice scene, after
    /// feedback is shown, or for an unknown option.
    pub fn select_choice(&mut self, choice_id: &str) -> Result<(), DomainError> {
        self.ensure_scoring_open()?;
        let scene = self.expect_kind(SceneKind::Choice)?;
        if self.interaction.show_feedback {
            return Err(DomainError::Validation(
                "choice has already been submitted".to_owned(),
            ));
        }
        if scene.choice(choice_id).is_none() {
            return Err(DomainError::Validation(format!(
                "unknown choice {choice_id}"
            )));
        }
        self.interaction.selected_choice = Some(choice_id.to_owned());
        Ok(())
    }

    /// Scores the selected option and reveals feedback. Does not advance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if nothing is selected or the
    /// choice was already submitted.
    pub fn submit_choice(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<u32, DomainError> {
        self.ensure_scoring_open()?;
        let scene = self.expect_kind(SceneKind::Choice)?;
        if self.interaction.show_feedback {
            return Err(DomainError::Validation(
                "choice has already been submitted".to_owned(),
            ));
        }
        let choice = self
            .interaction
            .selected_choice
            .as_deref()
            .and_then(|choice_id| scene.choice(choice_id))
            .ok_or_else(|| DomainError::Validation("no choice selected".to_owned()))?;
        let (choice_id, points) = (choice.id.clone(), choice.points);

        self.run.complete_scene(
            self.current_index(),
            points,
            Some(SceneResponse::Choice(choice_id)),
            correlation_id,
            clock,
        )?;
        self.interaction.show_feedback = true;
        Ok(points)
    }

    /// Replaces the reflection draft.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside an open reflection scene.
    pub fn set_reflection_text(&mut self, text: &str) -> Result<(), DomainError> {
        self.ensure_scoring_open()?;
        self.expect_kind(SceneKind::Reflection)?;
        if self.interaction.review {
            return Err(DomainError::Validation(
                "reflection has already been submitted".to_owned(),
            ));
        }
        text.clone_into(&mut self.interaction.reflection_text);
        Ok(())
    }

    /// Scores the reflection with a fixed [`REFLECTION_POINTS`] and advances
    /// when a following scene exists.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the draft is shorter than the
    /// prompt's minimum length or the reflection was already submitted.
    pub fn submit_reflection(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Option<SceneChange>, DomainError> {
        self.ensure_scoring_open()?;
        let scene = self.expect_kind(SceneKind::Reflection)?;
        if self.interaction.review {
            return Err(DomainError::Validation(
                "reflection has already been submitted".to_owned(),
            ));
        }
        let min_length = scene.reflection.as_ref().map_or(0, |prompt| prompt.min_length);
        let length = self.interaction.reflection_text.chars().count();
        if length < min_length {
            return Err(DomainError::Validation(format!(
                "reflection needs at least {min_length} characters, got {length}"
            )));
        }

        self.run.complete_scene(
            self.current_index(),
            REFLECTION_POINTS,
            Some(SceneResponse::Reflection(
                self.interaction.reflection_text.clone(),
            )),
            correlation_id,
            clock,
        )?;
        self.interaction.review = true;

        if self.current_index() + 1 < self.scenes.len() {
            self.go_to_next(correlation_id, clock).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replaces the draft with `text` and submits it in one step. A rejected
    /// submission leaves the previous draft untouched.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_reflection_text`] and [`Self::submit_reflection`].
    pub fn submit_reflection_text(
        &mut self,
        text: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Option<SceneChange>, DomainError> {
        let previous = self.interaction.reflection_text.clone();
        self.set_reflection_text(text)?;
        match self.submit_reflection(correlation_id, clock) {
            Ok(change) => Ok(change),
            Err(e) => {
                self.interaction.reflection_text = previous;
                Err(e)
            }
        }
    }

    /// Records the answer to one quiz question.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside a quiz scene, after
    /// submission, or for an out-of-range question or option.
    pub fn answer_question(&mut self, question: usize, option: usize) -> Result<(), DomainError> {
        self.ensure_scoring_open()?;
        let scene = self.expect_kind(SceneKind::Quiz)?;
        if self.interaction.quiz_submitted {
            return Err(DomainError::Validation(
                "quiz has already been submitted".to_owned(),
            ));
        }
        let options = scene
            .quiz
            .as_deref()
            .and_then(|questions| questions.get(question))
            .map(|q| q.options.len())
            .ok_or_else(|| DomainError::Validation(format!("unknown question {question}")))?;
        if option >= options {
            return Err(DomainError::Validation(format!(
                "question {question} has no option {option}"
            )));
        }
        self.interaction.quiz_answers[question] = Some(option);
        Ok(())
    }

    /// Scores the quiz once every question is answered. Does not advance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any question is unanswered or
    /// the quiz was already submitted.
    pub fn submit_quiz(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<u32, DomainError> {
        self.ensure_scoring_open()?;
        let scene = self.expect_kind(SceneKind::Quiz)?;
        if self.interaction.quiz_submitted {
            return Err(DomainError::Validation(
                "quiz has already been submitted".to_owned(),
            ));
        }
        let questions = scene.quiz.as_deref().unwrap_or_default();
        let answers: Vec<usize> = self
            .interaction
            .quiz_answers
            .iter()
            .copied()
            .collect::<Option<_>>()
            .filter(|answers: &Vec<usize>| answers.len() >= questions.len())
            .ok_or_else(|| {
                DomainError::Validation("every question needs an answer".to_owned())
            })?;

        let correct = questions
            .iter()
            .zip(&answers)
            .filter(|(question, answer)| question.correct_index == **answer)
            .count();
        let score = quiz_score(correct, questions.len());

        self.run.complete_scene(
            self.current_index(),
            score,
            Some(SceneResponse::Quiz(answers)),
            correlation_id,
            clock,
        )?;
        self.interaction.quiz_submitted = true;
        Ok(score)
    }

    /// Finalizes the module from its completion scene. Repeated calls report
    /// `AlreadyFinalized` and change nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the current scene is not a
    /// completion scene.
    pub fn complete_module(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<FinalizeOutcome, DomainError> {
        if self.run.is_module_completed() {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }
        self.expect_kind(SceneKind::Completion)?;

        if !self.current_completed() {
            self.run
                .complete_scene(self.current_index(), 0, None, correlation_id, clock)?;
        }
        let total_score = self.run.total_score();
        let passed = self.module.is_passing(total_score);
        self.run.complete_module(passed, correlation_id, clock)?;
        debug!(run_id = %self.run.id, total_score, passed, "module finalized");
        Ok(FinalizeOutcome::Finalized {
            total_score,
            passed,
        })
    }

    fn enter(
        &mut self,
        to: usize,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SceneChange, DomainError> {
        let from = self.current_index();
        self.run.enter_scene(to, correlation_id, clock)?;
        self.interaction = self.interaction_for(to);
        let first_visit = !std::mem::replace(&mut self.visited[to], true);
        debug!(run_id = %self.run.id, from, to, first_visit, "scene entered");
        Ok(SceneChange {
            from,
            to,
            first_visit,
        })
    }

    /// Fresh interaction state for `index`, hydrated read-only from progress
    /// when the scene is already completed.
    fn interaction_for(&self, index: usize) -> InteractionState {
        let scene = &self.scenes[index];
        let mut state = InteractionState {
            quiz_answers: vec![None; scene.question_count()],
            ..InteractionState::default()
        };
        let Some(entry) = self
            .run
            .progress()
            .get(&scene.id)
            .filter(|entry| entry.completed)
        else {
            return state;
        };

        state.review = true;
        state.show_feedback = scene.kind == SceneKind::Choice;
        state.quiz_submitted = scene.kind == SceneKind::Quiz;
        match &entry.response {
            Some(SceneResponse::Choice(choice_id)) => {
                state.selected_choice = Some(choice_id.clone());
            }
            Some(SceneResponse::Reflection(text)) => text.clone_into(&mut state.reflection_text),
            Some(SceneResponse::Quiz(answers)) => {
                state.quiz_answers = answers.iter().copied().map(Some).collect();
            }
            None => {}
        }
        state
    }

    fn current_completed(&self) -> bool {
        self.run
            .progress()
            .is_completed(&self.current_scene().id)
    }

    fn expect_kind(&self, kind: SceneKind) -> Result<&Scene, DomainError> {
        let scene = self.current_scene();
        if scene.kind == kind {
            Ok(scene)
        } else {
            Err(DomainError::Validation(format!(
                "scene {} is not a {kind:?} scene",
                scene.id
            )))
        }
    }

    fn ensure_scoring_open(&self) -> Result<(), DomainError> {
        if self.run.is_module_completed() {
            Err(DomainError::Validation(
                "module is already completed".to_owned(),
            ))
        } else {
            Ok(())
        }
    }

    /// Hands recorded events over for persistence.
    pub fn take_uncommitted_events(&mut self) -> (i64, Vec<StoredEvent>) {
        self.run.take_uncommitted_events()
    }

    /// The module being taken.
    #[must_use]
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Effective scenes, with retake variations applied.
    #[must_use]
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// The run aggregate.
    #[must_use]
    pub fn run(&self) -> &TrainingRun {
        &self.run
    }

    /// Index of the scene on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.run.current_index()
    }

    /// The scene on screen.
    #[must_use]
    pub fn current_scene(&self) -> &Scene {
        &self.scenes[self.current_index()]
    }

    /// Transient input state of the scene on screen.
    #[must_use]
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Per-scene progress.
    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        self.run.progress()
    }

    /// Running total score.
    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.run.total_score()
    }

    /// Whether the module has been finalized.
    #[must_use]
    pub fn is_module_completed(&self) -> bool {
        self.run.is_module_completed()
    }
}
