//! Query handlers for the training player.
//!
//! Live sessions are projected into a player view; finished or abandoned
//! runs are reconstituted from their stored events.

use serde::Serialize;
use skillpass_catalog::markup::render_html;
use skillpass_catalog::{Character, Scene, SceneKind};
use skillpass_core::aggregate::AggregateRoot;
use skillpass_core::error::DomainError;
use skillpass_core::repository::{EventRepository, StoredEvent};
use uuid::Uuid;

use crate::application::session::TrainingSession;
use crate::domain::engine::{InteractionState, SceneEngine};
use crate::domain::events::{TrainingEvent, TrainingEventKind};
use crate::domain::progress::SceneProgressEntry;
use crate::domain::run::TrainingRun;
use crate::domain::timer::TimerState;

/// A choice option as shown to the candidate. Correctness, feedback and
/// points appear only once the choice is submitted.
#[derive(Debug, Serialize)]
pub struct ChoiceView {
    /// Option id.
    pub id: String,
    /// Option text.
    pub text: String,
    /// Whether this is the recommended option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Feedback text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Points of the option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

/// A quiz question. The answer key appears only once the quiz is submitted.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    /// Question text.
    pub text: String,
    /// Options in display order.
    pub options: Vec<String>,
    /// Index of the correct option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<usize>,
    /// Explanation, shown for wrong answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Reflection prompt.
#[derive(Debug, Serialize)]
pub struct ReflectionView {
    /// The prompt.
    pub prompt: String,
    /// Minimum length in characters.
    pub min_length: usize,
}

/// The effective scene on screen.
#[derive(Debug, Serialize)]
pub struct SceneView {
    /// Scene id.
    pub id: String,
    /// Scene type.
    pub kind: SceneKind,
    /// Title.
    pub title: String,
    /// Body rendered to HTML.
    pub content_html: String,
    /// Speaking character.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
    /// Setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    /// Choice options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceView>>,
    /// Quiz questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuestionView>>,
    /// Reflection prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<ReflectionView>,
}

/// Sidebar entry for one scene.
#[derive(Debug, Serialize)]
pub struct SceneStatusView {
    /// Scene id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Scene type.
    pub kind: SceneKind,
    /// Whether direct navigation is allowed.
    pub unlocked: bool,
    /// Whether the scene is completed.
    pub completed: bool,
    /// Points earned.
    pub score: u32,
}

/// Read-only view of a live session.
#[derive(Debug, Serialize)]
pub struct TrainingSessionView {
    /// The run identifier.
    pub run_id: Uuid,
    /// Module id.
    pub module_id: String,
    /// Module title.
    pub module_title: String,
    /// One-based attempt number.
    pub attempt_number: u32,
    /// Whether this is a retake.
    pub is_retake: bool,
    /// Cursor position.
    pub current_index: usize,
    /// Scene on screen.
    pub current_scene: SceneView,
    /// Every scene with its lock and progress state.
    pub scenes: Vec<SceneStatusView>,
    /// Transient input state.
    pub interaction: InteractionState,
    /// Running total score.
    pub total_score: u32,
    /// Maximum achievable score.
    pub total_points: u32,
    /// Score needed to pass.
    pub passing_score: u32,
    /// Whether the module has been finalized.
    pub module_completed: bool,
    /// Countdown state.
    pub timer: TimerState,
}

fn scene_view(scene: &Scene, interaction: &InteractionState) -> SceneView {
    let reveal_choice = interaction.show_feedback;
    let reveal_quiz = interaction.quiz_submitted;
    SceneView {
        id: scene.id.clone(),
        kind: scene.kind,
        title: scene.title.clone(),
        content_html: render_html(&scene.content),
        character: scene.character.clone(),
        setting: scene.setting.clone(),
        choices: scene.choices.as_ref().map(|choices| {
            choices
                .iter()
                .map(|choice| ChoiceView {
                    id: choice.id.clone(),
                    text: choice.text.clone(),
                    is_correct: reveal_choice.then_some(choice.is_correct),
                    feedback: reveal_choice.then(|| choice.feedback.clone()),
                    points: reveal_choice.then_some(choice.points),
                })
                .collect()
        }),
        quiz: scene.quiz.as_ref().map(|questions| {
            questions
                .iter()
                .map(|question| QuestionView {
                    text: question.text.clone(),
                    options: question.options.clone(),
                    correct_index: reveal_quiz.then_some(question.correct_index),
                    explanation: reveal_quiz.then(|| question.explanation.clone()),
                })
                .collect()
        }),
        reflection: scene.reflection.as_ref().map(|prompt| ReflectionView {
            prompt: prompt.prompt.clone(),
            min_length: prompt.min_length,
        }),
    }
}

fn scene_statuses(engine: &SceneEngine) -> Vec<SceneStatusView> {
    engine
        .scenes()
        .iter()
        .enumerate()
        .map(|(index, scene)| {
            let entry = engine.progress().get(&scene.id);
            SceneStatusView {
                id: scene.id.clone(),
                title: scene.title.clone(),
                kind: scene.kind,
                unlocked: engine.is_unlocked(index),
                completed: entry.is_some_and(|e| e.completed),
                score: entry.map_or(0, |e| e.score),
            }
        })
        .collect()
}

/// Projects a live session.
#[must_use]
pub fn session_view(session: &TrainingSession) -> TrainingSessionView {
    let engine = session.engine();
    let module = engine.module();
    let retake = engine.run().retake();
    TrainingSessionView {
        run_id: session.run_id(),
        module_id: module.id.clone(),
        module_title: module.title.clone(),
        attempt_number: retake.attempt_number,
        is_retake: retake.is_retake,
        current_index: engine.current_index(),
        current_scene: scene_view(engine.current_scene(), engine.interaction()),
        scenes: scene_statuses(engine),
        interaction: engine.interaction().clone(),
        total_score: engine.total_score(),
        total_points: module.total_points,
        passing_score: module.passing_score,
        module_completed: engine.is_module_completed(),
        timer: session.timer_state(),
    }
}

/// Read-only view of a run rebuilt from its events.
#[derive(Debug, Serialize)]
pub struct TrainingRunView {
    /// The run identifier.
    pub run_id: Uuid,
    /// The candidate.
    pub candidate_id: Option<Uuid>,
    /// Module id.
    pub module_id: Option<String>,
    /// One-based attempt number.
    pub attempt_number: u32,
    /// Catalog fingerprint at start.
    pub catalog_version: Option<String>,
    /// Last cursor position.
    pub current_index: usize,
    /// Progress entries in scene order.
    pub progress: Vec<SceneProgressEntry>,
    /// Total score.
    pub total_score: u32,
    /// Whether the module was finalized.
    pub module_completed: bool,
    /// Whether the finalized score passed.
    pub passed: bool,
    /// Number of stored events.
    pub version: i64,
}

/// Rebuilds a `TrainingRun` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    run_id: Uuid,
    stored_events: &[StoredEvent],
) -> Result<TrainingRun, DomainError> {
    let mut run = TrainingRun::new(run_id);
    for stored in stored_events {
        let kind: TrainingEventKind =
            serde_json::from_value(stored.payload.clone()).map_err(|e| {
                DomainError::Infrastructure(format!("event deserialization failed: {e}"))
            })?;
        run.apply(&TrainingEvent {
            metadata: stored.metadata(),
            kind,
        });
    }
    Ok(run)
}

/// Retrieves a run by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if loading or deserialization fails.
pub async fn get_run_by_id(
    run_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<TrainingRunView, DomainError> {
    let stored_events = repo.load_events(run_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(run_id));
    }
    let run = reconstitute(run_id, &stored_events)?;
    Ok(TrainingRunView {
        run_id,
        candidate_id: run.candidate_id(),
        module_id: run.module_id().map(str::to_owned),
        attempt_number: run.retake().attempt_number,
        catalog_version: run.catalog_version().map(str::to_owned),
        current_index: run.current_index(),
        progress: run.progress().entries().cloned().collect(),
        total_score: run.total_score(),
        module_completed: run.is_module_completed(),
        passed: run.passed(),
        version: run.version(),
    })
}
