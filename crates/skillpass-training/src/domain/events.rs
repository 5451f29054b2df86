//! Domain events for the Training Player context.

use serde::{Deserialize, Serialize};
use skillpass_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use super::progress::SceneResponse;

/// Event type name for [`RunStarted`].
pub const RUN_STARTED_EVENT_TYPE: &str = "training.run_started";
/// Event type name for [`SceneEntered`].
pub const SCENE_ENTERED_EVENT_TYPE: &str = "training.scene_entered";
/// Event type name for [`SceneCompleted`].
pub const SCENE_COMPLETED_EVENT_TYPE: &str = "training.scene_completed";
/// Event type name for [`ModuleCompleted`].
pub const MODULE_COMPLETED_EVENT_TYPE: &str = "training.module_completed";

/// Emitted when a candidate opens a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStarted {
    /// The run identifier.
    pub run_id: Uuid,
    /// The candidate taking the module.
    pub candidate_id: Uuid,
    /// The catalog module id.
    pub module_id: String,
    /// Scene ids in traversal order.
    pub scene_ids: Vec<String>,
    /// One-based attempt number.
    pub attempt_number: u32,
    /// Whether the module was attempted before.
    pub is_retake: bool,
    /// Catalog fingerprint the scenes were taken from.
    pub catalog_version: String,
}

/// Emitted whenever the cursor moves to another scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntered {
    /// The run identifier.
    pub run_id: Uuid,
    /// Index the cursor left.
    pub from_index: usize,
    /// Index the cursor arrived at.
    pub to_index: usize,
}

/// Emitted when a scene's progress entry is completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCompleted {
    /// The run identifier.
    pub run_id: Uuid,
    /// Index of the completed scene.
    pub scene_index: usize,
    /// Id of the completed scene.
    pub scene_id: String,
    /// Points earned.
    pub score: u32,
    /// Captured input, absent for implicit completions.
    pub response: Option<SceneResponse>,
}

/// Emitted once when the candidate finalizes the module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCompleted {
    /// The run identifier.
    pub run_id: Uuid,
    /// Final total score.
    pub total_score: u32,
    /// Whether the passing threshold was met.
    pub passed: bool,
}

/// Event payload variants for the Training Player context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainingEventKind {
    /// A run has started.
    RunStarted(RunStarted),
    /// The cursor moved.
    SceneEntered(SceneEntered),
    /// A scene was completed.
    SceneCompleted(SceneCompleted),
    /// The module was finalized.
    ModuleCompleted(ModuleCompleted),
}

impl TrainingEventKind {
    /// Event type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted(_) => RUN_STARTED_EVENT_TYPE,
            Self::SceneEntered(_) => SCENE_ENTERED_EVENT_TYPE,
            Self::SceneCompleted(_) => SCENE_COMPLETED_EVENT_TYPE,
            Self::ModuleCompleted(_) => MODULE_COMPLETED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Training Player context.
#[derive(Debug, Clone)]
pub struct TrainingEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: TrainingEventKind,
}

impl DomainEvent for TrainingEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("TrainingEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
