//! Scene progress tracker.
//!
//! One entry per scene of the module, created zeroed when the run starts.
//! Only the `TrainingRun` aggregate writes to it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What the candidate submitted for a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SceneResponse {
    /// Id of the submitted choice option.
    Choice(String),
    /// The reflection text as written.
    Reflection(String),
    /// Selected option index per question.
    Quiz(Vec<usize>),
}

/// Completion state of one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneProgressEntry {
    /// The scene this entry belongs to.
    pub scene_id: String,
    /// Whether the scene has been completed.
    pub completed: bool,
    /// Points earned; zero until completed.
    pub score: u32,
    /// Captured input, absent for implicit completions.
    pub response: Option<SceneResponse>,
}

impl SceneProgressEntry {
    /// A zeroed, not yet completed entry.
    #[must_use]
    pub fn pending(scene_id: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            completed: false,
            score: 0,
            response: None,
        }
    }

    /// A completed entry.
    #[must_use]
    pub fn completed(
        scene_id: impl Into<String>,
        score: u32,
        response: Option<SceneResponse>,
    ) -> Self {
        Self {
            scene_id: scene_id.into(),
            completed: true,
            score,
            response,
        }
    }
}

/// Keyed store of scene progress, iterated in scene order.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    order: Vec<String>,
    entries: HashMap<String, SceneProgressEntry>,
}

impl ProgressTracker {
    /// Populates a zeroed entry for every scene id.
    #[must_use]
    pub fn initialize<I, S>(scene_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracker = Self::default();
        for scene_id in scene_ids {
            let scene_id = scene_id.into();
            tracker.record(SceneProgressEntry::pending(scene_id));
        }
        tracker
    }

    /// Stores `entry`, replacing any previous entry for the same scene.
    pub(crate) fn record(&mut self, entry: SceneProgressEntry) -> Option<SceneProgressEntry> {
        if !self.entries.contains_key(&entry.scene_id) {
            self.order.push(entry.scene_id.clone());
        }
        self.entries.insert(entry.scene_id.clone(), entry)
    }

    /// Returns the entry for `scene_id`.
    #[must_use]
    pub fn get(&self, scene_id: &str) -> Option<&SceneProgressEntry> {
        self.entries.get(scene_id)
    }

    /// Whether `scene_id` has a completed entry.
    #[must_use]
    pub fn is_completed(&self, scene_id: &str) -> bool {
        self.get(scene_id).is_some_and(|entry| entry.completed)
    }

    /// Number of completed scenes.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.completed).count()
    }

    /// Sum of scores over completed entries.
    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.entries
            .values()
            .filter(|entry| entry.completed)
            .map(|entry| entry.score)
            .sum()
    }

    /// Entries in scene order.
    pub fn entries(&self) -> impl Iterator<Item = &SceneProgressEntry> {
        self.order.iter().filter_map(|scene_id| self.entries.get(scene_id))
    }

    /// Number of tracked scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no scenes are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_zeroed_entries_in_order() {
        let tracker = ProgressTracker::initialize(["a", "b", "c"]);

        let ids: Vec<&str> = tracker.entries().map(|e| e.scene_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(tracker.entries().all(|e| !e.completed && e.score == 0));
        assert_eq!(tracker.completed_count(), 0);
        assert_eq!(tracker.total_score(), 0);
    }

    #[test]
    fn test_record_replaces_existing_entry() {
        let mut tracker = ProgressTracker::initialize(["a", "b"]);

        let previous = tracker.record(SceneProgressEntry::completed(
            "b",
            30,
            Some(SceneResponse::Choice("x".to_owned())),
        ));

        assert_eq!(previous, Some(SceneProgressEntry::pending("b")));
        assert!(tracker.is_completed("b"));
        assert!(!tracker.is_completed("a"));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.total_score(), 30);
    }

    #[test]
    fn test_unknown_scene_is_not_completed() {
        let tracker = ProgressTracker::initialize(["a"]);

        assert!(!tracker.is_completed("zzz"));
        assert!(tracker.get("zzz").is_none());
    }

    #[test]
    fn test_response_serializes_with_type_tag() {
        let json = serde_json::to_value(SceneResponse::Quiz(vec![1, 0])).unwrap();

        assert_eq!(json, serde_json::json!({ "type": "quiz", "value": [1, 0] }));
    }
}
