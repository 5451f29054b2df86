//! Aggregate root for a candidate's run through a module.

use skillpass_core::aggregate::AggregateRoot;
use skillpass_core::clock::Clock;
use skillpass_core::error::DomainError;
use skillpass_core::event::EventMetadata;
use skillpass_core::ports::RetakeStatus;
use skillpass_core::repository::StoredEvent;
use uuid::Uuid;

use super::events::{
    ModuleCompleted, RunStarted, SceneCompleted, SceneEntered, TrainingEvent, TrainingEventKind,
};
use super::progress::{ProgressTracker, SceneProgressEntry, SceneResponse};

/// The aggregate root for a training run.
///
/// Holds the durable part of a session: the cursor, per-scene progress,
/// the running score and the finalization flag. Recorded events are applied
/// immediately so the aggregate is always current.
#[derive(Debug)]
pub struct TrainingRun {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (committed event count).
    pub(crate) version: i64,
    pub(crate) candidate_id: Option<Uuid>,
    pub(crate) module_id: Option<String>,
    pub(crate) scene_ids: Vec<String>,
    pub(crate) retake: RetakeStatus,
    pub(crate) catalog_version: Option<String>,
    pub(crate) current_index: usize,
    pub(crate) progress: ProgressTracker,
    pub(crate) total_score: u32,
    pub(crate) module_completed: bool,
    pub(crate) passed: bool,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<TrainingEvent>,
}

impl TrainingRun {
    /// Creates an empty run.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            candidate_id: None,
            module_id: None,
            scene_ids: Vec::new(),
            retake: RetakeStatus::FIRST_ATTEMPT,
            catalog_version: None,
            current_index: 0,
            progress: ProgressTracker::default(),
            total_score: 0,
            module_completed: false,
            passed: false,
            uncommitted_events: Vec::new(),
        }
    }

    fn record(&mut self, kind: TrainingEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = TrainingEvent {
            metadata: EventMetadata::new(
                kind.event_type(),
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock.now(),
            ),
            kind,
        };
        self.mutate(&event.kind);
        self.uncommitted_events.push(event);
    }

    fn mutate(&mut self, kind: &TrainingEventKind) {
        match kind {
            TrainingEventKind::RunStarted(payload) => {
                self.candidate_id = Some(payload.candidate_id);
                self.module_id = Some(payload.module_id.clone());
                self.scene_ids.clone_from(&payload.scene_ids);
                self.retake = RetakeStatus {
                    is_retake: payload.is_retake,
                    attempt_number: payload.attempt_number,
                };
                self.catalog_version = Some(payload.catalog_version.clone());
                self.current_index = 0;
                self.progress = ProgressTracker::initialize(payload.scene_ids.iter().cloned());
            }
            TrainingEventKind::SceneEntered(payload) => {
                self.current_index = payload.to_index;
            }
            TrainingEventKind::SceneCompleted(payload) => {
                self.progress.record(SceneProgressEntry::completed(
                    payload.scene_id.clone(),
                    payload.score,
                    payload.response.clone(),
                ));
                self.total_score += payload.score;
            }
            TrainingEventKind::ModuleCompleted(payload) => {
                self.module_completed = true;
                self.passed = payload.passed;
            }
        }
    }

    /// Starts the run over the given scenes, producing a `RunStarted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the run was already started or
    /// `scene_ids` is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        candidate_id: Uuid,
        module_id: &str,
        scene_ids: Vec<String>,
        retake: RetakeStatus,
        catalog_version: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.is_started() {
            return Err(DomainError::Validation(format!(
                "run {} has already started",
                self.id
            )));
        }
        if scene_ids.is_empty() {
            return Err(DomainError::Validation(format!(
                "module {module_id} has no scenes"
            )));
        }

        self.record(
            TrainingEventKind::RunStarted(RunStarted {
                run_id: self.id,
                candidate_id,
                module_id: module_id.to_owned(),
                scene_ids,
                attempt_number: retake.attempt_number,
                is_retake: retake.is_retake,
                catalog_version: catalog_version.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Moves the cursor, producing a `SceneEntered` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the run has not started or
    /// `to_index` is out of range.
    pub fn enter_scene(
        &mut self,
        to_index: usize,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_started()?;
        if to_index >= self.scene_ids.len() {
            return Err(DomainError::Validation(format!(
                "scene index {to_index} is out of range"
            )));
        }

        self.record(
            TrainingEventKind::SceneEntered(SceneEntered {
                run_id: self.id,
                from_index: self.current_index,
                to_index,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Completes a scene with `score`, producing a `SceneCompleted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the index is out of range, the
    /// scene is already completed, or the module has been finalized.
    pub fn complete_scene(
        &mut self,
        scene_index: usize,
        score: u32,
        response: Option<SceneResponse>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        let scene_id = self.scene_ids.get(scene_index).cloned().ok_or_else(|| {
            DomainError::Validation(format!("scene index {scene_index} is out of range"))
        })?;
        if self.progress.is_completed(&scene_id) {
            return Err(DomainError::Validation(format!(
                "scene {scene_id} is already completed"
            )));
        }

        self.record(
            TrainingEventKind::SceneCompleted(SceneCompleted {
                run_id: self.id,
                scene_index,
                scene_id,
                score,
                response,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Finalizes the module, producing a `ModuleCompleted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the module was already finalized.
    pub fn complete_module(
        &mut self,
        passed: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;

        self.record(
            TrainingEventKind::ModuleCompleted(ModuleCompleted {
                run_id: self.id,
                total_score: self.total_score,
                passed,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    fn ensure_started(&self) -> Result<(), DomainError> {
        if self.is_started() {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "run {} has not started",
                self.id
            )))
        }
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        self.ensure_started()?;
        if self.module_completed {
            return Err(DomainError::Validation(format!(
                "run {} is already completed",
                self.id
            )));
        }
        Ok(())
    }

    /// Hands the uncommitted events over for persistence.
    ///
    /// Returns the version the stream had before these events, which is the
    /// expected version for the append.
    pub fn take_uncommitted_events(&mut self) -> (i64, Vec<StoredEvent>) {
        self.take_uncommitted()
    }

    /// Whether `RunStarted` has been recorded.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.module_id.is_some()
    }

    /// The candidate taking the module.
    #[must_use]
    pub fn candidate_id(&self) -> Option<Uuid> {
        self.candidate_id
    }

    /// The module being taken.
    #[must_use]
    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Retake status recorded at start.
    #[must_use]
    pub fn retake(&self) -> RetakeStatus {
        self.retake
    }

    /// Catalog fingerprint recorded at start.
    #[must_use]
    pub fn catalog_version(&self) -> Option<&str> {
        self.catalog_version.as_deref()
    }

    /// Index of the current scene.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Number of scenes in the run.
    #[must_use]
    pub fn scene_count(&self) -> usize {
        self.scene_ids.len()
    }

    /// Scene ids in order.
    #[must_use]
    pub fn scene_ids(&self) -> &[String] {
        &self.scene_ids
    }

    /// Per-scene progress.
    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Running total score.
    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    /// Whether the module has been finalized.
    #[must_use]
    pub fn is_module_completed(&self) -> bool {
        self.module_completed
    }

    /// Whether the finalized score met the passing threshold.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }
}

impl AggregateRoot for TrainingRun {
    type Event = TrainingEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn clear_uncommitted_events(&mut self) {
        self.version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skillpass_core::event::DomainEvent;
    use skillpass_test_support::FixedClock;

    use crate::domain::events::{
        MODULE_COMPLETED_EVENT_TYPE, RUN_STARTED_EVENT_TYPE, SCENE_COMPLETED_EVENT_TYPE,
        SCENE_ENTERED_EVENT_TYPE,
    };

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn started_run() -> TrainingRun {
        let mut run = TrainingRun::new(Uuid::new_v4());
        run.start(
            Uuid::new_v4(),
            "mod-a",
            vec!["s0".to_owned(), "s1".to_owned(), "s2".to_owned()],
            RetakeStatus::FIRST_ATTEMPT,
            "hash",
            Uuid::new_v4(),
            &fixed_clock(),
        )
        .unwrap();
        run
    }

    #[test]
    fn test_start_produces_run_started_event_and_zeroed_progress() {
        // Arrange
        let run_id = Uuid::new_v4();
        let candidate_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let clock = fixed_clock();
        let mut run = TrainingRun::new(run_id);

        // Act
        run.start(
            candidate_id,
            "mod-a",
            vec!["s0".to_owned(), "s1".to_owned()],
            RetakeStatus {
                is_retake: true,
                attempt_number: 2,
            },
            "hash",
            correlation_id,
            &clock,
        )
        .unwrap();

        // Assert
        let events = run.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), RUN_STARTED_EVENT_TYPE);

        let meta = events[0].metadata();
        assert_eq!(meta.aggregate_id, run_id);
        assert_eq!(meta.sequence_number, 1);
        assert_eq!(meta.correlation_id, correlation_id);
        assert_eq!(meta.causation_id, correlation_id);
        assert_eq!(meta.occurred_at, clock.0);

        assert_eq!(run.candidate_id(), Some(candidate_id));
        assert_eq!(run.retake().attempt_number, 2);
        assert_eq!(run.progress().len(), 2);
        assert_eq!(run.progress().completed_count(), 0);
        assert_eq!(run.current_index(), 0);
    }

    #[test]
    fn test_start_twice_returns_error() {
        let mut run = started_run();

        let result = run.start(
            Uuid::new_v4(),
            "mod-a",
            vec!["s0".to_owned()],
            RetakeStatus::FIRST_ATTEMPT,
            "hash",
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(run.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_start_without_scenes_returns_error() {
        let mut run = TrainingRun::new(Uuid::new_v4());

        let result = run.start(
            Uuid::new_v4(),
            "mod-a",
            Vec::new(),
            RetakeStatus::FIRST_ATTEMPT,
            "hash",
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(result.is_err());
        assert!(!run.is_started());
    }

    #[test]
    fn test_enter_scene_moves_cursor_and_sequences_events() {
        let mut run = started_run();

        run.enter_scene(1, Uuid::new_v4(), &fixed_clock()).unwrap();

        assert_eq!(run.current_index(), 1);
        let events = run.uncommitted_events();
        assert_eq!(events[1].event_type(), SCENE_ENTERED_EVENT_TYPE);
        assert_eq!(events[1].metadata().sequence_number, 2);
    }

    #[test]
    fn test_enter_scene_out_of_range_returns_error() {
        let mut run = started_run();

        let result = run.enter_scene(3, Uuid::new_v4(), &fixed_clock());

        assert!(result.is_err());
        assert_eq!(run.current_index(), 0);
    }

    #[test]
    fn test_complete_scene_accumulates_total_score() {
        let mut run = started_run();
        let clock = fixed_clock();

        run.complete_scene(0, 0, None, Uuid::new_v4(), &clock)
            .unwrap();
        run.complete_scene(
            1,
            30,
            Some(SceneResponse::Choice("a".to_owned())),
            Uuid::new_v4(),
            &clock,
        )
        .unwrap();

        assert_eq!(run.total_score(), 30);
        assert_eq!(run.total_score(), run.progress().total_score());
        assert_eq!(run.progress().completed_count(), 2);
        assert_eq!(
            run.uncommitted_events()[2].event_type(),
            SCENE_COMPLETED_EVENT_TYPE
        );
    }

    #[test]
    fn test_complete_scene_twice_returns_error_and_keeps_score() {
        let mut run = started_run();
        let clock = fixed_clock();
        run.complete_scene(1, 30, None, Uuid::new_v4(), &clock)
            .unwrap();

        let result = run.complete_scene(1, 30, None, Uuid::new_v4(), &clock);

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "scene s1 is already completed"),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(run.total_score(), 30);
    }

    #[test]
    fn test_complete_module_is_guarded() {
        let mut run = started_run();
        let clock = fixed_clock();

        run.complete_module(true, Uuid::new_v4(), &clock).unwrap();
        let second = run.complete_module(true, Uuid::new_v4(), &clock);

        assert!(second.is_err());
        assert!(run.is_module_completed());
        assert!(run.passed());
        assert_eq!(
            run.uncommitted_events().last().unwrap().event_type(),
            MODULE_COMPLETED_EVENT_TYPE
        );
    }

    #[test]
    fn test_complete_scene_after_module_completed_returns_error() {
        let mut run = started_run();
        let clock = fixed_clock();
        run.complete_module(false, Uuid::new_v4(), &clock).unwrap();

        let result = run.complete_scene(0, 0, None, Uuid::new_v4(), &clock);

        assert!(result.is_err());
    }

    #[test]
    fn test_take_uncommitted_events_advances_version() {
        let mut run = started_run();
        run.enter_scene(1, Uuid::new_v4(), &fixed_clock()).unwrap();

        let (expected_version, stored) = run.take_uncommitted_events();

        assert_eq!(expected_version, 0);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].sequence_number, 1);
        assert_eq!(stored[1].sequence_number, 2);
        assert_eq!(run.version(), 2);
        assert!(run.uncommitted_events().is_empty());

        run.enter_scene(2, Uuid::new_v4(), &fixed_clock()).unwrap();
        let (expected_version, stored) = run.take_uncommitted_events();
        assert_eq!(expected_version, 2);
        assert_eq!(stored[0].sequence_number, 3);
    }

    #[test]
    fn test_apply_replays_stored_history() {
        // Arrange
        let mut original = started_run();
        let clock = fixed_clock();
        original
            .complete_scene(0, 0, None, Uuid::new_v4(), &clock)
            .unwrap();
        original.enter_scene(1, Uuid::new_v4(), &clock).unwrap();
        original
            .complete_scene(
                1,
                20,
                Some(SceneResponse::Quiz(vec![0, 1])),
                Uuid::new_v4(),
                &clock,
            )
            .unwrap();
        let history: Vec<TrainingEvent> = original.uncommitted_events().to_vec();

        // Act
        let mut replayed = TrainingRun::new(original.id);
        for event in &history {
            replayed.apply(event);
        }

        // Assert
        assert_eq!(replayed.version(), 4);
        assert_eq!(replayed.current_index(), 1);
        assert_eq!(replayed.total_score(), 20);
        assert_eq!(replayed.progress().completed_count(), 2);
        assert_eq!(
            replayed.progress().get("s1").unwrap().response,
            Some(SceneResponse::Quiz(vec![0, 1]))
        );
    }
}
