//! Skillpass — Training Player bounded context.
//!
//! Drives a candidate through the ordered scenes of a training module:
//! sequential unlocking, per-scene-type submission and scoring, retake
//! content variation, and a countdown with a one-time overtime extension.
//! Durable facts are recorded as events of the `TrainingRun` aggregate and
//! shipped to persistence through an outbound queue that never blocks the
//! candidate.

pub mod application;
pub mod domain;
