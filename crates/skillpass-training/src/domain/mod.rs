//! Domain layer for the training player.

pub mod engine;
pub mod events;
pub mod progress;
pub mod run;
pub mod timer;
pub mod variation;
