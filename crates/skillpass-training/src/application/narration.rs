//! Narration adapter for deployments without a speech engine.

use skillpass_core::ports::Narrator;
use tracing::debug;

/// Logs narration requests instead of speaking them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNarrator;

impl Narrator for TracingNarrator {
    fn speak(&self, text: &str) {
        debug!(chars = text.chars().count(), "narration requested");
    }

    fn cancel(&self) {
        debug!("narration cancelled");
    }
}
