//! Collaborator ports that depend on scene content.

use async_trait::async_trait;
use skillpass_catalog::Scene;
use skillpass_core::error::DomainError;

use crate::domain::variation::VariationMap;

/// Input of a retake content generation.
#[derive(Debug, Clone, Copy)]
pub struct VariationRequest<'a> {
    /// Title of the module being retaken.
    pub module_title: &'a str,
    /// Competencies the module assesses.
    pub competencies: &'a [String],
    /// Catalog scenes to vary.
    pub base_scenes: &'a [Scene],
    /// One-based attempt number, at least 2.
    pub attempt_number: u32,
}

/// Produces replacement scene content for retake attempts.
#[async_trait]
pub trait VariationGenerator: Send + Sync {
    /// Returns overrides keyed by scene id. Scenes without an entry keep
    /// their catalog content.
    async fn generate_varied_scenes(
        &self,
        request: VariationRequest<'_>,
    ) -> Result<VariationMap, DomainError>;
}
