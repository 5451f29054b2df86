//! Query handlers for the catalog context.
//!
//! The catalog is in memory, so these are plain functions returning
//! read-only view DTOs.

use serde::Serialize;
use skillpass_core::error::DomainError;

use crate::domain::catalog::ModuleCatalog;
use crate::domain::model::{Module, SceneKind};

/// Catalog listing entry.
#[derive(Debug, Serialize)]
pub struct ModuleSummaryView {
    /// The module identifier.
    pub id: String,
    /// The module slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short summary.
    pub description: String,
    /// Nominal duration string.
    pub duration: String,
    /// Maximum achievable score.
    pub total_points: u32,
    /// Score needed to pass.
    pub passing_score: u32,
    /// Competency tags.
    pub competencies: Vec<String>,
    /// Number of scenes.
    pub scene_count: usize,
}

/// Outline of a single scene, without its payload.
#[derive(Debug, Serialize)]
pub struct SceneOutlineView {
    /// The scene identifier.
    pub id: String,
    /// Scene type.
    pub kind: SceneKind,
    /// Scene title.
    pub title: String,
}

/// Module detail with its scene outline.
#[derive(Debug, Serialize)]
pub struct ModuleDetailView {
    /// Summary fields.
    #[serde(flatten)]
    pub summary: ModuleSummaryView,
    /// Scenes in order.
    pub scenes: Vec<SceneOutlineView>,
}

fn summarize(module: &Module) -> ModuleSummaryView {
    ModuleSummaryView {
        id: module.id.clone(),
        slug: module.slug.clone(),
        title: module.title.clone(),
        description: module.description.clone(),
        duration: module.duration.clone(),
        total_points: module.total_points,
        passing_score: module.passing_score,
        competencies: module.competencies.clone(),
        scene_count: module.scenes.len(),
    }
}

/// Lists every module in catalog order.
#[must_use]
pub fn list_modules(catalog: &ModuleCatalog) -> Vec<ModuleSummaryView> {
    catalog.modules().map(|module| summarize(module)).collect()
}

/// Retrieves a module by id or slug.
///
/// # Errors
///
/// Returns `DomainError::ModuleNotFound` if neither key matches.
pub fn get_module(
    catalog: &ModuleCatalog,
    id_or_slug: &str,
) -> Result<ModuleDetailView, DomainError> {
    let module = catalog
        .find(id_or_slug)
        .ok_or_else(|| DomainError::ModuleNotFound(id_or_slug.to_owned()))?;
    Ok(ModuleDetailView {
        summary: summarize(module),
        scenes: module
            .scenes
            .iter()
            .map(|scene| SceneOutlineView {
                id: scene.id.clone(),
                kind: scene.kind,
                title: scene.title.clone(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use skillpass_core::error::DomainError;

    use crate::application::query_handlers::{get_module, list_modules};
    use crate::domain::catalog::ModuleCatalog;

    #[test]
    fn test_list_modules_returns_every_module() {
        // Arrange
        let catalog = ModuleCatalog::builtin().unwrap();

        // Act
        let views = list_modules(&catalog);

        // Assert
        assert_eq!(views.len(), catalog.len());
        assert!(views.iter().all(|view| view.scene_count > 0));
    }

    #[test]
    fn test_get_module_by_slug_returns_outline() {
        // Arrange
        let catalog = ModuleCatalog::builtin().unwrap();

        // Act
        let view = get_module(&catalog, "giving-constructive-feedback").unwrap();

        // Assert
        assert_eq!(view.summary.id, "mod-constructive-feedback");
        assert_eq!(view.scenes.len(), view.summary.scene_count);
    }

    #[test]
    fn test_get_module_returns_not_found_for_unknown_key() {
        // Arrange
        let catalog = ModuleCatalog::builtin().unwrap();

        // Act
        let result = get_module(&catalog, "does-not-exist");

        // Assert
        match result.unwrap_err() {
            DomainError::ModuleNotFound(key) => assert_eq!(key, "does-not-exist"),
            other => panic!("expected ModuleNotFound, got {other:?}"),
        }
    }
}
