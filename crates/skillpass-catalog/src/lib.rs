//! Skillpass — Training Module Catalog bounded context.
//!
//! Owns the static catalog of behavioral training modules: their ordered
//! scenes and typed scene payloads, loading and validation of the catalog
//! source, lookup by id or slug, and light-markdown rendering of scene
//! bodies. The catalog is immutable once loaded.

pub mod application;
pub mod domain;
pub mod error;

pub use domain::catalog::ModuleCatalog;
pub use domain::markup;
pub use domain::model::{
    Character, Choice, Module, Question, ReflectionPrompt, Scene, SceneKind, SceneOverride,
};
pub use error::CatalogError;

#[cfg(test)]
mod tests {
    #[test]
    fn test_markup_is_reachable_from_crate_root() {
        assert_eq!(crate::markup::plain_text("**Pause** first."), "Pause first.");
        assert_eq!(
            crate::markup::render_html("**Pause** first."),
            "<p><strong>Pause</strong> first.</p>\n"
        );
    }
}
