//! Catalog loading and validation errors.

use skillpass_core::error::DomainError;
use thiserror::Error;

/// Why a catalog source was rejected.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("catalog could not be read: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog source is not valid YAML for the catalog schema.
    #[error("catalog could not be parsed: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Two modules share an id or a slug, or an id collides with a slug.
    #[error("duplicate module key `{0}`")]
    DuplicateModule(String),

    /// A module-level rule is violated.
    #[error("module `{module}` is invalid: {reason}")]
    InvalidModule {
        /// Offending module id.
        module: String,
        /// What is wrong.
        reason: String,
    },

    /// A scene-level rule is violated.
    #[error("scene `{scene}` of module `{module}` is invalid: {reason}")]
    InvalidScene {
        /// Owning module id.
        module: String,
        /// Offending scene id.
        scene: String,
        /// What is wrong.
        reason: String,
    },
}

impl From<CatalogError> for DomainError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Io(_) => Self::Infrastructure(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}
