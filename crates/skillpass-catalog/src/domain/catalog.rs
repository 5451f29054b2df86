//! Read-only module registry indexed by id and by slug.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use super::model::{Module, Question, Scene, SceneKind};
use crate::error::CatalogError;

/// Catalog compiled into the binary.
const BUILTIN_CATALOG: &str = include_str!("../../catalog/modules.yaml");

/// On-disk catalog shape.
#[derive(Debug, Deserialize)]
struct CatalogSource {
    modules: Vec<Module>,
}

/// Immutable, validated set of modules.
#[derive(Debug)]
pub struct ModuleCatalog {
    modules: Vec<Arc<Module>>,
    by_key: HashMap<String, usize>,
    version_hash: String,
}

impl ModuleCatalog {
    /// Parses and validates a YAML catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed YAML and the `Invalid*` /
    /// `DuplicateModule` variants when a content rule is violated.
    pub fn from_yaml(source: &str) -> Result<Self, CatalogError> {
        let parsed: CatalogSource = serde_yaml::from_str(source)?;
        Self::from_modules(parsed.modules, fingerprint(source))
    }

    /// Loads a YAML catalog from disk.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise as
    /// [`ModuleCatalog::from_yaml`].
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&source)?;
        info!(
            path = %path.display(),
            modules = catalog.len(),
            version = %catalog.version_hash,
            "loaded module catalog"
        );
        Ok(catalog)
    }

    /// The catalog shipped with the binary.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded catalog is itself invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    fn from_modules(modules: Vec<Module>, version_hash: String) -> Result<Self, CatalogError> {
        let mut by_key = HashMap::new();
        for (index, module) in modules.iter().enumerate() {
            validate_module(module)?;
            for key in [&module.id, &module.slug] {
                if by_key.insert(key.clone(), index).is_some_and(|prev| prev != index) {
                    return Err(CatalogError::DuplicateModule(key.clone()));
                }
            }
        }
        Ok(Self {
            modules: modules.into_iter().map(Arc::new).collect(),
            by_key,
            version_hash,
        })
    }

    /// Finds a module by id, falling back to slug.
    #[must_use]
    pub fn find(&self, id_or_slug: &str) -> Option<&Arc<Module>> {
        self.by_key.get(id_or_slug).map(|&index| &self.modules[index])
    }

    /// All modules in catalog order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.iter()
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True when the catalog has no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// SHA-256 of the catalog source, hex encoded.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }
}

fn fingerprint(source: &str) -> String {
    Sha256::digest(source.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn validate_module(module: &Module) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidModule {
        module: module.id.clone(),
        reason,
    };

    if module.scenes.is_empty() {
        return Err(invalid("module has no scenes".to_owned()));
    }
    if module.passing_score > module.total_points {
        return Err(invalid(format!(
            "passing score {} exceeds total points {}",
            module.passing_score, module.total_points
        )));
    }

    let mut seen = HashSet::new();
    for (index, scene) in module.scenes.iter().enumerate() {
        if !seen.insert(scene.id.as_str()) {
            return Err(invalid(format!("duplicate scene id `{}`", scene.id)));
        }
        validate_scene(module, scene).map_err(|reason| CatalogError::InvalidScene {
            module: module.id.clone(),
            scene: scene.id.clone(),
            reason,
        })?;

        if let Some(next) = &scene.next {
            let following = module.scenes.get(index + 1).map(|s| s.id.as_str());
            if following != Some(next.as_str()) {
                return Err(CatalogError::InvalidScene {
                    module: module.id.clone(),
                    scene: scene.id.clone(),
                    reason: format!("next `{next}` is not the following scene"),
                });
            }
        }
    }
    Ok(())
}

fn validate_scene(module: &Module, scene: &Scene) -> Result<(), String> {
    match scene.kind {
        SceneKind::Choice => {
            let choices = scene
                .choices
                .as_deref()
                .filter(|choices| !choices.is_empty())
                .ok_or("choice scene has no choices")?;
            let mut ids = HashSet::new();
            for choice in choices {
                if !ids.insert(choice.id.as_str()) {
                    return Err(format!("duplicate choice id `{}`", choice.id));
                }
            }
        }
        SceneKind::Reflection => {
            if scene.reflection.is_none() {
                return Err("reflection scene has no prompt".to_owned());
            }
        }
        SceneKind::Quiz => {
            let questions = scene
                .quiz
                .as_deref()
                .filter(|questions| !questions.is_empty())
                .ok_or("quiz scene has no questions")?;
            validate_questions(questions)?;
        }
        SceneKind::Narrative | SceneKind::Completion | SceneKind::Video => {}
    }

    for variant in &scene.variants {
        if let Some(questions) = &variant.quiz {
            validate_questions(questions)?;
        }
        if variant.choices.as_ref().is_some_and(Vec::is_empty) {
            return Err("variant replaces choices with an empty list".to_owned());
        }
    }

    if scene.kind == SceneKind::Completion && module.scenes.last().map(|s| &s.id) != Some(&scene.id)
    {
        return Err("completion scene must be the last scene".to_owned());
    }
    Ok(())
}

fn validate_questions(questions: &[Question]) -> Result<(), String> {
    for question in questions {
        if question.correct_index >= question.options.len() {
            return Err(format!(
                "question `{}` has correct index {} but {} options",
                question.text,
                question.correct_index,
                question.options.len()
            ));
        }
    }
    Ok(())
}
