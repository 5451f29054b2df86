//! Content variation resolver.
//!
//! Retake attempts may replace parts of a scene's content. The resolver
//! overlays those replacements onto the catalog scene without touching the
//! catalog itself.

use std::collections::HashMap;

use skillpass_catalog::{Scene, SceneOverride};

/// Overrides keyed by scene id.
pub type VariationMap = HashMap<String, SceneOverride>;

/// Produces the scene to present: `scene` with every field set in its
/// override replaced, every unset field kept from the base.
#[must_use]
pub fn resolve(scene: &Scene, variations: &VariationMap) -> Scene {
    let Some(overlay) = variations.get(&scene.id) else {
        return scene.clone();
    };

    let mut effective = scene.clone();
    if let Some(title) = &overlay.title {
        effective.title.clone_from(title);
    }
    if let Some(content) = &overlay.content {
        effective.content.clone_from(content);
    }
    if let Some(choices) = &overlay.choices {
        effective.choices = Some(choices.clone());
    }
    if let Some(quiz) = &overlay.quiz {
        effective.quiz = Some(quiz.clone());
    }
    if let Some(reflection) = &overlay.reflection {
        effective.reflection = Some(reflection.clone());
    }
    effective
}

/// Resolves every scene of a module in order.
#[must_use]
pub fn resolve_all(scenes: &[Scene], variations: &VariationMap) -> Vec<Scene> {
    scenes
        .iter()
        .map(|scene| resolve(scene, variations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpass_catalog::{Choice, Question, ReflectionPrompt, SceneKind};

    fn base_scene() -> Scene {
        Scene {
            id: "s1".to_owned(),
            kind: SceneKind::Quiz,
            title: "Base title".to_owned(),
            content: "Base body".to_owned(),
            character: None,
            setting: None,
            choices: Some(vec![Choice {
                id: "c1".to_owned(),
                text: "Base choice".to_owned(),
                is_correct: true,
                feedback: "Fine".to_owned(),
                points: 30,
            }]),
            quiz: Some(vec![Question {
                text: "Base question".to_owned(),
                options: vec!["a".to_owned(), "b".to_owned()],
                correct_index: 0,
                explanation: String::new(),
            }]),
            reflection: Some(ReflectionPrompt {
                prompt: "Base prompt".to_owned(),
                min_length: 10,
            }),
            next: None,
            variants: Vec::new(),
        }
    }

    fn new_quiz() -> Vec<Question> {
        vec![Question {
            text: "New question".to_owned(),
            options: vec!["x".to_owned(), "y".to_owned(), "z".to_owned()],
            correct_index: 2,
            explanation: "Because".to_owned(),
        }]
    }

    #[test]
    fn test_resolve_with_empty_map_returns_base_scene() {
        let scene = base_scene();

        let effective = resolve(&scene, &VariationMap::new());

        assert_eq!(effective, scene);
    }

    #[test]
    fn test_resolve_ignores_overrides_for_other_scenes() {
        let scene = base_scene();
        let variations = VariationMap::from([(
            "other".to_owned(),
            SceneOverride {
                quiz: Some(new_quiz()),
                ..SceneOverride::default()
            },
        )]);

        let effective = resolve(&scene, &variations);

        assert_eq!(effective, scene);
    }

    #[test]
    fn test_resolve_replaces_only_fields_present_in_override() {
        let scene = base_scene();
        let variations = VariationMap::from([(
            "s1".to_owned(),
            SceneOverride {
                quiz: Some(new_quiz()),
                ..SceneOverride::default()
            },
        )]);

        let effective = resolve(&scene, &variations);

        assert_eq!(effective.quiz, Some(new_quiz()));
        assert_eq!(effective.choices, scene.choices);
        assert_eq!(effective.reflection, scene.reflection);
        assert_eq!(effective.title, scene.title);
        assert_eq!(effective.content, scene.content);
    }

    #[test]
    fn test_resolve_takes_title_and_content_from_full_override() {
        let scene = base_scene();
        let variations = VariationMap::from([(
            "s1".to_owned(),
            SceneOverride {
                title: Some("Retake title".to_owned()),
                content: Some("Retake body".to_owned()),
                ..SceneOverride::default()
            },
        )]);

        let effective = resolve(&scene, &variations);

        assert_eq!(effective.title, "Retake title");
        assert_eq!(effective.content, "Retake body");
        assert_eq!(effective.quiz, scene.quiz);
    }

    #[test]
    fn test_resolve_is_pure() {
        let scene = base_scene();
        let variations = VariationMap::from([(
            "s1".to_owned(),
            SceneOverride {
                quiz: Some(new_quiz()),
                ..SceneOverride::default()
            },
        )]);

        let first = resolve(&scene, &variations);
        let second = resolve(&scene, &variations);

        assert_eq!(first, second);
        assert_eq!(scene, base_scene());
    }

    #[test]
    fn test_resolve_all_preserves_order() {
        let mut second = base_scene();
        second.id = "s2".to_owned();
        let scenes = vec![base_scene(), second];

        let effective = resolve_all(&scenes, &VariationMap::new());

        let ids: Vec<&str> = effective.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);
    }
}
