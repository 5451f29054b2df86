//! Catalog data model: modules, scenes and their typed payloads.

use serde::{Deserialize, Serialize};

/// Discriminates what a scene asks of the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Story text; completed implicitly when the candidate moves on.
    Narrative,
    /// Pick one of several responses, each worth a number of points.
    Choice,
    /// Free-text reflection with a minimum length.
    Reflection,
    /// Multiple-choice knowledge check.
    Quiz,
    /// Terminal scene of a module.
    Completion,
    /// Reserved for embedded video; behaves like narrative.
    Video,
}

impl SceneKind {
    /// Whether the scene has an explicit submission step.
    #[must_use]
    pub fn is_scored(self) -> bool {
        matches!(self, Self::Choice | Self::Reflection | Self::Quiz)
    }
}

/// One response option of a choice scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Identifier, unique within the scene.
    pub id: String,
    /// What the candidate would say or do.
    pub text: String,
    /// Whether this is the recommended behavior.
    #[serde(default)]
    pub is_correct: bool,
    /// Shown after submission.
    pub feedback: String,
    /// Points awarded when this option is submitted.
    #[serde(default)]
    pub points: u32,
}

/// One question of a quiz scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The question text.
    pub text: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
    /// Shown for wrong answers during review.
    #[serde(default)]
    pub explanation: String,
}

/// Payload of a reflection scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionPrompt {
    /// What the candidate is asked to reflect on.
    pub prompt: String,
    /// Minimum answer length in characters, inclusive.
    pub min_length: usize,
}

/// Presentation-only character metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Display name.
    pub name: String,
    /// Role in the scenario, e.g. "Team Lead".
    #[serde(default)]
    pub role: Option<String>,
}

/// Partial scene content used for retake attempts.
///
/// Every field is independent: an unset field falls back to the base scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOverride {
    /// Replacement title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replacement choice options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    /// Replacement quiz questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<Question>>,
    /// Replacement reflection prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<ReflectionPrompt>,
}

impl SceneOverride {
    /// True when the override would not change any field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.choices.is_none()
            && self.quiz.is_none()
            && self.reflection.is_none()
    }
}

/// One step of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Identifier, unique within the module.
    pub id: String,
    /// Scene type.
    #[serde(rename = "type")]
    pub kind: SceneKind,
    /// Heading shown above the body.
    pub title: String,
    /// Body text with light markdown.
    #[serde(default)]
    pub content: String,
    /// Speaking character, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
    /// Where the scene takes place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    /// Options of a choice scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    /// Questions of a quiz scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<Question>>,
    /// Prompt of a reflection scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<ReflectionPrompt>,
    /// Id of the following scene. Always the next scene in order when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Authored alternatives served on retake attempts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<SceneOverride>,
}

impl Scene {
    /// Looks up a choice option by id.
    #[must_use]
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices
            .as_deref()
            .and_then(|choices| choices.iter().find(|choice| choice.id == choice_id))
    }

    /// Number of quiz questions, zero for non-quiz scenes.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.quiz.as_ref().map_or(0, Vec::len)
    }
}

/// A training module: an ordered chain of scenes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Stable identifier.
    pub id: String,
    /// URL-friendly alternate key.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub description: String,
    /// Scenes in their only valid traversal order.
    pub scenes: Vec<Scene>,
    /// Maximum achievable score.
    pub total_points: u32,
    /// Score needed to pass, inclusive.
    pub passing_score: u32,
    /// Nominal duration, e.g. "25 min".
    pub duration: String,
    /// Competency tags the module assesses.
    #[serde(default)]
    pub competencies: Vec<String>,
}

impl Module {
    /// Index of the scene with `scene_id`.
    #[must_use]
    pub fn scene_index(&self, scene_id: &str) -> Option<usize> {
        self.scenes.iter().position(|scene| scene.id == scene_id)
    }

    /// Whether `score` meets the passing threshold.
    #[must_use]
    pub fn is_passing(&self, score: u32) -> bool {
        score >= self.passing_score
    }
}
