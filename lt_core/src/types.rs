use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role of a transcript message. Anything that is not a student (`user`)
/// or tutor (`assistant`) turn is carried but never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One turn of a conversation transcript. Owned by the caller; the core
/// only ever reads the user-authored subsequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Parses a difficulty, falling back to the safest default instead of
    /// rejecting a malformed value.
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().parse().unwrap_or_default()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecurrenceRisk {
    #[default]
    Low,
    Medium,
    High,
}

impl RecurrenceRisk {
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().parse().unwrap_or_default()
    }
}

/// Coarse error bucket. `error_type` stays an open string vocabulary
/// (grammar_conjugation, spelling, word_order, ...) while the category is
/// constrained to this enumeration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ErrorCategory {
    Grammar,
    Vocabulary,
    Spelling,
    Mixed,
    #[default]
    Unknown,
}

impl ErrorCategory {
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().parse().unwrap_or_default()
    }
}

/// Canonical record of one detected language error.
///
/// Immutable once stored: corrections go through delete + reinsert, never
/// in-place mutation. `searchable_text` is a pure projection of the other
/// fields and is recomputed whenever any source field changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeRecord {
    /// 1-based position of the offending message among ALL messages of its
    /// conversation. `0` for records not tied to a transcript turn
    /// (enrichment of an already-known pair).
    #[serde(default)]
    pub message_index: usize,
    pub student_input: String,
    pub corrected_answer: String,
    pub error_type: String,
    pub error_category: ErrorCategory,
    pub concepts: Vec<String>,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub suggested_practice: String,
    pub recurrence_risk: RecurrenceRisk,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    /// RFC 3339, set at creation.
    pub timestamp: String,
    pub searchable_text: String,
}

impl MistakeRecord {
    /// Renders the textual projection used as the unit of semantic indexing.
    ///
    /// The template is load-bearing: retrieval quality and tests depend on
    /// its exact shape. Do not reword it.
    pub fn build_searchable_text(&self) -> String {
        format!(
            "Student said: \"{}\" instead of \"{}\". Error type: {}. {} Concepts: {}. Difficulty: {}.",
            self.student_input,
            self.corrected_answer,
            self.error_type.replace('_', " "),
            self.explanation,
            self.concepts.join(", "),
            self.difficulty
        )
    }

    pub fn refresh_searchable_text(&mut self) {
        self.searchable_text = self.build_searchable_text();
    }
}

/// An already-known (wrong, correct) pair supplied by an upstream
/// correction step, waiting to be enriched into a [`MistakeRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistakePair {
    pub student_input: String,
    pub correct_answer: String,
    #[serde(default)]
    pub topic: Option<String>,
}

impl MistakePair {
    pub fn new(student_input: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self {
            student_input: student_input.into(),
            correct_answer: correct_answer.into(),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Frequency-ranked summary of recurring errors across a set of records.
/// Derived and ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub most_common_error_type: String,
    pub frequency: usize,
    pub pattern_description: String,
    /// frequency / total records, rounded to 2 decimals, in [0, 1].
    pub confidence: f64,
    pub recommendation: String,
}
