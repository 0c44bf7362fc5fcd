//! Canonical mistake schema: default bundle, lenient normalization and the
//! response-unwrapping helpers shared by extraction and enrichment.
//!
//! Normalization is schema-on-read by design: a missing or malformed field
//! is replaced with its documented default so one bad record can never
//! fail a whole batch.

use lt_core::types::{Difficulty, ErrorCategory, MistakeRecord, RecurrenceRisk};
use serde_json::Value;

/// The enrichment slice of a mistake record: everything the reasoning
/// service adds on top of a (wrong, correct) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub error_type: String,
    pub error_category: ErrorCategory,
    pub concepts: Vec<String>,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub suggested_practice: String,
    pub recurrence_risk: RecurrenceRisk,
    pub related_concepts: Vec<String>,
}

impl Default for Enrichment {
    /// The fixed fallback bundle used whenever enrichment is unavailable.
    fn default() -> Self {
        Self {
            error_type: "unknown".to_string(),
            error_category: ErrorCategory::Unknown,
            concepts: vec!["general".to_string()],
            explanation: "Error analysis unavailable. Please review the topic.".to_string(),
            difficulty: Difficulty::Beginner,
            suggested_practice: "Review topic and try similar exercises".to_string(),
            recurrence_risk: RecurrenceRisk::Low,
            related_concepts: vec![],
        }
    }
}

impl Enrichment {
    /// Normalizes one raw mapping into the canonical enrichment shape.
    ///
    /// Every missing or invalid field falls back to its default; this
    /// never fails and never drops a record.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();

        let Some(obj) = value.as_object() else {
            return defaults;
        };

        let non_empty_str = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let concepts = string_list(obj.get("concepts")).filter(|c| !c.is_empty());
        let related_concepts = string_list(obj.get("related_concepts"));

        Self {
            error_type: non_empty_str("error_type").unwrap_or(defaults.error_type),
            error_category: non_empty_str("error_category")
                .map(|s| ErrorCategory::parse_lenient(&s))
                .unwrap_or(defaults.error_category),
            concepts: concepts.unwrap_or(defaults.concepts),
            explanation: non_empty_str("explanation").unwrap_or(defaults.explanation),
            difficulty: non_empty_str("difficulty")
                .map(|s| Difficulty::parse_lenient(&s))
                .unwrap_or(defaults.difficulty),
            suggested_practice: non_empty_str("suggested_practice")
                .unwrap_or(defaults.suggested_practice),
            recurrence_risk: non_empty_str("recurrence_risk")
                .map(|s| RecurrenceRisk::parse_lenient(&s))
                .unwrap_or(defaults.recurrence_risk),
            related_concepts: related_concepts.unwrap_or(defaults.related_concepts),
        }
    }

    /// Assembles a full record from this enrichment and the identity
    /// fields, stamping the creation timestamp and the derived searchable
    /// text in one step so the projection can never drift.
    pub fn into_record(
        self,
        message_index: usize,
        student_input: impl Into<String>,
        corrected_answer: impl Into<String>,
    ) -> MistakeRecord {
        let mut record = MistakeRecord {
            message_index,
            student_input: student_input.into(),
            corrected_answer: corrected_answer.into(),
            error_type: self.error_type,
            error_category: self.error_category,
            concepts: self.concepts,
            explanation: self.explanation,
            difficulty: self.difficulty,
            suggested_practice: self.suggested_practice,
            recurrence_risk: self.recurrence_risk,
            related_concepts: self.related_concepts,
            timestamp: chrono::Utc::now().to_rfc3339(),
            searchable_text: String::new(),
        };
        record.refresh_searchable_text();
        record
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Strips triple-backtick fencing (with an optional leading `json` tag)
/// from a reasoning-service response so the remainder can be parsed as
/// JSON. Returns the input untouched when it is not fenced.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_bundle() {
        let e = Enrichment::default();
        assert_eq!(e.error_type, "unknown");
        assert_eq!(e.error_category, ErrorCategory::Unknown);
        assert_eq!(e.concepts, vec!["general".to_string()]);
        assert_eq!(
            e.explanation,
            "Error analysis unavailable. Please review the topic."
        );
        assert_eq!(e.difficulty, Difficulty::Beginner);
        assert_eq!(e.suggested_practice, "Review topic and try similar exercises");
        assert_eq!(e.recurrence_risk, RecurrenceRisk::Low);
        assert!(e.related_concepts.is_empty());
    }

    #[test]
    fn test_from_value_fills_missing_fields() {
        let value = json!({
            "error_type": "spelling",
            "explanation": "Watch the double consonant."
        });
        let e = Enrichment::from_value(&value);

        assert_eq!(e.error_type, "spelling");
        assert_eq!(e.explanation, "Watch the double consonant.");
        // Everything else defaulted, never rejected.
        assert_eq!(e.error_category, ErrorCategory::Unknown);
        assert_eq!(e.concepts, vec!["general".to_string()]);
        assert_eq!(e.difficulty, Difficulty::Beginner);
        assert_eq!(e.recurrence_risk, RecurrenceRisk::Low);
    }

    #[test]
    fn test_from_value_normalizes_invalid_enums() {
        let value = json!({
            "error_category": "pronunciation",
            "difficulty": "impossible",
            "recurrence_risk": "certain"
        });
        let e = Enrichment::from_value(&value);

        assert_eq!(e.error_category, ErrorCategory::Unknown);
        assert_eq!(e.difficulty, Difficulty::Beginner);
        assert_eq!(e.recurrence_risk, RecurrenceRisk::Low);
    }

    #[test]
    fn test_from_value_non_object_is_all_defaults() {
        assert_eq!(Enrichment::from_value(&json!(null)), Enrichment::default());
        assert_eq!(Enrichment::from_value(&json!([1, 2])), Enrichment::default());
        assert_eq!(Enrichment::from_value(&json!("text")), Enrichment::default());
    }

    #[test]
    fn test_from_value_empty_concepts_defaulted() {
        let value = json!({ "concepts": [] });
        assert_eq!(
            Enrichment::from_value(&value).concepts,
            vec!["general".to_string()]
        );
    }

    #[test]
    fn test_into_record_computes_projection() {
        let value = json!({
            "error_type": "word_order",
            "error_category": "grammar",
            "concepts": ["adverb placement"],
            "explanation": "Adverbs of frequency go before the main verb.",
            "difficulty": "intermediate",
            "suggested_practice": "Reorder scrambled sentences",
            "recurrence_risk": "medium"
        });
        let record = Enrichment::from_value(&value).into_record(
            3,
            "I go always there",
            "I always go there",
        );

        assert_eq!(record.message_index, 3);
        assert_eq!(record.difficulty, Difficulty::Intermediate);
        assert!(!record.timestamp.is_empty());
        assert_eq!(record.searchable_text, record.build_searchable_text());
        assert!(record.searchable_text.contains("word order"));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        let body = "{\"error_type\": \"spelling\"}";

        assert_eq!(strip_code_fence(body), body);
        assert_eq!(strip_code_fence(&format!("```json\n{}\n```", body)), body);
        assert_eq!(strip_code_fence(&format!("```\n{}\n```", body)), body);
        assert_eq!(strip_code_fence(&format!("  ```json\n{}\n```  ", body)), body);
        // Unterminated fence still yields the payload.
        assert_eq!(strip_code_fence(&format!("```json\n{}", body)), body);
    }

    #[test]
    fn test_fenced_and_unfenced_parse_identically() {
        let body = r#"{"error_type": "spelling", "difficulty": "advanced"}"#;
        let fenced = format!("```json\n{}\n```", body);

        let from_plain: Value = serde_json::from_str(strip_code_fence(body)).unwrap();
        let from_fenced: Value = serde_json::from_str(strip_code_fence(&fenced)).unwrap();
        assert_eq!(from_plain, from_fenced);
    }
}
