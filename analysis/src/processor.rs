//! Enrichment pipeline: adds pedagogical structure to already-known
//! (wrong, correct) pairs, and the pattern analyzer that summarizes
//! recurring errors across a set of records.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::schema::{Enrichment, strip_code_fence};
use lt_core::traits::SharedCompletionService;
use lt_core::types::{MistakePair, MistakeRecord, PatternSummary};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const ENRICHMENT_SYSTEM_PROMPT: &str = "You are an expert language learning analyst. \
     Analyze mistakes and extract pedagogical insights. \
     Return ONLY valid JSON, no markdown, no explanations.";

const BATCH_SYSTEM_PROMPT: &str =
    "You are an expert language learning analyst. Return ONLY valid JSON array.";

/// Enriches raw language-learning mistakes with reasoning-service analysis.
///
/// Both operations always succeed: on any call or parse failure the
/// default enrichment bundle is merged over the original pair instead.
pub struct MistakeProcessor {
    llm: SharedCompletionService,
    timeout: Duration,
}

impl MistakeProcessor {
    pub fn new(llm: SharedCompletionService) -> Self {
        Self::with_config(llm, &AnalysisConfig::default())
    }

    pub fn with_config(llm: SharedCompletionService, config: &AnalysisConfig) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Enriches a single pair. Records produced here carry no transcript
    /// position, so `message_index` is 0.
    pub async fn enrich_one(&self, pair: &MistakePair) -> MistakeRecord {
        let enrichment = match self.request_one(pair).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("Mistake enrichment failed, using defaults: {}", e);
                Enrichment::default()
            }
        };

        enrichment.into_record(0, &pair.student_input, &pair.correct_answer)
    }

    /// Enriches many pairs via one combined request.
    ///
    /// The result always has the same length and ordering as `pairs`. A
    /// response whose length disagrees with the request count is paired
    /// positionally as far as it matches; the remainder is backfilled with
    /// the default bundle.
    pub async fn enrich_many(&self, pairs: &[MistakePair]) -> Vec<MistakeRecord> {
        if pairs.is_empty() {
            return Vec::new();
        }

        let enrichments = match self.request_many(pairs).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Batch enrichment failed, using defaults: {}", e);
                Vec::new()
            }
        };

        pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                let enrichment = enrichments
                    .get(i)
                    .map(Enrichment::from_value)
                    .unwrap_or_default();
                enrichment.into_record(0, &pair.student_input, &pair.correct_answer)
            })
            .collect()
    }

    async fn request_one(&self, pair: &MistakePair) -> Result<Enrichment, AnalysisError> {
        let prompt = build_enrichment_prompt(pair);
        let response = self.complete(ENRICHMENT_SYSTEM_PROMPT, &prompt).await?;

        let value: Value = serde_json::from_str(strip_code_fence(&response))?;
        if !value.is_object() {
            return Err(AnalysisError::Parse(
                "expected a JSON object of enrichment fields".to_string(),
            ));
        }

        Ok(Enrichment::from_value(&value))
    }

    async fn request_many(&self, pairs: &[MistakePair]) -> Result<Vec<Value>, AnalysisError> {
        let prompt = build_batch_enrichment_prompt(pairs);
        let response = self.complete(BATCH_SYSTEM_PROMPT, &prompt).await?;

        let value: Value = serde_json::from_str(strip_code_fence(&response))?;
        let Value::Array(items) = value else {
            return Err(AnalysisError::Parse(
                "expected a JSON array of enrichments".to_string(),
            ));
        };

        if items.len() != pairs.len() {
            warn!(
                "Batch enrichment count mismatch: expected {} items, got {}",
                pairs.len(),
                items.len()
            );
        }

        Ok(items)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AnalysisError> {
        tokio::time::timeout(self.timeout, self.llm.complete(system, user))
            .await
            .map_err(|_| AnalysisError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| AnalysisError::Completion(e.to_string()))
    }
}

fn build_enrichment_prompt(pair: &MistakePair) -> String {
    let topic = pair.topic.as_deref().unwrap_or("general practice");

    format!(
        "Analyze this language learning mistake:\n\n\
         Student wrote: \"{}\"\n\
         Correct answer: \"{}\"\n\
         Topic: {}\n\n\
         Extract and return JSON with these fields:\n\
         {{\n\
         \"error_type\": \"one of: grammar_conjugation, grammar_agreement, vocabulary_choice, \
         spelling, word_order, article_usage, preposition_usage, other\",\n\
         \"error_category\": \"one of: grammar, vocabulary, spelling, mixed\",\n\
         \"concepts\": [\"list of grammatical concepts involved\"],\n\
         \"explanation\": \"pedagogical explanation for student (1-2 sentences)\",\n\
         \"difficulty\": \"one of: beginner, intermediate, advanced\",\n\
         \"suggested_practice\": \"specific practice recommendation\",\n\
         \"recurrence_risk\": \"one of: low, medium, high\",\n\
         \"related_concepts\": [\"list of related topics to review\"]\n\
         }}\n\n\
         Return ONLY the JSON object.",
        pair.student_input, pair.correct_answer, topic
    )
}

fn build_batch_enrichment_prompt(pairs: &[MistakePair]) -> String {
    let mistakes_text = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            format!(
                "{}. Student: \"{}\" | Correct: \"{}\"",
                i + 1,
                pair.student_input,
                pair.correct_answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze these {count} mistakes. Return JSON array with one object per mistake.\n\n\
         Mistakes:\n{mistakes_text}\n\n\
         For each, extract:\n\
         - error_type, error_category, concepts, explanation, difficulty, \
         suggested_practice, recurrence_risk, related_concepts\n\n\
         Return JSON array of {count} objects.",
        count = pairs.len()
    )
}

/// Aggregates a collection of records into a frequency-ranked summary of
/// the most common error type.
///
/// Ties are broken by first occurrence in input order; with no stronger
/// rule available, input order is the only deterministic tie-break.
pub fn extract_error_pattern(mistakes: &[MistakeRecord]) -> PatternSummary {
    if mistakes.is_empty() {
        return PatternSummary {
            most_common_error_type: "none".to_string(),
            frequency: 0,
            pattern_description: "No mistakes to analyze".to_string(),
            confidence: 0.0,
            recommendation: "Continue practicing".to_string(),
        };
    }

    // Order-preserving tally keeps the tie-break deterministic.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for mistake in mistakes {
        match counts.iter_mut().find(|(t, _)| *t == mistake.error_type) {
            Some((_, count)) => *count += 1,
            None => counts.push((&mistake.error_type, 1)),
        }
    }

    // Strict comparison keeps the first-seen type on equal counts.
    let mut most_common = String::new();
    let mut frequency = 0;
    for (error_type, count) in &counts {
        if *count > frequency {
            most_common = (*error_type).to_string();
            frequency = *count;
        }
    }

    let confidence = (frequency as f64 / mistakes.len() as f64 * 100.0).round() / 100.0;

    let recommendation = mistakes
        .iter()
        .find(|m| m.error_type == most_common)
        .map(|m| m.suggested_practice.clone())
        .unwrap_or_else(|| "Review this topic".to_string());

    PatternSummary {
        pattern_description: format!(
            "Student struggles with {}",
            most_common.replace('_', " ")
        ),
        most_common_error_type: most_common,
        frequency,
        confidence,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletionService;
    use std::sync::Arc;

    fn enrichment_json() -> String {
        serde_json::json!({
            "error_type": "grammar_conjugation",
            "error_category": "grammar",
            "concepts": ["present simple"],
            "explanation": "Third person singular takes -es.",
            "difficulty": "beginner",
            "suggested_practice": "Conjugation drills",
            "recurrence_risk": "high",
            "related_concepts": ["subject-verb agreement"]
        })
        .to_string()
    }

    fn record(error_type: &str, practice: &str) -> MistakeRecord {
        Enrichment {
            error_type: error_type.to_string(),
            suggested_practice: practice.to_string(),
            ..Enrichment::default()
        }
        .into_record(1, "wrong", "right")
    }

    #[tokio::test]
    async fn test_enrich_one_merges_response_over_pair() {
        let mock = Arc::new(MockCompletionService::with_response(enrichment_json()));
        let processor = MistakeProcessor::new(mock);

        let pair = MistakePair::new("She go to work", "She goes to work").with_topic("daily life");
        let enriched = processor.enrich_one(&pair).await;

        assert_eq!(enriched.student_input, "She go to work");
        assert_eq!(enriched.corrected_answer, "She goes to work");
        assert_eq!(enriched.error_type, "grammar_conjugation");
        assert_eq!(enriched.related_concepts, vec!["subject-verb agreement"]);
        assert_eq!(enriched.message_index, 0);
        assert!(enriched.searchable_text.contains("She go to work"));
    }

    #[tokio::test]
    async fn test_enrich_one_failure_uses_defaults() {
        let mock = Arc::new(MockCompletionService::failing("unreachable"));
        let processor = MistakeProcessor::new(mock);

        let pair = MistakePair::new("She go to work", "She goes to work");
        let enriched = processor.enrich_one(&pair).await;

        assert_eq!(enriched.student_input, "She go to work");
        assert_eq!(enriched.error_type, "unknown");
        assert_eq!(
            enriched.explanation,
            "Error analysis unavailable. Please review the topic."
        );
        assert_eq!(enriched.searchable_text, enriched.build_searchable_text());
    }

    #[tokio::test]
    async fn test_enrich_one_fenced_response() {
        let mock = Arc::new(MockCompletionService::with_response(format!(
            "```json\n{}\n```",
            enrichment_json()
        )));
        let processor = MistakeProcessor::new(mock);

        let enriched = processor
            .enrich_one(&MistakePair::new("a", "b"))
            .await;
        assert_eq!(enriched.error_type, "grammar_conjugation");
    }

    #[tokio::test]
    async fn test_enrich_many_count_mismatch_backfills_defaults() {
        // One-object array for a two-pair request.
        let mock = Arc::new(MockCompletionService::with_response(format!(
            "[{}]",
            enrichment_json()
        )));
        let processor = MistakeProcessor::new(mock);

        let pairs = vec![
            MistakePair::new("She go to work", "She goes to work"),
            MistakePair::new("I has a cat", "I have a cat"),
        ];
        let enriched = processor.enrich_many(&pairs).await;

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].error_type, "grammar_conjugation");
        assert_eq!(enriched[1].error_type, "unknown");
        assert_eq!(enriched[1].student_input, "I has a cat");
    }

    #[tokio::test]
    async fn test_enrich_many_failure_keeps_length_and_order() {
        let mock = Arc::new(MockCompletionService::failing("timeout"));
        let processor = MistakeProcessor::new(mock);

        let pairs = vec![
            MistakePair::new("first wrong", "first right"),
            MistakePair::new("second wrong", "second right"),
            MistakePair::new("third wrong", "third right"),
        ];
        let enriched = processor.enrich_many(&pairs).await;

        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].student_input, "first wrong");
        assert_eq!(enriched[2].student_input, "third wrong");
        assert!(enriched.iter().all(|r| r.error_type == "unknown"));
    }

    #[tokio::test]
    async fn test_enrich_many_empty_input_no_call() {
        let mock = Arc::new(MockCompletionService::new());
        let processor = MistakeProcessor::new(mock.clone());

        assert!(processor.enrich_many(&[]).await.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_pattern_empty_input() {
        let summary = extract_error_pattern(&[]);
        assert_eq!(summary.most_common_error_type, "none");
        assert_eq!(summary.frequency, 0);
        assert_eq!(summary.pattern_description, "No mistakes to analyze");
        assert_eq!(summary.confidence, 0.0);
        assert_eq!(summary.recommendation, "Continue practicing");
    }

    #[test]
    fn test_pattern_most_common_and_confidence() {
        let mistakes = vec![
            record("grammar_conjugation", "Conjugation drills"),
            record("grammar_conjugation", "More drills"),
            record("grammar_conjugation", "Even more drills"),
            record("spelling", "Spelling practice"),
        ];

        let summary = extract_error_pattern(&mistakes);
        assert_eq!(summary.most_common_error_type, "grammar_conjugation");
        assert_eq!(summary.frequency, 3);
        assert_eq!(summary.confidence, 0.75);
        assert_eq!(
            summary.pattern_description,
            "Student struggles with grammar conjugation"
        );
        // Recommendation comes from the first record of the winning type.
        assert_eq!(summary.recommendation, "Conjugation drills");
    }

    #[test]
    fn test_pattern_tie_breaks_on_first_seen() {
        let mistakes = vec![
            record("word_order", "Reorder sentences"),
            record("spelling", "Spelling practice"),
            record("spelling", "Spelling practice"),
            record("word_order", "Reorder sentences"),
        ];

        let summary = extract_error_pattern(&mistakes);
        assert_eq!(summary.most_common_error_type, "word_order");
        assert_eq!(summary.frequency, 2);
        assert_eq!(summary.confidence, 0.5);
    }
}
