//! Extraction adapter: turns a finished conversation transcript into zero
//! or more canonical mistake records by asking the reasoning service for a
//! strict JSON array of detected errors.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::schema::{Enrichment, strip_code_fence};
use lt_core::traits::SharedCompletionService;
use lt_core::types::{ChatMessage, ChatRole, MistakeRecord};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert English language error analyzer. \
     Identify grammatical and vocabulary errors in student messages. \
     Return ONLY messages that contain errors. Skip correct messages.";

/// Analyzes completed conversations to find and enrich mistakes.
///
/// Extraction is best-effort: any failure to reach the service or parse
/// its response is logged and yields an empty result, never an error.
pub struct ConversationAnalyzer {
    llm: SharedCompletionService,
    timeout: Duration,
}

struct UserTurn<'a> {
    /// 1-based position among ALL messages of the transcript, so a mistake
    /// can be mapped back to its exact turn.
    index: usize,
    content: &'a str,
}

impl ConversationAnalyzer {
    pub fn new(llm: SharedCompletionService) -> Self {
        Self::with_config(llm, &AnalysisConfig::default())
    }

    pub fn with_config(llm: SharedCompletionService, config: &AnalysisConfig) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Extracts mistake records for the user-authored turns of `transcript`.
    ///
    /// Assistant turns are context only and never scored. A transcript
    /// without user turns returns an empty Vec without calling the
    /// reasoning service.
    pub async fn extract(&self, transcript: &[ChatMessage]) -> Vec<MistakeRecord> {
        let user_turns: Vec<UserTurn<'_>> = transcript
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.role == ChatRole::User)
            .map(|(i, msg)| UserTurn {
                index: i + 1,
                content: &msg.content,
            })
            .collect();

        if user_turns.is_empty() {
            return Vec::new();
        }

        match self.try_extract(&user_turns).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Conversation extraction failed, returning no mistakes: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_extract(
        &self,
        user_turns: &[UserTurn<'_>],
    ) -> Result<Vec<MistakeRecord>, AnalysisError> {
        let prompt = build_extraction_prompt(user_turns);

        let response = tokio::time::timeout(
            self.timeout,
            self.llm.complete(EXTRACTION_SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| AnalysisError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| AnalysisError::Completion(e.to_string()))?;

        let candidates = parse_candidates(&response)?;
        debug!("Extraction returned {} candidate(s)", candidates.len());

        let mut records = Vec::with_capacity(candidates.len());
        for (position, candidate) in candidates.iter().enumerate() {
            let student_input = candidate
                .get("student_input")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();
            let corrected_answer = candidate
                .get("corrected_answer")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();

            // The non-empty invariant on the identity fields cannot be
            // satisfied by defaulting, so such candidates are skipped.
            if student_input.is_empty() || corrected_answer.is_empty() {
                warn!(
                    "Skipping extraction candidate {} with empty identity fields",
                    position
                );
                continue;
            }

            let message_index = candidate
                .get("message_index")
                .and_then(Value::as_u64)
                .map(|i| i as usize)
                .filter(|i| *i > 0)
                .unwrap_or_else(|| {
                    user_turns
                        .get(position)
                        .map(|turn| turn.index)
                        .unwrap_or_default()
                });

            records.push(Enrichment::from_value(candidate).into_record(
                message_index,
                student_input,
                corrected_answer,
            ));
        }

        Ok(records)
    }
}

fn build_extraction_prompt(user_turns: &[UserTurn<'_>]) -> String {
    let messages_text = user_turns
        .iter()
        .map(|turn| format!("{}. {}", turn.index, turn.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze these English student messages for errors:\n\n{messages_text}\n\n\
         For each message WITH errors:\n\
         - Identify the specific error\n\
         - Provide the correct version\n\
         - Explain the mistake pedagogically\n\
         - Classify the error type and difficulty\n\n\
         Skip messages with no errors.\n\n\
         Return ONLY a JSON array with one object per detected error, each with \
         exactly these fields:\n\
         {{\"message_index\": <number from the list above>, \
         \"student_input\": \"exact text the student wrote\", \
         \"corrected_answer\": \"correct version\", \
         \"error_type\": \"e.g. grammar_conjugation, spelling, word_order\", \
         \"error_category\": \"grammar|vocabulary|spelling|mixed\", \
         \"concepts\": [\"concepts involved\"], \
         \"explanation\": \"brief pedagogical explanation\", \
         \"difficulty\": \"beginner|intermediate|advanced\", \
         \"suggested_practice\": \"practice recommendation\", \
         \"recurrence_risk\": \"low|medium|high\"}}"
    )
}

/// Parses the service response into candidate objects. Accepts a bare JSON
/// array or a `{"mistakes": [...]}` wrapper, with or without code fencing.
fn parse_candidates(response: &str) -> Result<Vec<Value>, AnalysisError> {
    let parsed: Value = serde_json::from_str(strip_code_fence(response))?;

    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("mistakes") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AnalysisError::Parse(
                "expected a JSON array of mistakes".to_string(),
            )),
        },
        _ => Err(AnalysisError::Parse(
            "expected a JSON array of mistakes".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletionService;
    use std::sync::Arc;

    fn two_mistake_response() -> String {
        serde_json::json!([
            {
                "message_index": 1,
                "student_input": "I eat bananas with mie families",
                "corrected_answer": "I eat bananas with my family",
                "error_type": "vocabulary_choice",
                "error_category": "vocabulary",
                "concepts": ["possessive adjectives"],
                "explanation": "Use the possessive adjective 'my'.",
                "difficulty": "beginner",
                "suggested_practice": "Possessive adjective drills",
                "recurrence_risk": "medium"
            },
            {
                "message_index": 3,
                "student_input": "She go to work",
                "corrected_answer": "She goes to work",
                "error_type": "grammar_conjugation",
                "error_category": "grammar",
                "concepts": ["present simple"],
                "explanation": "Third person singular takes -es.",
                "difficulty": "beginner",
                "suggested_practice": "Conjugation drills",
                "recurrence_risk": "high"
            }
        ])
        .to_string()
    }

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("I eat bananas with mie families"),
            ChatMessage::assistant("Nice! Did you mean 'my family'?"),
            ChatMessage::user("She go to work"),
        ]
    }

    #[tokio::test]
    async fn test_no_user_turns_short_circuits() {
        let mock = Arc::new(MockCompletionService::new());
        let analyzer = ConversationAnalyzer::new(mock.clone());

        let records = analyzer
            .extract(&[ChatMessage::assistant("Hello! Ready to practice?")])
            .await;

        assert!(records.is_empty());
        assert_eq!(mock.call_count(), 0);

        let records = analyzer.extract(&[]).await;
        assert!(records.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extracts_two_mistakes_with_message_indices() {
        let mock = Arc::new(MockCompletionService::with_response(two_mistake_response()));
        let analyzer = ConversationAnalyzer::new(mock.clone());

        let records = analyzer.extract(&transcript()).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message_index, 1);
        assert_eq!(records[1].message_index, 3);
        assert!(records[0]
            .searchable_text
            .contains("I eat bananas with mie families"));
        assert!(records[1].searchable_text.contains("She go to work"));
        assert!(!records[0].timestamp.is_empty());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fenced_response_parses_like_unfenced() {
        let fenced = format!("```json\n{}\n```", two_mistake_response());
        let mock = Arc::new(MockCompletionService::with_response(fenced));
        let analyzer = ConversationAnalyzer::new(mock);

        let records = analyzer.extract(&transcript()).await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_mistakes_wrapper_object_accepted() {
        let wrapped = format!("{{\"mistakes\": {}}}", two_mistake_response());
        let mock = Arc::new(MockCompletionService::with_response(wrapped));
        let analyzer = ConversationAnalyzer::new(mock);

        let records = analyzer.extract(&transcript()).await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_yields_empty() {
        let mock = Arc::new(MockCompletionService::with_response(
            "Sorry, I cannot help with that.",
        ));
        let analyzer = ConversationAnalyzer::new(mock);

        assert!(analyzer.extract(&transcript()).await.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_yields_empty() {
        let mock = Arc::new(MockCompletionService::failing("rate limited"));
        let analyzer = ConversationAnalyzer::new(mock);

        assert!(analyzer.extract(&transcript()).await.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_without_identity_fields_is_skipped() {
        let response = serde_json::json!([
            { "message_index": 1, "error_type": "spelling" },
            {
                "message_index": 3,
                "student_input": "She go to work",
                "corrected_answer": "She goes to work"
            }
        ])
        .to_string();
        let mock = Arc::new(MockCompletionService::with_response(response));
        let analyzer = ConversationAnalyzer::new(mock);

        let records = analyzer.extract(&transcript()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message_index, 3);
        // Missing enrichment fields were defaulted, not dropped.
        assert_eq!(records[0].error_type, "unknown");
        assert_eq!(records[0].concepts, vec!["general".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_message_index_falls_back_to_turn_position() {
        let response = serde_json::json!([
            {
                "student_input": "I eat bananas with mie families",
                "corrected_answer": "I eat bananas with my family"
            }
        ])
        .to_string();
        let mock = Arc::new(MockCompletionService::with_response(response));
        let analyzer = ConversationAnalyzer::new(mock);

        let records = analyzer.extract(&transcript()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message_index, 1);
    }
}
