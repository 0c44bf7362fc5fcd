use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use lt_core::traits::{DynError, TextCompletionService};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// OpenAI-backed completion service.
///
/// Responses are cached by (system, user) prompt pair; extraction and
/// enrichment prompts for identical inputs are deterministic at
/// temperature 0, so a repeat of the same analysis costs nothing.
pub struct OpenAiCompletionService {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    cache: Arc<RwLock<lru::LruCache<String, String>>>,
}

impl OpenAiCompletionService {
    pub fn new(api_key: String, model: String) -> Self {
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        let client = async_openai::Client::with_config(config);
        let cache = lru::LruCache::new(NonZeroUsize::new(100).unwrap());

        Self {
            client,
            model,
            cache: Arc::new(RwLock::new(cache)),
        }
    }
}

#[async_trait]
impl TextCompletionService for OpenAiCompletionService {
    type Error = DynError;

    async fn complete(&self, system: &str, user: &str) -> Result<String, Self::Error> {
        let cache_key = format!("{system}\u{1}{user}");

        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(&cache_key) {
                return Ok(cached.clone());
            }
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.0)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or("Empty response from OpenAI")?;

        {
            let mut cache = self.cache.write().await;
            cache.put(cache_key, content.clone());
        }

        Ok(content)
    }
}
