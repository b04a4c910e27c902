use crate::config::Config;
use crate::error::INTERNAL_ERROR_MESSAGE;
use crate::models::*;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

/// Produces a completion for a system + user message pair.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Completion;
}

/// Chat Completions client. One call per `generate`, no retries.
pub struct OpenAiService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.model.clone(),
        }
    }

    fn failure(detail: impl Into<String>) -> Completion {
        Completion::Failure {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiService {
    async fn generate(&self, messages: &[Message]) -> Completion {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let response = match self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Self::failure(format!("request to {} failed: {}", url, e)),
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Self::failure(format!("OpenAI API error ({}): {}", status, error_text));
        }

        match response.json::<ChatCompletionResponse>().await {
            Ok(completion) => {
                log::debug!("Completion returned {} choices", completion.choices.len());
                Completion::Success(completion)
            }
            Err(e) => Self::failure(format!("could not decode completion response: {}", e)),
        }
    }
}
