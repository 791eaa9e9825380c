//! The Mistral fill-in-the-middle endpoint. Prefix and suffix are sent as-is
//! and the server does its own context management, so no truncation pass.

use async_trait::async_trait;
use config::{CompletionConfig, FimModelConfig};
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChunkText, Provider, TokenStream, ensure_success, http_client, sse_token_stream};
use crate::{SuggestionError, prompt::Prompt, request::RequestContext};

pub(super) struct MistralProvider {
    client: reqwest::Client,
    endpoint: String,
    model_name: String,
    api_key: Option<SecretString>,
    max_output_tokens: u32,
    temperature: f64,
}

impl MistralProvider {
    pub fn new(model: &FimModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: model.endpoint(),
            model_name: model.model_name.clone(),
            api_key: model.api_key.clone(),
            max_output_tokens: completion.max_output_tokens,
            temperature: completion.temperature,
        })
    }
}

#[async_trait]
impl Provider for MistralProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.endpoint);

        let body = RequestBody {
            model: &self.model_name,
            prompt: prompt.prefix().concat(),
            suffix: prompt.suffix().concat(),
            temperature: self.temperature,
            stream: true,
            max_tokens: self.max_output_tokens,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        Ok(sse_token_stream(response, chunk_delta))
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    prompt: String,
    suffix: String,
    temperature: f64,
    stream: bool,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Option<Vec<ChunkChoice>>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

fn chunk_delta(chunk: StreamChunk) -> ChunkText {
    let Some(choice) = chunk.choices.into_iter().flatten().next() else {
        return ChunkText { text: None, done: false };
    };

    ChunkText {
        text: choice.delta.and_then(|delta| delta.content),
        done: choice.finish_reason.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_chunks_carry_the_generated_text() {
        let chunk: StreamChunk =
            sonic_rs::from_str(r#"{"choices":[{"delta":{"content":"middle"},"finish_reason":null}]}"#).unwrap();

        assert_eq!(chunk_delta(chunk).text.as_deref(), Some("middle"));
    }
}
