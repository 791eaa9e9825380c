//! The Anthropic messages API.

use async_trait::async_trait;
use config::{ChatModelConfig, CompletionConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChunkText, Provider, TokenStream, ensure_success, http_client, sse_token_stream};
use crate::{
    SuggestionError,
    prompt::{Prompt, PromptRole},
    request::RequestContext,
    truncation::{Truncator, token_budget},
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(super) struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: String,
    model_name: String,
    api_key: Option<SecretString>,
    token_budget: usize,
    max_output_tokens: u32,
    temperature: f64,
}

impl AnthropicProvider {
    pub fn new(model: &ChatModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: model.endpoint(),
            model_name: model.model_name.clone(),
            api_key: model.api_key.clone(),
            token_budget: token_budget(model.context_window, completion.max_output_tokens),
            max_output_tokens: completion.max_output_tokens,
            temperature: completion.temperature,
        })
    }

    fn body<'a>(&'a self, prompt: &'a dyn Prompt) -> RequestBody<'a> {
        let messages = Truncator {
            max_token_limit: self.token_budget,
        }
        .truncated_messages(prompt)
        .into_iter()
        .map(|message| Message {
            role: match message.role {
                PromptRole::User => "user",
                PromptRole::Assistant => "assistant",
            },
            content: message.content,
        })
        .collect();

        let system = prompt.system_prompt();

        RequestBody {
            model: &self.model_name,
            messages,
            system: (!system.is_empty()).then_some(system),
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            stream: true,
            // The API rejects whitespace-only stop sequences.
            stop_sequences: prompt
                .stop_words()
                .into_iter()
                .filter(|word| !word.trim().is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.endpoint);

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(prompt));
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        Ok(sse_token_stream(response, event_delta))
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
    stop_sequences: Vec<String>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Permissive event shape; every event type in the stream decodes into it.
#[derive(Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: Option<String>,
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    text: Option<String>,
}

fn event_delta(event: StreamEvent) -> ChunkText {
    ChunkText {
        text: event.delta.and_then(|delta| delta.text),
        done: event.kind.as_deref() == Some("message_stop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_block_delta_yields_text() {
        let event: StreamEvent =
            sonic_rs::from_str(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"fn "}}"#)
                .unwrap();

        let extracted = event_delta(event);
        assert_eq!(extracted.text.as_deref(), Some("fn "));
        assert!(!extracted.done);
    }

    #[test]
    fn message_stop_ends_the_stream() {
        let event: StreamEvent = sonic_rs::from_str(r#"{"type":"message_stop"}"#).unwrap();

        assert!(event_delta(event).done);
    }

    #[test]
    fn ping_events_decode_and_yield_nothing() {
        let event: StreamEvent = sonic_rs::from_str(r#"{"type":"ping"}"#).unwrap();

        let extracted = event_delta(event);
        assert_eq!(extracted.text, None);
        assert!(!extracted.done);
    }
}
