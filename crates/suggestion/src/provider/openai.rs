//! OpenAI and OpenAI-compatible backends, chat and legacy completions.

use async_trait::async_trait;
use config::{ChatModelConfig, CompletionConfig, CompletionModelConfig};
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChunkText, Provider, TokenStream, ensure_success, http_client, sse_token_stream};
use crate::{
    SuggestionError,
    prompt::Prompt,
    request::RequestContext,
    truncation::token_budget,
};

pub(super) enum Endpoint {
    Chat,
    Completion,
}

pub(super) struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    kind: Endpoint,
    model_name: String,
    api_key: Option<SecretString>,
    token_budget: usize,
    max_output_tokens: u32,
    temperature: f64,
}

impl OpenAiProvider {
    pub fn chat(model: &ChatModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Self::new(
            model.endpoint(),
            Endpoint::Chat,
            model.model_name.clone(),
            model.api_key.clone(),
            model.context_window,
            completion,
        )
    }

    pub fn completion(model: &CompletionModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Self::new(
            model.endpoint(),
            Endpoint::Completion,
            model.model_name.clone(),
            model.api_key.clone(),
            model.context_window,
            completion,
        )
    }

    pub(super) fn new(
        endpoint: String,
        kind: Endpoint,
        model_name: String,
        api_key: Option<SecretString>,
        context_window: usize,
        completion: &CompletionConfig,
    ) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint,
            kind,
            model_name,
            api_key,
            token_budget: token_budget(context_window, completion.max_output_tokens),
            max_output_tokens: completion.max_output_tokens,
            temperature: completion.temperature,
        })
    }

    pub(super) fn body(&self, prompt: &dyn Prompt) -> RequestBody<'_> {
        match self.kind {
            Endpoint::Chat => RequestBody::Chat(ChatRequestBody {
                model: &self.model_name,
                messages: super::chat_messages(prompt, self.token_budget)
                    .into_iter()
                    .map(|(role, content)| ChatMessage { role, content })
                    .collect(),
                temperature: self.temperature,
                stream: true,
                stop: prompt.stop_words(),
                max_tokens: self.max_output_tokens,
            }),
            Endpoint::Completion => RequestBody::Completion(CompletionRequestBody {
                model: &self.model_name,
                prompt: super::completion_prompt(prompt, self.token_budget),
                temperature: self.temperature,
                stream: true,
                stop: prompt.stop_words(),
                max_tokens: self.max_output_tokens,
            }),
        }
    }

    pub(super) fn token_stream(&self, response: reqwest::Response) -> TokenStream {
        match self.kind {
            Endpoint::Chat => sse_token_stream(response, chat_delta),
            Endpoint::Completion => sse_token_stream(response, completion_delta),
        }
    }

    pub(super) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(super) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(super) fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.endpoint);

        let mut request = self.client.post(&self.endpoint).json(&self.body(prompt));
        if let Some(api_key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        Ok(self.token_stream(response))
    }
}

#[derive(Serialize)]
#[serde(untagged)]
pub(super) enum RequestBody<'a> {
    Chat(ChatRequestBody<'a>),
    Completion(CompletionRequestBody<'a>),
}

#[derive(Serialize)]
pub(super) struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub stream: bool,
    pub stop: Vec<String>,
    pub max_tokens: u32,
}

#[derive(Serialize)]
pub(super) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize)]
pub(super) struct CompletionRequestBody<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub temperature: f64,
    pub stream: bool,
    pub stop: Vec<String>,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatStreamChunk {
    choices: Option<Vec<ChatChunkChoice>>,
}

#[derive(Deserialize)]
struct ChatChunkChoice {
    delta: Option<ChatChunkDelta>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionStreamChunk {
    choices: Option<Vec<CompletionChunkChoice>>,
}

#[derive(Deserialize)]
struct CompletionChunkChoice {
    text: Option<String>,
    finish_reason: Option<String>,
}

fn chat_delta(chunk: ChatStreamChunk) -> ChunkText {
    let Some(choice) = chunk.choices.into_iter().flatten().next() else {
        return ChunkText { text: None, done: false };
    };

    ChunkText {
        text: choice.delta.and_then(|delta| delta.content),
        done: choice.finish_reason.is_some(),
    }
}

fn completion_delta(chunk: CompletionStreamChunk) -> ChunkText {
    let Some(choice) = chunk.choices.into_iter().flatten().next() else {
        return ChunkText { text: None, done: false };
    };

    ChunkText {
        text: choice.text,
        done: choice.finish_reason.is_some(),
    }
}
