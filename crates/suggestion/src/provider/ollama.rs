//! Local Ollama servers, over both `api/chat` and `api/generate`. Responses
//! arrive as newline-delimited JSON rather than SSE, and there is no auth.

use async_trait::async_trait;
use config::{ChatModelConfig, CompletionConfig, CompletionModelConfig};
use serde::{Deserialize, Serialize};

use super::{ChunkText, Provider, TokenStream, ensure_success, http_client, json_lines_token_stream};
use crate::{SuggestionError, prompt::Prompt, request::RequestContext, truncation::token_budget};

enum Endpoint {
    Chat,
    Generate,
}

pub(super) struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    kind: Endpoint,
    model_name: String,
    token_budget: usize,
    max_output_tokens: u32,
    temperature: f64,
}

impl OllamaProvider {
    pub fn chat(model: &ChatModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: model.endpoint(),
            kind: Endpoint::Chat,
            model_name: model.model_name.clone(),
            token_budget: token_budget(model.context_window, completion.max_output_tokens),
            max_output_tokens: completion.max_output_tokens,
            temperature: completion.temperature,
        })
    }

    pub fn completion(model: &CompletionModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: model.endpoint(),
            kind: Endpoint::Generate,
            model_name: model.model_name.clone(),
            token_budget: token_budget(model.context_window, completion.max_output_tokens),
            max_output_tokens: completion.max_output_tokens,
            temperature: completion.temperature,
        })
    }

    fn options(&self, prompt: &dyn Prompt) -> Options {
        Options {
            temperature: self.temperature,
            stop: prompt.stop_words(),
            num_predict: self.max_output_tokens,
        }
    }

    fn body(&self, prompt: &dyn Prompt) -> RequestBody<'_> {
        match self.kind {
            Endpoint::Chat => RequestBody::Chat(ChatRequestBody {
                model: &self.model_name,
                messages: super::chat_messages(prompt, self.token_budget)
                    .into_iter()
                    .map(|(role, content)| Message { role, content })
                    .collect(),
                stream: true,
                options: self.options(prompt),
            }),
            Endpoint::Generate => RequestBody::Generate(GenerateRequestBody {
                model: &self.model_name,
                prompt: super::completion_prompt(prompt, self.token_budget),
                stream: true,
                options: self.options(prompt),
            }),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.body(prompt))
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        Ok(match self.kind {
            Endpoint::Chat => json_lines_token_stream(response, chat_delta),
            Endpoint::Generate => json_lines_token_stream(response, generate_delta),
        })
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestBody<'a> {
    Chat(ChatRequestBody<'a>),
    Generate(GenerateRequestBody<'a>),
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct GenerateRequestBody<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct Options {
    temperature: f64,
    stop: Vec<String>,
    num_predict: u32,
}

#[derive(Deserialize)]
struct StreamChunk {
    message: Option<MessageChunk>,
    response: Option<String>,
    done: bool,
}

#[derive(Deserialize)]
struct MessageChunk {
    content: Option<String>,
}

fn chat_delta(chunk: StreamChunk) -> ChunkText {
    ChunkText {
        text: chunk.message.and_then(|message| message.content),
        done: chunk.done,
    }
}

fn generate_delta(chunk: StreamChunk) -> ChunkText {
    ChunkText {
        text: chunk.response,
        done: chunk.done,
    }
}
