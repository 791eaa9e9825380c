//! The Google generative language API.

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

pub(super) struct GoogleProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    token_budget: usize,
    max_output_tokens: u32,
    temperature: f64,
}

impl GoogleProvider {
    pub fn new(model: &ChatModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: model.endpoint(),
            api_key: model.api_key.clone(),
            token_budget: token_budget(model.context_window, completion.max_output_tokens),
            max_output_tokens: completion.max_output_tokens,
            temperature: completion.temperature,
        })
    }

    /// The key travels as a query parameter on this API.
    fn url(&self) -> String {
        match &self.api_key {
            Some(api_key) => format!("{}?alt=sse&key={}", self.endpoint, api_key.expose_secret()),
            None => format!("{}?alt=sse", self.endpoint),
        }
    }

    fn body(&self, prompt: &dyn Prompt) -> RequestBody {
        let contents = Truncator {
            max_token_limit: self.token_budget,
        }
        .truncated_messages(prompt)
        .into_iter()
        .map(|message| Content {
            role: Some(match message.role {
                PromptRole::User => "user",
                PromptRole::Assistant => "model",
            }),
            parts: vec![Part {
                text: message.content,
            }],
        })
        .collect();

        let system = prompt.system_prompt();

        RequestBody {
            contents,
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                stop_sequences: prompt
                    .stop_words()
                    .into_iter()
                    .filter(|word| !word.trim().is_empty())
                    .collect(),
            },
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.endpoint);

        let response = self
            .client
            .post(self.url())
            .json(&self.body(prompt))
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        Ok(sse_token_stream(response, candidate_delta))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn candidate_delta(chunk: StreamChunk) -> ChunkText {
    let Some(candidate) = chunk.candidates.into_iter().flatten().next() else {
        return ChunkText { text: None, done: false };
    };

    let text = candidate
        .content
        .and_then(|content| content.parts)
        .into_iter()
        .flatten()
        .filter_map(|part| part.text)
        .collect::<String>();

    ChunkText {
        text: (!text.is_empty()).then_some(text),
        done: candidate.finish_reason.is_some(),
    }
}
