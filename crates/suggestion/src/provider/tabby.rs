//! Tabby completion servers. The response is a single non-streamed body,
//! surfaced as a one-item token stream so the rest of the pipeline does not
//! care.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use config::{CompletionConfig, TabbyAuthMode, TabbyModelConfig};
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Provider, TokenStream, ensure_success, http_client};
use crate::{CodeLanguage, SuggestionError, prompt::Prompt, request::RequestContext};

pub(super) struct TabbyProvider {
    client: reqwest::Client,
    endpoint: String,
    auth_mode: TabbyAuthMode,
    api_key: Option<SecretString>,
    username: Option<String>,
    header_name: Option<String>,
    temperature: f64,
}

impl TabbyProvider {
    pub fn new(model: &TabbyModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: model.endpoint(),
            auth_mode: model.auth_mode,
            api_key: model.api_key.clone(),
            username: model.username.clone(),
            header_name: model.header_name.clone(),
            temperature: completion.temperature,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let Some(api_key) = &self.api_key else {
            return request;
        };

        match self.auth_mode {
            TabbyAuthMode::None => request,
            TabbyAuthMode::BearerToken => {
                request.header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            }
            TabbyAuthMode::Basic => {
                let username = self.username.as_deref().unwrap_or_default();
                let credentials = BASE64.encode(format!("{username}:{}", api_key.expose_secret()));
                request.header(AUTHORIZATION, format!("Basic {credentials}"))
            }
            TabbyAuthMode::CustomHeader => match &self.header_name {
                Some(header_name) => request.header(header_name.as_str(), api_key.expose_secret()),
                None => {
                    log::warn!("Custom-header auth configured without a header name, sending unauthenticated");
                    request
                }
            },
        }
    }
}

#[async_trait]
impl Provider for TabbyProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.endpoint);

        let clipboard = prompt
            .relevant_snippets()
            .iter()
            .map(|snippet| snippet.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let body = RequestBody {
            language: prompt.language().map(CodeLanguage::as_str).unwrap_or_default(),
            segments: Segments {
                prefix: format!("{clipboard}\n\n{}", prompt.prefix().concat()),
                suffix: prompt.suffix().concat(),
                clipboard,
            },
            temperature: self.temperature,
        };

        let response = self
            .authorize(self.client.post(&self.endpoint).json(&body))
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        let body: ResponseBody = response
            .json()
            .await
            .map_err(|e| SuggestionError::Decode(e.to_string()))?;
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .unwrap_or_default();

        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, SuggestionError>(text)
        })))
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    language: &'a str,
    segments: Segments,
    temperature: f64,
}

#[derive(Serialize)]
struct Segments {
    prefix: String,
    suffix: String,
    clipboard: String,
}

#[derive(Deserialize)]
struct ResponseBody {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: String,
}
