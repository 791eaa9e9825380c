//! Azure-hosted OpenAI deployments. Same wire protocol as OpenAI, but the
//! key travels in an `api-key` header and the deployment name is part of
//! the endpoint path.

use async_trait::async_trait;
use config::{ChatModelConfig, CompletionConfig, CompletionModelConfig};
use secrecy::ExposeSecret;

use super::{
    Provider, TokenStream, ensure_success,
    openai::{Endpoint, OpenAiProvider},
};
use crate::{SuggestionError, prompt::Prompt, request::RequestContext};

pub(super) struct AzureProvider {
    inner: OpenAiProvider,
}

impl AzureProvider {
    pub fn chat(model: &ChatModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            inner: OpenAiProvider::new(
                model.endpoint(),
                Endpoint::Chat,
                model.model_name.clone(),
                model.api_key.clone(),
                model.context_window,
                completion,
            )?,
        })
    }

    pub fn completion(model: &CompletionModelConfig, completion: &CompletionConfig) -> crate::Result<Self> {
        Ok(Self {
            inner: OpenAiProvider::new(
                model.endpoint(),
                Endpoint::Completion,
                model.model_name.clone(),
                model.api_key.clone(),
                model.context_window,
                completion,
            )?,
        })
    }
}

#[async_trait]
impl Provider for AzureProvider {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream> {
        let request_id = &context.request_id;
        log::debug!("[{request_id}] requesting completion from {}", self.inner.endpoint());

        let mut request = self
            .inner
            .client()
            .post(self.inner.endpoint())
            .json(&self.inner.body(prompt));
        if let Some(api_key) = self.inner.api_key() {
            request = request.header("api-key", api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SuggestionError::Connection(e.to_string()))?;
        let response = ensure_success(response).await?;

        Ok(self.inner.token_stream(response))
    }
}
