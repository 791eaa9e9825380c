//! Backend adapters. Each one turns a prompt into a provider request and
//! normalizes the response into a plain token stream.

mod anthropic;
mod azure;
mod google;
mod mistral;
mod ollama;
mod openai;
mod tabby;

use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use config::{ChatModelFormat, CompletionModelFormat, Config, FimModelFormat, ModelConfig};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;

use crate::{
    SuggestionError,
    prompt::{Prompt, PromptMessage, PromptRole},
    request::RequestContext,
    truncation::Truncator,
};

pub(crate) type TokenStream = Pin<Box<dyn Stream<Item = crate::Result<String>> + Send>>;

/// A streaming completion backend.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    async fn completion_stream(&self, prompt: &dyn Prompt, context: &RequestContext) -> crate::Result<TokenStream>;
}

/// Build the adapter for the configured model. Fails on unrecognized
/// formats before anything touches the network.
pub(crate) fn for_model(config: &Config) -> crate::Result<Box<dyn Provider>> {
    let completion = &config.completion;
    match &config.model {
        ModelConfig::Chat(model) => match model.format {
            ChatModelFormat::Openai | ChatModelFormat::OpenaiCompatible => {
                Ok(Box::new(openai::OpenAiProvider::chat(model, completion)?))
            }
            ChatModelFormat::AzureOpenai => Ok(Box::new(azure::AzureProvider::chat(model, completion)?)),
            ChatModelFormat::Anthropic => Ok(Box::new(anthropic::AnthropicProvider::new(model, completion)?)),
            ChatModelFormat::GoogleAi => Ok(Box::new(google::GoogleProvider::new(model, completion)?)),
            ChatModelFormat::Ollama => Ok(Box::new(ollama::OllamaProvider::chat(model, completion)?)),
            ChatModelFormat::Unknown => Err(SuggestionError::UnknownFormat(format!(
                "chat model {}",
                model.model_name
            ))),
        },
        ModelConfig::Completion(model) => match model.format {
            CompletionModelFormat::Openai | CompletionModelFormat::OpenaiCompatible => {
                Ok(Box::new(openai::OpenAiProvider::completion(model, completion)?))
            }
            CompletionModelFormat::AzureOpenai => Ok(Box::new(azure::AzureProvider::completion(model, completion)?)),
            CompletionModelFormat::Ollama => Ok(Box::new(ollama::OllamaProvider::completion(model, completion)?)),
            CompletionModelFormat::Unknown => Err(SuggestionError::UnknownFormat(format!(
                "completion model {}",
                model.model_name
            ))),
        },
        ModelConfig::Fim(model) => match model.format {
            FimModelFormat::Mistral => Ok(Box::new(mistral::MistralProvider::new(model, completion)?)),
            FimModelFormat::Unknown => Err(SuggestionError::UnknownFormat(format!(
                "fim model {}",
                model.model_name
            ))),
        },
        ModelConfig::Tabby(model) => Ok(Box::new(tabby::TabbyProvider::new(model, completion)?)),
    }
}

fn http_client() -> crate::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .default_headers(HeaderMap::new())
        .build()
        .map_err(|e| {
            log::error!("Failed to create HTTP client: {e}");
            SuggestionError::Connection(e.to_string())
        })
}

/// Reject non-2xx responses, surfacing the backend's error body.
async fn ensure_success(response: reqwest::Response) -> crate::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    log::error!("Backend returned {status}: {body}");
    Err(SuggestionError::from_response(status.as_u16(), body))
}

/// What an adapter extracted from one decoded chunk.
struct ChunkText {
    text: Option<String>,
    done: bool,
}

/// Normalize an SSE response into a token stream. `extract` maps each
/// decoded chunk to its text delta and done flag; empty deltas are skipped
/// rather than forwarded.
fn sse_token_stream<C>(response: reqwest::Response, extract: fn(C) -> ChunkText) -> TokenStream
where
    C: serde::de::DeserializeOwned + 'static,
{
    let events = response.bytes_stream().eventsource();

    Box::pin(futures::stream::unfold(
        (events, false),
        move |(mut events, finished)| async move {
            if finished {
                return None;
            }
            loop {
                let event = match events.next().await? {
                    Ok(event) => event,
                    Err(e) => {
                        log::warn!("Stream framing error: {e}");
                        return Some((Err(SuggestionError::Decode(e.to_string())), (events, true)));
                    }
                };

                if event.data == "[DONE]" {
                    return None;
                }
                if event.data.trim().is_empty() {
                    continue;
                }

                let chunk: C = match sonic_rs::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        log::error!("Failed to decode stream chunk: {e}");
                        return Some((Err(SuggestionError::Decode(e.to_string())), (events, true)));
                    }
                };

                match extract(chunk) {
                    ChunkText { text: Some(text), done } if !text.is_empty() => {
                        return Some((Ok(text), (events, done)));
                    }
                    ChunkText { done: true, .. } => return None,
                    ChunkText { .. } => continue,
                }
            }
        },
    ))
}

/// Normalize a newline-delimited JSON response into a token stream.
fn json_lines_token_stream<C>(response: reqwest::Response, extract: fn(C) -> ChunkText) -> TokenStream
where
    C: serde::de::DeserializeOwned + 'static,
{
    let bytes = response.bytes_stream();

    Box::pin(futures::stream::unfold(
        (bytes, Vec::<u8>::new(), std::collections::VecDeque::<Vec<u8>>::new(), false),
        move |(mut bytes, mut buffer, mut pending, finished)| async move {
            if finished {
                return None;
            }
            loop {
                if let Some(raw_line) = pending.pop_front() {
                    let line = match String::from_utf8(raw_line) {
                        Ok(line) => line,
                        Err(e) => {
                            return Some((
                                Err(SuggestionError::Decode(e.to_string())),
                                (bytes, buffer, pending, true),
                            ));
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    let chunk: C = match sonic_rs::from_str(&line) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            log::error!("Failed to decode stream chunk: {e}");
                            return Some((
                                Err(SuggestionError::Decode(e.to_string())),
                                (bytes, buffer, pending, true),
                            ));
                        }
                    };

                    match extract(chunk) {
                        ChunkText { text: Some(text), done } if !text.is_empty() => {
                            return Some((Ok(text), (bytes, buffer, pending, done)));
                        }
                        ChunkText { done: true, .. } => return None,
                        ChunkText { .. } => continue,
                    }
                }

                match bytes.next().await {
                    Some(Ok(piece)) => {
                        buffer.extend_from_slice(&piece);
                        while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                            let mut line: Vec<u8> = buffer.drain(..=newline).collect();
                            line.pop();
                            pending.push_back(line);
                        }
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(SuggestionError::Connection(e.to_string())),
                            (bytes, buffer, pending, true),
                        ));
                    }
                    None => {
                        if buffer.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        pending.push_back(std::mem::take(&mut buffer));
                    }
                }
            }
        },
    ))
}

/// Truncate and render the prompt, then prepend the system prompt as the
/// leading message of an OpenAI-style conversation.
fn chat_messages(prompt: &dyn Prompt, budget: usize) -> Vec<(&'static str, String)> {
    let rendered = Truncator { max_token_limit: budget }.truncated_messages(prompt);

    let mut messages = Vec::with_capacity(rendered.len() + 1);
    let system = prompt.system_prompt();
    if !system.is_empty() {
        messages.push(("system", system.to_string()));
    }
    messages.extend(rendered.into_iter().map(|message| {
        let role = match message.role {
            PromptRole::User => "user",
            PromptRole::Assistant => "assistant",
        };
        (role, message.content)
    }));

    messages
}

/// Flatten the truncated conversation into a single text-completion prompt.
fn completion_prompt(prompt: &dyn Prompt, budget: usize) -> String {
    let rendered = Truncator { max_token_limit: budget }.truncated_messages(prompt);
    let system = prompt.system_prompt();

    let mut sections: Vec<String> = Vec::with_capacity(rendered.len() + 1);
    if !system.is_empty() {
        sections.push(system.to_string());
    }
    sections.extend(rendered.into_iter().map(|PromptMessage { content, .. }| content));

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CodeLanguage, RelevantSnippet,
        prompt::{PromptMessage, SuggestionPrefix},
    };

    struct TwoPartPrompt;

    impl Prompt for TwoPartPrompt {
        fn system_prompt(&self) -> &str {
            "system text"
        }

        fn prefix(&self) -> &[String] {
            &[]
        }

        fn suffix(&self) -> &[String] {
            &[]
        }

        fn relevant_snippets(&self) -> &[RelevantSnippet] {
            &[]
        }

        fn stop_words(&self) -> Vec<String> {
            Vec::new()
        }

        fn language(&self) -> Option<&CodeLanguage> {
            None
        }

        fn suggestion_prefix(&self) -> SuggestionPrefix {
            SuggestionPrefix::default()
        }

        fn render(&self, _: &[String], _: &[String], _: &[RelevantSnippet]) -> Vec<PromptMessage> {
            vec![PromptMessage::user("first"), PromptMessage::assistant("second")]
        }
    }

    #[test]
    fn chat_messages_lead_with_the_system_prompt() {
        let messages = chat_messages(&TwoPartPrompt, 10_000);

        assert_eq!(messages, vec![
            ("system", "system text".to_string()),
            ("user", "first".to_string()),
            ("assistant", "second".to_string()),
        ]);
    }

    #[test]
    fn completion_prompt_joins_sections_with_blank_lines() {
        assert_eq!(completion_prompt(&TwoPartPrompt, 10_000), "system text\n\nfirst\n\nsecond");
    }

    #[test]
    fn unknown_formats_are_rejected_up_front() {
        let doc = r#"
            [model]
            type = "chat"
            format = "deepseek"
            model_name = "m"
        "#;
        let config: Config = toml::from_str(doc).unwrap();

        assert!(matches!(for_model(&config), Err(SuggestionError::UnknownFormat(_))));
    }
}
