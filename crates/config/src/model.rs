//! Model backend configuration.

use secrecy::SecretString;
use serde::Deserialize;

const AZURE_API_VERSION: &str = "2023-07-01-preview";

/// The model the suggestions are requested from, tagged by API family.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ModelConfig {
    /// A chat-completion model.
    Chat(ChatModelConfig),
    /// A legacy text-completion model.
    Completion(CompletionModelConfig),
    /// A fill-in-the-middle model with a dedicated FIM endpoint.
    Fim(FimModelConfig),
    /// A Tabby completion server.
    Tabby(TabbyModelConfig),
}

impl ModelConfig {
    /// Size of the model's context window, counted with the same unit the
    /// truncation engine uses.
    pub fn context_window(&self) -> usize {
        match self {
            ModelConfig::Chat(config) => config.context_window,
            ModelConfig::Completion(config) => config.context_window,
            ModelConfig::Fim(config) => config.context_window,
            ModelConfig::Tabby(config) => config.context_window,
        }
    }

    /// The API key, if one is configured.
    pub fn api_key(&self) -> Option<&SecretString> {
        match self {
            ModelConfig::Chat(config) => config.api_key.as_ref(),
            ModelConfig::Completion(config) => config.api_key.as_ref(),
            ModelConfig::Fim(config) => config.api_key.as_ref(),
            ModelConfig::Tabby(config) => config.api_key.as_ref(),
        }
    }
}

/// Wire format of a chat-completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatModelFormat {
    /// The OpenAI chat completions API.
    Openai,
    /// Any server speaking the OpenAI chat protocol.
    OpenaiCompatible,
    /// Azure-hosted OpenAI deployments.
    AzureOpenai,
    /// The Anthropic messages API.
    Anthropic,
    /// The Google generative language API.
    GoogleAi,
    /// A local Ollama server.
    Ollama,
    /// Anything else. Rejected when the service is constructed.
    #[serde(other)]
    Unknown,
}

/// Configuration for a chat-completion model.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatModelConfig {
    /// Wire format spoken by the backend.
    pub format: ChatModelFormat,
    /// Model identifier sent in the request body (Azure: the deployment name).
    pub model_name: String,
    /// Base URL override. Defaults per format.
    #[serde(default)]
    pub base_url: Option<String>,
    /// When true, `base_url` is the complete endpoint and no path is appended.
    #[serde(default)]
    pub full_url: bool,
    /// Context window size.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// API key, if the backend needs one.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

impl ChatModelConfig {
    /// The full endpoint URL for streaming chat completions.
    pub fn endpoint(&self) -> String {
        let base = base_or(self.base_url.as_deref(), match self.format {
            ChatModelFormat::Anthropic => "https://api.anthropic.com",
            ChatModelFormat::GoogleAi => "https://generativelanguage.googleapis.com",
            ChatModelFormat::Ollama => "http://localhost:11434",
            _ => "https://api.openai.com",
        });

        if self.full_url {
            return base.to_string();
        }

        match self.format {
            ChatModelFormat::AzureOpenai => {
                format!(
                    "{base}/openai/deployments/{}/chat/completions?api-version={AZURE_API_VERSION}",
                    self.model_name
                )
            }
            ChatModelFormat::Anthropic => format!("{base}/v1/messages"),
            ChatModelFormat::GoogleAi => {
                format!("{base}/v1beta/models/{}:streamGenerateContent", self.model_name)
            }
            ChatModelFormat::Ollama => format!("{base}/api/chat"),
            _ => format!("{base}/v1/chat/completions"),
        }
    }
}

/// Wire format of a legacy text-completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionModelFormat {
    /// The OpenAI legacy completions API.
    Openai,
    /// Any server speaking the OpenAI completions protocol.
    OpenaiCompatible,
    /// Azure-hosted OpenAI deployments.
    AzureOpenai,
    /// A local Ollama server.
    Ollama,
    /// Anything else. Rejected when the service is constructed.
    #[serde(other)]
    Unknown,
}

/// Configuration for a legacy text-completion model.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionModelConfig {
    /// Wire format spoken by the backend.
    pub format: CompletionModelFormat,
    /// Model identifier sent in the request body (Azure: the deployment name).
    pub model_name: String,
    /// Base URL override. Defaults per format.
    #[serde(default)]
    pub base_url: Option<String>,
    /// When true, `base_url` is the complete endpoint and no path is appended.
    #[serde(default)]
    pub full_url: bool,
    /// Context window size.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// API key, if the backend needs one.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

impl CompletionModelConfig {
    /// The full endpoint URL for streaming text completions.
    pub fn endpoint(&self) -> String {
        let base = base_or(self.base_url.as_deref(), match self.format {
            CompletionModelFormat::Ollama => "http://localhost:11434",
            _ => "https://api.openai.com",
        });

        if self.full_url {
            return base.to_string();
        }

        match self.format {
            CompletionModelFormat::AzureOpenai => {
                format!(
                    "{base}/openai/deployments/{}/completions?api-version={AZURE_API_VERSION}",
                    self.model_name
                )
            }
            CompletionModelFormat::Ollama => format!("{base}/api/generate"),
            _ => format!("{base}/v1/completions"),
        }
    }
}

/// Wire format of a fill-in-the-middle backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FimModelFormat {
    /// The Mistral FIM completions API.
    Mistral,
    /// Anything else. Rejected when the service is constructed.
    #[serde(other)]
    Unknown,
}

/// Configuration for a fill-in-the-middle model.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FimModelConfig {
    /// Wire format spoken by the backend.
    pub format: FimModelFormat,
    /// Model identifier sent in the request body.
    pub model_name: String,
    /// Base URL override. Defaults per format.
    #[serde(default)]
    pub base_url: Option<String>,
    /// When true, `base_url` is the complete endpoint and no path is appended.
    #[serde(default)]
    pub full_url: bool,
    /// Context window size.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// API key, if the backend needs one.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

impl FimModelConfig {
    /// The full endpoint URL for FIM completions.
    pub fn endpoint(&self) -> String {
        let base = base_or(self.base_url.as_deref(), "https://api.mistral.ai");

        if self.full_url {
            return base.to_string();
        }

        format!("{base}/v1/fim/completions")
    }
}

/// How requests to a Tabby server authenticate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabbyAuthMode {
    /// No authentication.
    #[default]
    None,
    /// `Authorization: Bearer <api_key>`.
    BearerToken,
    /// HTTP Basic with `username` and the api key as password.
    Basic,
    /// The api key sent verbatim in a custom header.
    CustomHeader,
}

/// Configuration for a Tabby completion server.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TabbyModelConfig {
    /// Base URL of the server.
    #[serde(default)]
    pub base_url: Option<String>,
    /// When true, `base_url` is the complete endpoint and no path is appended.
    #[serde(default)]
    pub full_url: bool,
    /// Context window size. Tabby truncates server-side, so this only bounds
    /// what is sent over the wire.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Authentication mode.
    #[serde(default)]
    pub auth_mode: TabbyAuthMode,
    /// API key or token, depending on the auth mode.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Username for HTTP Basic authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Header name for the custom-header auth mode.
    #[serde(default)]
    pub header_name: Option<String>,
}

impl TabbyModelConfig {
    /// The full endpoint URL for completions.
    pub fn endpoint(&self) -> String {
        let base = base_or(self.base_url.as_deref(), "http://127.0.0.1:8080");

        if self.full_url {
            return base.to_string();
        }

        format!("{base}/v1/completions")
    }
}

fn base_or<'a>(configured: Option<&'a str>, default: &'a str) -> &'a str {
    match configured {
        Some(url) if !url.trim().is_empty() => url.trim_end_matches('/'),
        _ => default,
    }
}

fn default_context_window() -> usize {
    16385
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(format: &str, extra: &str) -> ChatModelConfig {
        let doc = format!("format = \"{format}\"\nmodel_name = \"m\"\n{extra}");
        toml::from_str(&doc).unwrap()
    }

    #[test]
    fn chat_endpoints_per_format() {
        assert_eq!(chat("openai", "").endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(chat("anthropic", "").endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(chat("ollama", "").endpoint(), "http://localhost:11434/api/chat");
        assert_eq!(
            chat("google-ai", "").endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/m:streamGenerateContent"
        );
        assert_eq!(
            chat("azure-openai", "base_url = \"https://example.openai.azure.com\"").endpoint(),
            "https://example.openai.azure.com/openai/deployments/m/chat/completions?api-version=2023-07-01-preview"
        );
    }

    #[test]
    fn full_url_skips_path_derivation() {
        let config = chat(
            "openai-compatible",
            "base_url = \"https://proxy.internal/llm\"\nfull_url = true",
        );
        assert_eq!(config.endpoint(), "https://proxy.internal/llm");
    }

    #[test]
    fn trailing_slash_in_base_url_is_dropped() {
        let config = chat("openai", "base_url = \"https://api.openai.com/\"");
        assert_eq!(config.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn unrecognized_format_maps_to_unknown() {
        let config = chat("deepseek", "");
        assert_eq!(config.format, ChatModelFormat::Unknown);
    }

    #[test]
    fn tabby_defaults_to_localhost() {
        let config: TabbyModelConfig = toml::from_str("").unwrap();
        assert_eq!(config.endpoint(), "http://127.0.0.1:8080/v1/completions");
        assert_eq!(config.auth_mode, TabbyAuthMode::None);
    }
}
