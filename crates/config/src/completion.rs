//! Prompt construction and post-processing tuning.

use serde::Deserialize;

/// Tuning knobs shared by all request strategies.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CompletionConfig {
    /// The request strategy used for chat and completion models. FIM and
    /// Tabby models ignore this and use their own.
    pub strategy: RequestStrategyId,
    /// Suggestions are clipped to this many lines. Zero or negative disables
    /// the limit.
    pub max_suggestion_lines: i64,
    /// Upper bound on generated tokens per request.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Number of concurrent generations per request.
    pub candidate_count: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            strategy: RequestStrategyId::Default,
            max_suggestion_lines: 5,
            max_output_tokens: 300,
            temperature: 0.2,
            candidate_count: 1,
        }
    }
}

/// Persisted identifier of a request strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStrategyId {
    /// Tag-delimited infill prompt with a line-count stop.
    #[default]
    Default,
    /// Single-message prompt, suffix first.
    Naive,
    /// Mock assistant turn that the model continues.
    Continue,
    /// Tag-delimited prompt tuned for Anthropic models.
    AnthropicOptimized,
    /// `<PRE>`/`<SUF>`/`<MID>` markers in a single message.
    CodeLlamaFillInTheMiddle,
    /// Same markers, plus an instructional system prompt.
    CodeLlamaFillInTheMiddleWithSystemPrompt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_ids_round_trip_from_kebab_case() {
        let cases = [
            ("default", RequestStrategyId::Default),
            ("naive", RequestStrategyId::Naive),
            ("continue", RequestStrategyId::Continue),
            ("anthropic-optimized", RequestStrategyId::AnthropicOptimized),
            ("code-llama-fill-in-the-middle", RequestStrategyId::CodeLlamaFillInTheMiddle),
            (
                "code-llama-fill-in-the-middle-with-system-prompt",
                RequestStrategyId::CodeLlamaFillInTheMiddleWithSystemPrompt,
            ),
        ];

        for (id, expected) in cases {
            let doc = format!("strategy = \"{id}\"");
            let config: CompletionConfig = toml::from_str(&doc).unwrap();
            assert_eq!(config.strategy, expected);
        }
    }
}
