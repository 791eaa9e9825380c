//! The request strategies: policy objects that render the cursor context
//! into provider messages and supply the matching stop strategy and
//! post-processor.

mod anthropic;
mod continuation;
mod default;
mod fim;
mod fim_endpoint;
mod naive;
mod tabby;

use config::{Config, ModelConfig, RequestStrategyId};

use crate::{
    RelevantSnippet, SuggestionRequest,
    postprocess::PostProcessor,
    prompt::Prompt,
    stream::stop::StopStrategy,
};

/// Sentinel tags the models are instructed to wrap completions in. The
/// numeric suffixes keep them from colliding with real code.
pub(crate) const OPENING_CODE: &str = "<Code3721>";
pub(crate) const CLOSING_CODE: &str = "</Code3721>";
pub(crate) const OPENING_SNIPPET: &str = "<Snippet9981>";
pub(crate) const CLOSING_SNIPPET: &str = "</Snippet9981>";

pub(crate) const FIM_PREFIX: &str = "<PRE>";
pub(crate) const FIM_SUFFIX: &str = "<SUF>";
pub(crate) const FIM_MIDDLE: &str = "<MID>";

pub(crate) const CONTINUE_MARKER: &str = "<|stop|>";

pub(crate) enum RequestStrategy {
    Default(default::DefaultStrategy),
    Naive(naive::NaiveStrategy),
    Continue(continuation::ContinueStrategy),
    Anthropic(anthropic::AnthropicStrategy),
    Fim(fim::FimStrategy),
    FimEndpoint(fim_endpoint::FimEndpointStrategy),
    Tabby(tabby::TabbyStrategy),
}

impl RequestStrategy {
    /// Pick the strategy for a request. FIM and Tabby models dictate their
    /// own; everything else follows the configured strategy id.
    pub fn select(config: &Config, request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        match &config.model {
            ModelConfig::Fim(_) => {
                Self::FimEndpoint(fim_endpoint::FimEndpointStrategy::new(request, prefix, suffix))
            }
            ModelConfig::Tabby(_) => Self::Tabby(tabby::TabbyStrategy::new(request, prefix, suffix)),
            _ => match config.completion.strategy {
                RequestStrategyId::Default => Self::Default(default::DefaultStrategy::new(request, prefix, suffix)),
                RequestStrategyId::Naive => Self::Naive(naive::NaiveStrategy::new(request, prefix, suffix)),
                RequestStrategyId::Continue => {
                    Self::Continue(continuation::ContinueStrategy::new(request, prefix, suffix))
                }
                RequestStrategyId::AnthropicOptimized => {
                    Self::Anthropic(anthropic::AnthropicStrategy::new(request, prefix, suffix))
                }
                RequestStrategyId::CodeLlamaFillInTheMiddle => {
                    Self::Fim(fim::FimStrategy::new(request, prefix, suffix, false))
                }
                RequestStrategyId::CodeLlamaFillInTheMiddleWithSystemPrompt => {
                    Self::Fim(fim::FimStrategy::new(request, prefix, suffix, true))
                }
            },
        }
    }

    /// Completing right after a lone closing brace is rarely useful; the
    /// service treats this as a soft cancellation.
    pub fn should_skip(&self) -> bool {
        lone_closing_brace(self.source_prefix())
    }

    pub fn prompt(&self) -> &dyn Prompt {
        match self {
            Self::Default(strategy) => strategy,
            Self::Naive(strategy) => strategy,
            Self::Continue(strategy) => strategy,
            Self::Anthropic(strategy) => strategy,
            Self::Fim(strategy) => strategy,
            Self::FimEndpoint(strategy) => strategy,
            Self::Tabby(strategy) => strategy,
        }
    }

    pub fn stop_strategy(&self) -> StopStrategy {
        match self {
            Self::Default(_) | Self::Naive(_) | Self::Continue(_) => StopStrategy::OpeningTag {
                tag: OPENING_CODE,
                tolerance: 4,
            },
            // This backend follows formatting instructions reliably, no
            // tolerance needed.
            Self::Anthropic(_) => StopStrategy::OpeningTag {
                tag: OPENING_CODE,
                tolerance: 0,
            },
            Self::Fim(_) | Self::FimEndpoint(_) => StopStrategy::FimLoopGuard {
                prefix_last_line: self.source_prefix().last().cloned(),
            },
            // Tabby responds in one non-streamed piece; clipping happens
            // after post-processing.
            Self::Tabby(_) => StopStrategy::Never,
        }
    }

    pub fn post_processor(&self) -> PostProcessor {
        match self {
            Self::Default(_) | Self::Naive(_) | Self::Anthropic(_) => {
                PostProcessor::new(Some((OPENING_CODE, CLOSING_CODE)))
            }
            Self::Continue(_) => PostProcessor {
                code_wrapping_tags: Some((OPENING_CODE, CLOSING_CODE)),
                continuation_marker: Some(CONTINUE_MARKER),
            },
            Self::Fim(_) | Self::FimEndpoint(_) | Self::Tabby(_) => PostProcessor::new(None),
        }
    }

    fn source_prefix(&self) -> &[String] {
        match self {
            Self::Default(strategy) => &strategy.prefix,
            Self::Naive(strategy) => &strategy.prefix,
            Self::Continue(strategy) => &strategy.prefix,
            Self::Anthropic(strategy) => &strategy.prefix,
            Self::Fim(strategy) => &strategy.prefix,
            Self::FimEndpoint(strategy) => strategy.source_prefix(),
            Self::Tabby(strategy) => &strategy.prefix,
        }
    }
}

fn lone_closing_brace(prefix: &[String]) -> bool {
    prefix.last().map(|line| line.trim() == "}").unwrap_or(false)
}

/// The indentation line shared by every prompt layout.
fn indentation(request: &SuggestionRequest) -> String {
    format!(
        "{} {}",
        request.indent_size,
        if request.uses_tabs_for_indentation { "tab" } else { "space" }
    )
}

/// The shared infill framing: the summary shows the whole file with the tag
/// pair marking the completion site, and the infill block repeats the lines
/// right before the cursor for the model to continue.
fn code_summary(
    truncated_prefix: &[String],
    truncated_suffix: &[String],
    suggestion_prefix: &str,
    max_prompt_lines: usize,
) -> Option<(String, String)> {
    if truncated_prefix.is_empty() && truncated_suffix.is_empty() {
        return None;
    }

    let prompt_lines_count = max_prompt_lines.min(truncated_prefix.len().max(2));
    let keep = truncated_prefix.len().saturating_sub(prompt_lines_count);

    let tail = &truncated_prefix[keep..];
    let mut infill_block: String = tail[..tail.len().saturating_sub(1)].concat();
    infill_block.push_str(suggestion_prefix);

    let summary = format!(
        "{}{OPENING_CODE}{CLOSING_CODE}{}",
        truncated_prefix[..keep].concat(),
        truncated_suffix.concat()
    );

    Some((summary, infill_block))
}

/// Snippet blocks for the tag-based strategies.
fn snippets_block(snippets: &[RelevantSnippet]) -> String {
    if snippets.is_empty() {
        return String::new();
    }

    let mut content = String::from("References from codebase: \n\n");
    for snippet in snippets {
        content.push_str(&format!(
            "{OPENING_SNIPPET}\n{}\n{CLOSING_SNIPPET}\n\n",
            snippet.content
        ));
    }

    content.trim().to_string()
}
