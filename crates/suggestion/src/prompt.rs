//! The strategy-agnostic prompt model every downstream stage consumes.

use crate::{CodeLanguage, RelevantSnippet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptRole {
    User,
    Assistant,
}

/// A rendered message, ordered sequences of which form the provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// The portion of the cursor's line before the cursor, which the model is
/// expected to continue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SuggestionPrefix {
    /// The line as it appears in the document.
    pub original: String,
    /// The value placed in the prompt. May differ from `original` by
    /// appended whitespace, to coax brace-aware completions.
    pub infill_value: String,
    /// The value re-prepended to the generated suggestion.
    pub prepending_value: String,
}

impl SuggestionPrefix {
    pub fn unchanged(line: &str) -> Self {
        Self {
            original: line.to_string(),
            infill_value: line.to_string(),
            prepending_value: line.to_string(),
        }
    }

    /// A line ending in `{` gets a trailing space so generation starts on
    /// the same line; a line ending in `}` gets a newline so it starts on
    /// the next one.
    pub fn curly_braces_line_break(self) -> Self {
        fn mutate(line: &str) -> String {
            let trimmed = line.trim();
            if trimmed.ends_with('{') {
                return format!("{line} ");
            }
            if trimmed.ends_with('}') {
                return format!("{line}\n");
            }
            line.to_string()
        }

        Self {
            original: self.original,
            infill_value: mutate(&self.infill_value),
            prepending_value: mutate(&self.prepending_value),
        }
    }
}

/// What a request strategy hands to the provider adapters: the normalized
/// prompt content plus the strategy-specific rendering of it.
pub(crate) trait Prompt: Send + Sync {
    fn system_prompt(&self) -> &str;

    /// Source lines before the cursor, terminators preserved.
    fn prefix(&self) -> &[String];

    /// Source lines after the cursor, terminators preserved.
    fn suffix(&self) -> &[String];

    fn relevant_snippets(&self) -> &[RelevantSnippet];

    fn stop_words(&self) -> Vec<String>;

    fn language(&self) -> Option<&CodeLanguage>;

    fn suggestion_prefix(&self) -> SuggestionPrefix;

    /// Render the (possibly truncated) content into provider messages.
    fn render(
        &self,
        truncated_prefix: &[String],
        truncated_suffix: &[String],
        included_snippets: &[RelevantSnippet],
    ) -> Vec<PromptMessage>;
}
