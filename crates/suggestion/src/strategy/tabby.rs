//! For Tabby servers, which take raw prefix/suffix segments and do their own
//! prompt building.

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
};

pub(crate) struct TabbyStrategy {
    pub request: SuggestionRequest,
    pub prefix: Vec<String>,
    pub suffix: Vec<String>,
}

impl TabbyStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        Self { request, prefix, suffix }
    }
}

impl Prompt for TabbyStrategy {
    fn system_prompt(&self) -> &str {
        ""
    }

    fn prefix(&self) -> &[String] {
        &self.prefix
    }

    fn suffix(&self) -> &[String] {
        &self.suffix
    }

    fn relevant_snippets(&self) -> &[RelevantSnippet] {
        &self.request.relevant_snippets
    }

    fn stop_words(&self) -> Vec<String> {
        Vec::new()
    }

    fn language(&self) -> Option<&CodeLanguage> {
        self.request.language.as_ref()
    }

    fn suggestion_prefix(&self) -> SuggestionPrefix {
        match self.prefix.last() {
            Some(line) => SuggestionPrefix::unchanged(line),
            None => SuggestionPrefix::default(),
        }
    }

    fn render(
        &self,
        _truncated_prefix: &[String],
        _truncated_suffix: &[String],
        _included_snippets: &[RelevantSnippet],
    ) -> Vec<PromptMessage> {
        Vec::new()
    }
}
