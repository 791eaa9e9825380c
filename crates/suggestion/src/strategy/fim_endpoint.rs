//! For backends with a native fill-in-the-middle endpoint: no message
//! rendering at all, the adapter consumes prefix and suffix directly.
//! Snippets are folded into the front of the prefix.

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
};

pub(crate) struct FimEndpointStrategy {
    pub request: SuggestionRequest,
    source_prefix: Vec<String>,
    prefix: Vec<String>,
    suffix: Vec<String>,
}

impl FimEndpointStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        let folded = request
            .relevant_snippets
            .iter()
            .map(|snippet| format!("{}\n\n", snippet.content))
            .chain(prefix.iter().cloned())
            .collect();

        Self {
            request,
            source_prefix: prefix,
            prefix: folded,
            suffix,
        }
    }

    /// The document's own prefix lines, without the folded snippets.
    pub fn source_prefix(&self) -> &[String] {
        &self.source_prefix
    }
}

impl Prompt for FimEndpointStrategy {
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
        match self.source_prefix.last() {
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
