//! A three-message strategy: a mock assistant turn ends mid-completion at a
//! continuation marker and the model is asked to pick up from there. Chat
//! models that refuse bare infill often comply with this framing.

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
    strategy::{CLOSING_CODE, CONTINUE_MARKER, OPENING_CODE, code_summary, indentation, snippets_block},
};

const MAX_PROMPT_LINES: usize = 4;

const SYSTEM_PROMPT: &str = "You are a senior programer who take the surrounding code and \
references from the codebase into account in order to write high-quality code to complete \
the code enclosed in the given code. You only respond with code that works and fits \
seamlessly with surrounding code. Don't include anything else beyond the code.";

pub(crate) struct ContinueStrategy {
    pub request: SuggestionRequest,
    pub prefix: Vec<String>,
    pub suffix: Vec<String>,
}

impl ContinueStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        Self { request, prefix, suffix }
    }

    fn source_prompt(&self, summary: &str) -> String {
        let path = self.request.display_path();
        let indentation = indentation(&self.request);
        let language_hint = self.language().map(CodeLanguage::as_str).unwrap_or_default();
        let language_line = match self.language() {
            Some(language) => format!("Language: {}\n", language.as_str()),
            None => String::new(),
        };

        format!(
            "Below is the code from file {path} that you are trying to complete.\n\
             Review the code carefully, detect the functionality, formats, style, patterns, \
             and logics in use and use them to predict the completion. \
             Make sure your completion has the correct syntax and formatting. \
             Do not duplicate existing implementations.\n\
             \n\
             File Path: {path}\n\
             {language_line}\
             Indentation: {indentation}\n\
             \n\
             ---\n\
             \n\
             Here is the code:\n\
             ```{language_hint}\n\
             {summary}\n\
             ```\n\
             \n\
             Complete code inside {OPENING_CODE}"
        )
        .trim()
        .to_string()
    }
}

impl Prompt for ContinueStrategy {
    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
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
        vec![CLOSING_CODE.to_string(), "\n\n".to_string()]
    }

    fn language(&self) -> Option<&CodeLanguage> {
        self.request.language.as_ref()
    }

    fn suggestion_prefix(&self) -> SuggestionPrefix {
        match self.prefix.last() {
            Some(line) => SuggestionPrefix::unchanged(line).curly_braces_line_break(),
            None => SuggestionPrefix::default(),
        }
    }

    fn render(
        &self,
        truncated_prefix: &[String],
        truncated_suffix: &[String],
        included_snippets: &[RelevantSnippet],
    ) -> Vec<PromptMessage> {
        let infill_value = self.suggestion_prefix().infill_value;
        let (summary, infill_block) =
            code_summary(truncated_prefix, truncated_suffix, &infill_value, MAX_PROMPT_LINES)
                .unwrap_or_default();

        let sections = [snippets_block(included_snippets), self.source_prompt(&summary)];
        let initial = sections
            .iter()
            .filter(|section| !section.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n");

        vec![
            PromptMessage::user(initial),
            PromptMessage::assistant(format!("{infill_block}{CONTINUE_MARKER}")),
            PromptMessage::user(format!(
                "Continue generating at {CONTINUE_MARKER}. \
                 Do not put the response in a markdown code block. \
                 Do not try to fix what was written. \
                 Do not worry about typos."
            )),
        ]
    }
}
