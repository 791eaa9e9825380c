//! A stricter variant of the default strategy for models that follow
//! numbered instructions closely and tend to editorialize otherwise.

use std::sync::LazyLock;

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
    strategy::{CLOSING_CODE, CLOSING_SNIPPET, OPENING_CODE, OPENING_SNIPPET, code_summary, indentation},
};

const MAX_PROMPT_LINES: usize = 10;

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are a code completion engine. Your task is STRICT code completion.

Rules:
1. Output ONLY the code that continues from the cursor position, enclosed in {OPENING_CODE} tags
2. Never repeat code that appears before the cursor
3. Never explain, comment on, or describe your completion
4. Match the style, indentation, and conventions of the surrounding code
5. Close the completion with {CLOSING_CODE}

CRITICAL REQUIREMENTS:
- The completion must be syntactically valid at the cursor position
- Do not wrap the output in markdown code blocks
- Do not include any text outside the {OPENING_CODE} and {CLOSING_CODE} tags"#
    )
});

pub(crate) struct AnthropicStrategy {
    pub request: SuggestionRequest,
    pub prefix: Vec<String>,
    pub suffix: Vec<String>,
}

impl AnthropicStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        Self { request, prefix, suffix }
    }

    fn snippets_prompt(included_snippets: &[RelevantSnippet]) -> String {
        if included_snippets.is_empty() {
            return String::new();
        }

        let blocks = included_snippets
            .iter()
            .map(|snippet| format!("{OPENING_SNIPPET}\n{}\n{CLOSING_SNIPPET}", snippet.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("Reference code (analyze for patterns and conventions):\n\n{blocks}")
    }

    fn source_prompt(&self, truncated_prefix: &[String], truncated_suffix: &[String]) -> String {
        let infill_value = self.suggestion_prefix().infill_value;
        let Some((summary, infill_block)) =
            code_summary(truncated_prefix, truncated_suffix, &infill_value, MAX_PROMPT_LINES)
        else {
            return String::new();
        };

        let path = self.request.display_path();
        let indentation = indentation(&self.request);
        format!(
            "Below is the code from file {path} that needs completion.\n\
             You MUST:\n\
             1. Analyze the code's style, patterns, and conventions\n\
             2. Complete the code maintaining exact formatting\n\
             3. Only output code within {OPENING_CODE} tags\n\
             4. Never duplicate existing implementations\n\
             \n\
             File: {path}\n\
             Indentation: {indentation}\n\
             \n\
             Code to complete:\n\
             {summary}\n\
             \n\
             Complete code inside {OPENING_CODE}:\n\
             \n\
             {OPENING_CODE}{infill_block}"
        )
        .trim()
        .to_string()
    }
}

impl Prompt for AnthropicStrategy {
    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT.trim()
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

    /// Only the closing tag. A blank line is a legitimate part of many
    /// completions here, and the line limiter already bounds runaways.
    fn stop_words(&self) -> Vec<String> {
        vec![CLOSING_CODE.to_string()]
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
        let sections = [
            Self::snippets_prompt(included_snippets),
            self.source_prompt(truncated_prefix, truncated_suffix),
        ];
        let content = sections
            .iter()
            .filter(|section| !section.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n");

        vec![PromptMessage::user(content)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::request;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn renders_the_strict_source_prompt() {
        let strategy = AnthropicStrategy::new(
            request(Vec::new()),
            lines(&["fn main() {\n", "    let x = "]),
            lines(&["\n", "}\n"]),
        );

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, &[]);

        assert_eq!(messages.len(), 1);
        let content = &messages[0].content;
        assert!(content.starts_with("Below is the code from file src/main.rs that needs completion."));
        assert!(content.contains("You MUST:"));
        assert!(content.ends_with(&format!("{OPENING_CODE}fn main() {{\n    let x =")));
    }

    #[test]
    fn snippet_block_uses_the_analysis_framing() {
        let snippets = vec![RelevantSnippet {
            content: "fn helper() {}".to_string(),
            priority: 0,
        }];
        let strategy = AnthropicStrategy::new(request(snippets), lines(&["let x = "]), vec![]);

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, strategy.relevant_snippets());

        assert!(
            messages[0]
                .content
                .starts_with("Reference code (analyze for patterns and conventions):")
        );
    }

    #[test]
    fn only_the_closing_tag_is_a_stop_word() {
        let strategy = AnthropicStrategy::new(request(Vec::new()), vec![], vec![]);

        assert_eq!(strategy.stop_words(), vec![CLOSING_CODE.to_string()]);
    }
}
