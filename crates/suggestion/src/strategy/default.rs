//! The general-purpose chat strategy: the file summary carries a sentinel
//! tag pair at the cursor and the model continues the infill block.

use std::sync::LazyLock;

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
    strategy::{CLOSING_CODE, OPENING_CODE, code_summary, indentation, snippets_block},
};

const MAX_PROMPT_LINES: usize = 10;

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"You are a senior programer who take the surrounding code and references from the codebase into account in order to write high-quality code to complete the code enclosed in {OPENING_CODE} tags. You only respond with code that works and fits seamlessly with surrounding code. Don't include anything else beyond the code.

Code completion means to keep writing the code. For example, if I tell you to
###
Complete code inside {OPENING_CODE}:

{OPENING_CODE}
print("Hello
###

You should respond with:
###
 World"){CLOSING_CODE}
###"#
    )
});

pub(crate) struct DefaultStrategy {
    pub request: SuggestionRequest,
    pub prefix: Vec<String>,
    pub suffix: Vec<String>,
}

impl DefaultStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        Self { request, prefix, suffix }
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
            "Below is the code from file {path} that you are trying to complete.\n\
             Review the code carefully, detect the functionality, formats, style, patterns, \
             and logics in use and use them to predict the completion. \
             Make sure your completion has the correct syntax and formatting. \
             Enclose the completion the XML tag {OPENING_CODE}. \
             Don't duplicate existing implementations. \n\
             File Path: {path}\n\
             Indentation: {indentation}\n\
             \n\
             ---\n\
             \n\
             Here is the code:\n\
             ```\n\
             {summary}\n\
             ```\n\
             \n\
             Complete code inside {OPENING_CODE}:\n\
             \n\
             {OPENING_CODE}{infill_block}"
        )
        .trim()
        .to_string()
    }
}

impl Prompt for DefaultStrategy {
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
        let sections = [
            snippets_block(included_snippets),
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
    fn renders_a_single_user_message_with_the_tagged_summary() {
        let strategy = DefaultStrategy::new(
            request(Vec::new()),
            lines(&["fn main() {\n", "    let x = "]),
            lines(&["\n", "}\n"]),
        );

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, &[]);

        assert_eq!(messages.len(), 1);
        let content = &messages[0].content;
        assert!(content.starts_with("Below is the code from file src/main.rs"));
        assert!(content.contains(&format!("{OPENING_CODE}{CLOSING_CODE}\n}}\n")));
        // The source prompt is trimmed, so the infill's trailing space goes.
        assert!(content.ends_with(&format!("{OPENING_CODE}fn main() {{\n    let x =")));
    }

    #[test]
    fn snippets_come_before_the_source_prompt() {
        let snippets = vec![RelevantSnippet {
            content: "fn helper() {}".to_string(),
            priority: 0,
        }];
        let strategy = DefaultStrategy::new(request(snippets), lines(&["let x = "]), vec![]);

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, strategy.relevant_snippets());

        let content = &messages[0].content;
        assert!(content.starts_with("References from codebase: \n\n<Snippet9981>\nfn helper() {}\n</Snippet9981>"));
        assert!(content.contains("Below is the code from file"));
    }

    #[test]
    fn open_brace_prefix_is_padded_for_infill_and_prepending() {
        let strategy = DefaultStrategy::new(request(Vec::new()), lines(&["impl Foo {"]), vec![]);

        let prefix = strategy.suggestion_prefix();
        assert_eq!(prefix.infill_value, "impl Foo { ");
        assert_eq!(prefix.prepending_value, "impl Foo { ");
    }

    #[test]
    fn stop_words_close_the_tag_or_the_paragraph() {
        let strategy = DefaultStrategy::new(request(Vec::new()), vec![], vec![]);

        assert_eq!(strategy.stop_words(), vec![CLOSING_CODE.to_string(), "\n\n".to_string()]);
    }
}
