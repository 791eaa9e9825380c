//! A minimal "keep writing" strategy for weaker models that cannot handle
//! the infill framing: everything is concatenated into one block and the
//! model continues from the end.

use std::sync::LazyLock;

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
    strategy::{CLOSING_CODE, OPENING_CODE, indentation},
};

const MAX_PROMPT_LINES: usize = 10;

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "You are a code completion AI designed to take the surrounding code and \
         references from the codebase into account in order to predict and suggest \
         high-quality code to complete the code enclosed in {OPENING_CODE} tags.\n\
         You only respond with code that works and fits seamlessly with surrounding code.\n\
         Do not include anything else beyond the code.\n\
         \n\
         Code completion means to keep writing the code. For example, if I tell you to \n\
         ###\n\
         Keep writing the following code:\n\
         \n\
         {OPENING_CODE}\n\
         print(\"Hello\n\
         ###\n\
         \n\
         You should respond with:\n\
         ###\n\
         \x20World\"){CLOSING_CODE}\n\
         ###"
    )
});

pub(crate) struct NaiveStrategy {
    pub request: SuggestionRequest,
    pub prefix: Vec<String>,
    pub suffix: Vec<String>,
}

impl NaiveStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>) -> Self {
        Self { request, prefix, suffix }
    }

    fn code_block(truncated_prefix: &[String], truncated_suffix: &[String], snippets: &[RelevantSnippet]) -> String {
        let prompt_lines_count = MAX_PROMPT_LINES.min(truncated_prefix.len().max(2));
        let keep = truncated_prefix.len().saturating_sub(prompt_lines_count);
        let mut prompt_lines: Vec<String> = truncated_prefix[keep..].to_vec();
        // A blank line before the cursor gives the model nothing to latch
        // onto; keep it and plant an instruction comment after it.
        if let Some(last) = prompt_lines.last().cloned()
            && last.trim().is_empty()
        {
            prompt_lines.push(format!("// write some code\n{last}"));
        }

        let mut sections = Vec::new();
        if !snippets.is_empty() {
            sections.push(
                snippets
                    .iter()
                    .map(|snippet| snippet.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            );
        }
        if !truncated_suffix.is_empty() {
            sections.push(format!(
                "// From the end of the file\n{}\n// End",
                truncated_suffix.concat()
            ));
        }
        sections.push(format!("{}{}", truncated_prefix[..keep].concat(), prompt_lines.concat()));

        sections.join("\n\n")
    }
}

impl Prompt for NaiveStrategy {
    fn system_prompt(&self) -> &str {
        &SYSTEM_PROMPT
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
            Some(line) => SuggestionPrefix::unchanged(line),
            None => SuggestionPrefix::default(),
        }
    }

    fn render(
        &self,
        truncated_prefix: &[String],
        truncated_suffix: &[String],
        included_snippets: &[RelevantSnippet],
    ) -> Vec<PromptMessage> {
        let path = self.request.display_path();
        let indentation = indentation(&self.request);
        let code = Self::code_block(truncated_prefix, truncated_suffix, included_snippets);

        vec![PromptMessage::user(format!(
            "File path: {path}\n\
             Indentation: {indentation}\n\
             \n\
             ---\n\
             \n\
             Keep writing the following code:\n\
             \n\
             {OPENING_CODE}\n\
             {code}"
        ))]
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
    fn the_suffix_is_shown_before_the_prefix_as_a_comment_block() {
        let strategy = NaiveStrategy::new(
            request(Vec::new()),
            lines(&["fn main() {\n", "    let x = "]),
            lines(&["\n", "}\n"]),
        );

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, &[]);

        assert_eq!(messages.len(), 1);
        let content = &messages[0].content;
        assert!(content.starts_with("File path: src/main.rs\nIndentation: 4 space"));
        assert!(content.contains("// From the end of the file\n\n}\n\n// End"));
        assert!(content.ends_with("fn main() {\n    let x = "));
    }

    #[test]
    fn blank_cursor_line_is_kept_with_an_instruction_comment_after_it() {
        let strategy = NaiveStrategy::new(request(Vec::new()), lines(&["fn main() {\n", "    "]), vec![]);

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, &[]);

        assert!(
            messages[0]
                .content
                .ends_with("fn main() {\n    // write some code\n    ")
        );
    }

    #[test]
    fn the_system_prompt_carries_a_worked_example() {
        let strategy = NaiveStrategy::new(request(Vec::new()), vec![], vec![]);

        let system = strategy.system_prompt();
        assert!(system.contains("###\nKeep writing the following code:"));
        assert!(system.contains(&format!(" World\"){CLOSING_CODE}")));
    }

    #[test]
    fn suggestion_prefix_is_left_untouched() {
        let strategy = NaiveStrategy::new(request(Vec::new()), lines(&["impl Foo {"]), vec![]);

        assert_eq!(strategy.suggestion_prefix().infill_value, "impl Foo {");
    }
}
