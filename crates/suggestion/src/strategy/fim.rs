//! Fill-in-the-middle over a plain chat or completion endpoint, using the
//! CodeLlama marker convention.

use crate::{
    CodeLanguage, RelevantSnippet, SuggestionRequest,
    prompt::{Prompt, PromptMessage, SuggestionPrefix},
    strategy::{FIM_MIDDLE, FIM_PREFIX, FIM_SUFFIX, indentation},
};

const SYSTEM_PROMPT: &str = "You are a senior programer who take the surrounding code and \
references from the codebase into account in order to write high-quality code to complete \
the code enclosed in the given code. The prefix will follow the PRE tag and the suffix \
will follow the SUF tag. You should write the code that fits seamlessly after the MID tag.";

pub(crate) struct FimStrategy {
    pub request: SuggestionRequest,
    pub prefix: Vec<String>,
    pub suffix: Vec<String>,
    with_system_prompt: bool,
}

impl FimStrategy {
    pub fn new(request: SuggestionRequest, prefix: Vec<String>, suffix: Vec<String>, with_system_prompt: bool) -> Self {
        Self {
            request,
            prefix,
            suffix,
            with_system_prompt,
        }
    }
}

impl Prompt for FimStrategy {
    fn system_prompt(&self) -> &str {
        if self.with_system_prompt { SYSTEM_PROMPT } else { "" }
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
        vec!["\n\n".to_string(), "<EOT>".to_string()]
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
        let path = self.request.display_path();
        let indentation = indentation(&self.request);
        let snippets = included_snippets
            .iter()
            .map(|snippet| snippet.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let suffix = match truncated_suffix.is_empty() {
            true => "\n// End of file".to_string(),
            false => truncated_suffix.concat(),
        };

        let content = format!(
            "{FIM_PREFIX} // File Path: {path}\n\
             // Indentation: {indentation}\n\
             {snippets}\n\
             {} {FIM_SUFFIX}{suffix} {FIM_MIDDLE}",
            truncated_prefix.concat()
        )
        .trim()
        .to_string();

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
    fn lays_out_the_pre_suf_mid_markers() {
        let strategy = FimStrategy::new(
            request(Vec::new()),
            lines(&["fn main() {\n", "    let x = "]),
            lines(&["\n", "}\n"]),
            false,
        );

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, &[]);

        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content,
            "<PRE> // File Path: src/main.rs\n\
             // Indentation: 4 space\n\
             \n\
             fn main() {\n\
             \x20   let x =  <SUF>\n\
             }\n <MID>"
        );
    }

    #[test]
    fn an_empty_suffix_is_marked_as_end_of_file() {
        let strategy = FimStrategy::new(request(Vec::new()), lines(&["let x = "]), vec![], false);

        let messages = strategy.render(&strategy.prefix, &strategy.suffix, &[]);

        assert!(messages[0].content.contains("<SUF>\n// End of file <MID>"));
    }

    #[test]
    fn the_system_prompt_is_opt_in() {
        let bare = FimStrategy::new(request(Vec::new()), vec![], vec![], false);
        let instructed = FimStrategy::new(request(Vec::new()), vec![], vec![], true);

        assert_eq!(bare.system_prompt(), "");
        assert!(instructed.system_prompt().contains("MID tag"));
    }
}
