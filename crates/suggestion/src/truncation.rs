//! Fits a prompt into a provider's token budget by iteratively dropping
//! content.
//!
//! Sizes are measured in characters as a cheap token-count proxy. The drop
//! weights prefer discarding suffix and snippets before prefix, since the
//! prefix is usually the most predictive part of the prompt.

use crate::{
    RelevantSnippet,
    prompt::{Prompt, PromptMessage},
};

const PREFIX_DROP_WEIGHT: usize = 1;
const SUFFIX_DROP_WEIGHT: usize = 5;
const SNIPPETS_DROP_WEIGHT: usize = 8;

/// The budget an adapter hands the truncator: the whole context window minus
/// the generation reserve and a safety margin, but never less than two
/// thirds of the window.
pub(crate) fn token_budget(context_window: usize, max_output_tokens: u32) -> usize {
    (context_window / 3 * 2).max(context_window.saturating_sub(max_output_tokens as usize + 20))
}

pub(crate) struct Truncator {
    pub max_token_limit: usize,
}

impl Truncator {
    /// Render the prompt, dropping content until it fits the limit or
    /// nothing is left to drop. Each drop strictly shrinks a non-empty
    /// collection, so the loop terminates.
    pub fn truncated_messages(&self, prompt: &dyn Prompt) -> Vec<PromptMessage> {
        let mut prefix = prompt.prefix().to_vec();
        let mut suffix = prompt.suffix().to_vec();
        let mut snippets = prompt.relevant_snippets().to_vec();

        let mut messages = prompt.render(&prefix, &suffix, &snippets);

        let limit = self
            .max_token_limit
            .saturating_sub(prompt.system_prompt().chars().count());

        while count_tokens(&messages) > limit && !(prefix.is_empty() && suffix.is_empty() && snippets.is_empty()) {
            let p = prefix.len() * PREFIX_DROP_WEIGHT;
            let s = suffix.len() * SUFFIX_DROP_WEIGHT;
            let n = snippets.len() * SNIPPETS_DROP_WEIGHT;

            let max_score = p.max(s).max(n);
            if max_score == s {
                truncate_suffix(&mut suffix);
            } else if max_score == n {
                truncate_snippets(&mut snippets);
            } else {
                truncate_prefix(&mut prefix);
            }

            messages = prompt.render(&prefix, &suffix, &snippets);
        }

        messages
    }
}

pub(crate) fn count_tokens(messages: &[PromptMessage]) -> usize {
    messages.iter().map(|message| message.content.chars().count()).sum()
}

/// Drop the last third, keeping the lines nearest the cursor.
fn truncate_suffix(suffix: &mut Vec<String>) {
    if suffix.is_empty() {
        return;
    }
    let drop_count = (suffix.len() / 3).max(1);
    suffix.truncate(suffix.len() - drop_count);
}

/// Drop the leading quarter, keeping the lines nearest the cursor.
fn truncate_prefix(prefix: &mut Vec<String>) {
    if prefix.is_empty() {
        return;
    }
    let drop_count = (prefix.len() / 4).max(1);
    prefix.drain(..drop_count);
}

/// Snippets are ordered by priority, so the last one is the cheapest loss.
fn truncate_snippets(snippets: &mut Vec<RelevantSnippet>) {
    snippets.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CodeLanguage, prompt::SuggestionPrefix};

    struct PlainPrompt {
        prefix: Vec<String>,
        suffix: Vec<String>,
        snippets: Vec<RelevantSnippet>,
    }

    impl Prompt for PlainPrompt {
        fn system_prompt(&self) -> &str {
            "system"
        }

        fn prefix(&self) -> &[String] {
            &self.prefix
        }

        fn suffix(&self) -> &[String] {
            &self.suffix
        }

        fn relevant_snippets(&self) -> &[RelevantSnippet] {
            &self.snippets
        }

        fn stop_words(&self) -> Vec<String> {
            Vec::new()
        }

        fn language(&self) -> Option<&CodeLanguage> {
            None
        }

        fn suggestion_prefix(&self) -> SuggestionPrefix {
            SuggestionPrefix::default()
        }

        fn render(
            &self,
            truncated_prefix: &[String],
            truncated_suffix: &[String],
            included_snippets: &[RelevantSnippet],
        ) -> Vec<PromptMessage> {
            let snippets: String = included_snippets.iter().map(|s| s.content.as_str()).collect();
            let content = format!(
                "{snippets}{}{}",
                truncated_prefix.concat(),
                truncated_suffix.concat()
            );
            vec![PromptMessage::user(content)]
        }
    }

    fn lines(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("line number {i}\n")).collect()
    }

    #[test]
    fn renders_untouched_when_within_budget() {
        let prompt = PlainPrompt {
            prefix: lines(3),
            suffix: lines(3),
            snippets: Vec::new(),
        };

        let messages = Truncator { max_token_limit: 10_000 }.truncated_messages(&prompt);

        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("line number 2"));
    }

    #[test]
    fn fits_the_budget_or_drops_everything() {
        let prompt = PlainPrompt {
            prefix: lines(100),
            suffix: lines(100),
            snippets: vec![
                RelevantSnippet {
                    content: "x".repeat(500),
                    priority: 0,
                },
                RelevantSnippet {
                    content: "y".repeat(500),
                    priority: 1,
                },
            ],
        };

        for limit in [50, 200, 1_000, 2_000] {
            let messages = Truncator { max_token_limit: limit }.truncated_messages(&prompt);
            let size = count_tokens(&messages);
            assert!(
                size <= limit || size == 0,
                "limit {limit} produced render of size {size}"
            );
        }
    }

    #[test]
    fn suffix_and_snippets_are_dropped_before_prefix() {
        let prompt = PlainPrompt {
            prefix: (0..4).map(|i| format!("above {i}\n")).collect(),
            suffix: (0..12).map(|i| format!("below {i}\n")).collect(),
            snippets: vec![
                RelevantSnippet {
                    content: "x".repeat(200),
                    priority: 0,
                },
                RelevantSnippet {
                    content: "x".repeat(200),
                    priority: 1,
                },
            ],
        };

        // Large enough to keep the prefix, small enough to force drops.
        let messages = Truncator { max_token_limit: 100 }.truncated_messages(&prompt);

        let content = &messages[0].content;
        assert!(content.contains("above 0"));
        assert!(!content.contains('x'));
        assert!(!content.contains("below 11"));
    }

    #[test]
    fn budget_keeps_a_floor_of_two_thirds_of_the_window() {
        assert_eq!(token_budget(3000, 300), 3000 - 300 - 20);
        assert_eq!(token_budget(300, 300), 200);
    }
}
