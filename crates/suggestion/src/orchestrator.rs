//! Fans a request out into concurrent generations and collects candidates.

use futures::{StreamExt, stream::FuturesUnordered};

use crate::{
    prompt::Prompt,
    provider::Provider,
    request::RequestContext,
    stream::{PushResult, StreamLineLimiter},
    stream::stop::StopStrategy,
};

/// Run `candidate_count` generations concurrently, each with its own line
/// limiter, and return every non-blank result.
///
/// A failed generation only fails the batch while no generation has
/// succeeded yet; after the first success, later failures are logged and
/// swallowed so one flaky stream cannot discard good candidates.
pub(crate) async fn generate_candidates(
    provider: &dyn Provider,
    prompt: &dyn Prompt,
    stop_strategy: &StopStrategy,
    line_limit: i64,
    candidate_count: usize,
    context: &RequestContext,
) -> crate::Result<Vec<String>> {
    let mut generations: FuturesUnordered<_> = (0..candidate_count.max(1))
        .map(|_| run_generation(provider, prompt, stop_strategy.clone(), line_limit, context))
        .collect();

    let mut candidates = Vec::new();
    while let Some(outcome) = generations.next().await {
        match outcome {
            Ok(text) => {
                if !text.trim().is_empty() {
                    candidates.push(text);
                }
            }
            Err(e) if candidates.is_empty() => return Err(e),
            Err(e) => {
                let request_id = &context.request_id;
                log::warn!("[{request_id}] discarding failed generation: {e}");
            }
        }
    }

    Ok(candidates)
}

async fn run_generation(
    provider: &dyn Provider,
    prompt: &dyn Prompt,
    stop_strategy: StopStrategy,
    line_limit: i64,
    context: &RequestContext,
) -> crate::Result<String> {
    let mut stream = provider.completion_stream(prompt, context).await?;
    let mut limiter = StreamLineLimiter::new(line_limit, stop_strategy);

    while let Some(token) = stream.next().await {
        // Once the limiter finishes, the rest of the stream is of no use;
        // dropping it aborts the transfer.
        if let PushResult::Finish(result) = limiter.push(&token?) {
            return Ok(result);
        }
    }

    Ok(limiter.into_result())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{SuggestionError, provider::TokenStream};

    /// Replays one script per generation, in call order. A delayed script
    /// yields to the scheduler once before producing anything, so tests can
    /// pin down completion order.
    struct ScriptedProvider {
        scripts: Mutex<Vec<Script>>,
        calls: AtomicUsize,
    }

    struct Script {
        delayed: bool,
        tokens: Vec<crate::Result<String>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts),
                calls: AtomicUsize::new(0),
            }
        }

        fn tokens(raw: &[&str]) -> Script {
            Script {
                delayed: false,
                tokens: raw.iter().map(|token| Ok(token.to_string())).collect(),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn completion_stream(&self, _: &dyn Prompt, _: &RequestContext) -> crate::Result<TokenStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self.scripts.lock().unwrap().remove(0);
            let tokens = futures::stream::iter(script.tokens);
            if script.delayed {
                let lead_in = futures::stream::once(async {
                    tokio::task::yield_now().await;
                    Ok(String::new())
                });
                Ok(Box::pin(lead_in.chain(tokens)))
            } else {
                Ok(Box::pin(tokens))
            }
        }
    }

    struct EmptyPrompt;

    impl Prompt for EmptyPrompt {
        fn system_prompt(&self) -> &str {
            ""
        }

        fn prefix(&self) -> &[String] {
            &[]
        }

        fn suffix(&self) -> &[String] {
            &[]
        }

        fn relevant_snippets(&self) -> &[crate::RelevantSnippet] {
            &[]
        }

        fn stop_words(&self) -> Vec<String> {
            Vec::new()
        }

        fn language(&self) -> Option<&crate::CodeLanguage> {
            None
        }

        fn suggestion_prefix(&self) -> crate::prompt::SuggestionPrefix {
            crate::prompt::SuggestionPrefix::default()
        }

        fn render(
            &self,
            _: &[String],
            _: &[String],
            _: &[crate::RelevantSnippet],
        ) -> Vec<crate::prompt::PromptMessage> {
            Vec::new()
        }
    }

    fn context() -> RequestContext {
        RequestContext::new()
    }

    #[tokio::test]
    async fn collects_the_whole_stream_when_the_limit_is_not_hit() {
        let provider = ScriptedProvider::new(vec![ScriptedProvider::tokens(&["let x", " = 1;"])]);

        let candidates = generate_candidates(&provider, &EmptyPrompt, &StopStrategy::LineCount, 5, 1, &context())
            .await
            .unwrap();

        assert_eq!(candidates, vec!["let x = 1;".to_string()]);
    }

    #[tokio::test]
    async fn the_limiter_clips_a_runaway_generation() {
        let provider = ScriptedProvider::new(vec![ScriptedProvider::tokens(&[
            "one\n", "two\n", "three\n", "four\n", "five\n",
        ])]);

        let candidates = generate_candidates(&provider, &EmptyPrompt, &StopStrategy::LineCount, 2, 1, &context())
            .await
            .unwrap();

        assert_eq!(candidates, vec!["one\ntwo\n".to_string()]);
    }

    #[tokio::test]
    async fn zero_candidate_count_still_runs_one_generation() {
        let provider = ScriptedProvider::new(vec![ScriptedProvider::tokens(&["x"])]);

        let candidates = generate_candidates(&provider, &EmptyPrompt, &StopStrategy::LineCount, 5, 0, &context())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whitespace_only_candidates_are_dropped() {
        let provider = ScriptedProvider::new(vec![ScriptedProvider::tokens(&["  \n  "])]);

        let candidates = generate_candidates(&provider, &EmptyPrompt, &StopStrategy::LineCount, 5, 1, &context())
            .await
            .unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn an_error_with_no_prior_success_fails_the_batch() {
        let provider = ScriptedProvider::new(vec![Script {
            delayed: false,
            tokens: vec![Err(SuggestionError::Api("overloaded".to_string()))],
        }]);

        let result = generate_candidates(&provider, &EmptyPrompt, &StopStrategy::LineCount, 5, 1, &context()).await;

        assert!(matches!(result, Err(SuggestionError::Api(_))));
    }

    #[tokio::test]
    async fn a_late_error_is_swallowed_once_a_candidate_exists() {
        let provider = ScriptedProvider::new(vec![
            ScriptedProvider::tokens(&["good candidate"]),
            Script {
                delayed: true,
                tokens: vec![
                    Ok("partial".to_string()),
                    Err(SuggestionError::Decode("bad chunk".to_string())),
                ],
            },
        ]);

        let candidates = generate_candidates(&provider, &EmptyPrompt, &StopStrategy::LineCount, 5, 2, &context())
            .await
            .unwrap();

        assert_eq!(candidates, vec!["good candidate".to_string()]);
    }
}
