//! The cancel-and-replace suggestion service: at most one request is in
//! flight, and a new one supersedes it.

use std::sync::atomic::{AtomicU64, Ordering};

use config::Config;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    CodeSuggestion, CursorPosition, CursorRange, SuggestionError, SuggestionRequest,
    orchestrator, provider,
    request::RequestContext,
    strategy::RequestStrategy,
    text,
};

struct InFlightRequest {
    ticket: u64,
    token: CancellationToken,
}

pub struct SuggestionService {
    config: Config,
    in_flight: Mutex<Option<InFlightRequest>>,
    tickets: AtomicU64,
}

impl SuggestionService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            in_flight: Mutex::new(None),
            tickets: AtomicU64::new(0),
        }
    }

    /// Cancel the in-flight request, if any.
    pub async fn cancel(&self) {
        if let Some(in_flight) = self.in_flight.lock().await.take() {
            in_flight.token.cancel();
        }
    }

    /// Produce suggestions for the request, cancelling whatever request was
    /// in flight before it.
    pub async fn suggestions(&self, request: SuggestionRequest) -> crate::Result<Vec<CodeSuggestion>> {
        let (token, ticket) = self.begin_request().await;

        let result = tokio::select! {
            _ = token.cancelled() => Err(SuggestionError::Cancelled),
            result = self.run(request) => result,
        };

        self.finish_request(ticket).await;

        result
    }

    /// Register a fresh token under a unique ticket, cancelling the
    /// predecessor inside the same critical section so no other request can
    /// observe a half-replaced slot.
    async fn begin_request(&self) -> (CancellationToken, u64) {
        let token = CancellationToken::new();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.in_flight.lock().await;
        if let Some(previous) = slot.take() {
            previous.token.cancel();
        }
        *slot = Some(InFlightRequest {
            ticket,
            token: token.clone(),
        });

        (token, ticket)
    }

    /// Clear the slot only while it still holds this request's registration;
    /// a successor may already occupy it.
    async fn finish_request(&self, ticket: u64) {
        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ticket == ticket) {
            *slot = None;
        }
    }

    async fn run(&self, request: SuggestionRequest) -> crate::Result<Vec<CodeSuggestion>> {
        let context = RequestContext::new();
        let request_id = &context.request_id;
        let cursor = request.cursor;
        log::debug!(
            "[{request_id}] completion requested in {} at {}:{}",
            request.display_path(),
            cursor.line,
            cursor.character
        );

        let lines = text::break_lines(&request.content);
        let (prefix, suffix) = text::split_at_cursor(&request.content, &lines, cursor);

        let strategy = RequestStrategy::select(&self.config, request, prefix, suffix);
        if strategy.should_skip() {
            log::debug!("[{request_id}] nothing worth completing at this position");
            return Err(SuggestionError::Skipped);
        }

        let provider = provider::for_model(&self.config)?;
        let prompt = strategy.prompt();
        let stop_strategy = strategy.stop_strategy();
        let post_processor = strategy.post_processor();
        let completion = &self.config.completion;

        let candidates = orchestrator::generate_candidates(
            provider.as_ref(),
            prompt,
            &stop_strategy,
            completion.max_suggestion_lines,
            completion.candidate_count,
            &context,
        )
        .await?;

        let prepending_value = prompt.suggestion_prefix().prepending_value;
        let suggestions: Vec<CodeSuggestion> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let processed = post_processor.post_process(&candidate, &prepending_value, prompt.suffix());
                let clipped = text::keep_lines(&processed, completion.max_suggestion_lines);
                let final_text = text::trim_trailing_whitespace(&clipped);
                if final_text.trim().is_empty() {
                    return None;
                }

                Some(CodeSuggestion {
                    id: Uuid::new_v4().to_string(),
                    text: final_text.to_string(),
                    position: cursor,
                    range: CursorRange {
                        start: CursorPosition {
                            line: cursor.line,
                            character: 0,
                        },
                        end: cursor,
                    },
                })
            })
            .collect();

        log::debug!("[{request_id}] produced {} suggestion(s)", suggestions.len());
        Ok(suggestions)
    }
}
