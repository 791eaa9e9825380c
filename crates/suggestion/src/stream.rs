//! Client-side early-stop control over a streamed generation.

pub(crate) mod stop;

use self::stop::{StopDecision, StopStrategy};
use crate::text;

/// Outcome of pushing one token into the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PushResult {
    Continue,
    Finish(String),
}

/// Reconstructs lines from streamed tokens and asks the stop strategy after
/// each token whether the generation has gone on long enough.
///
/// One limiter per generation; once it finishes it must not be reused.
pub(crate) struct StreamLineLimiter {
    result: String,
    current_line: String,
    existed_lines: Vec<String>,
    line_limit: i64,
    strategy: StopStrategy,
}

impl StreamLineLimiter {
    pub fn new(line_limit: i64, strategy: StopStrategy) -> Self {
        Self {
            result: String::new(),
            current_line: String::new(),
            existed_lines: Vec::new(),
            line_limit,
            strategy,
        }
    }

    pub fn push(&mut self, token: &str) -> PushResult {
        self.current_line.push_str(token);

        // Flush everything up to and including the last line terminator in
        // the buffer; what follows it stays as the line in progress.
        if let Some(index) = self.current_line.rfind(['\n', '\r']) {
            let tail = self.current_line.split_off(index + 1);
            let flushed = std::mem::replace(&mut self.current_line, tail);
            let mut lines = text::break_lines(&flushed);
            // The flushed text ends in a terminator, so the split leaves a
            // trailing empty line.
            lines.pop();
            self.existed_lines.append(&mut lines);
        }

        // A non-positive limit disables the limiter entirely.
        let decision = if self.line_limit <= 0 {
            StopDecision::Continue
        } else {
            self.strategy
                .should_stop(&self.existed_lines, &self.current_line, self.line_limit as usize)
        };

        match decision {
            StopDecision::Continue => {
                self.result.push_str(token);
                PushResult::Continue
            }
            StopDecision::Stop { append_new_content } => {
                if append_new_content {
                    self.result.push_str(token);
                }
                PushResult::Finish(self.result.clone())
            }
        }
    }

    /// Whatever has been accepted so far; the generation's result when the
    /// stream ends before the strategy stops it.
    pub fn into_result(self) -> String {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_chars(limiter: &mut StreamLineLimiter, content: &str) -> Option<String> {
        for character in content.chars() {
            if let PushResult::Finish(result) = limiter.push(&character.to_string()) {
                return Some(result);
            }
        }
        None
    }

    #[test]
    fn passes_tokens_through_without_hitting_the_limit() {
        let mut limiter = StreamLineLimiter::new(2, StopStrategy::LineCount);
        let content = "hello world\n";

        assert_eq!(push_chars(&mut limiter, content), None);
        assert_eq!(limiter.into_result(), content);
    }

    #[test]
    fn stops_exactly_at_the_line_limit() {
        let mut limiter = StreamLineLimiter::new(2, StopStrategy::LineCount);
        let content = "hello world\nhello world\nhello world";

        assert_eq!(
            push_chars(&mut limiter, content),
            Some("hello world\nhello world\n".to_string())
        );
    }

    #[test]
    fn handles_multiple_line_endings_in_a_single_token() {
        let mut limiter = StreamLineLimiter::new(4, StopStrategy::LineCount);

        assert_eq!(push_chars(&mut limiter, "hello world"), None);
        assert_eq!(limiter.push("\n\n\n"), PushResult::Continue);
        assert_eq!(
            limiter.push("\n"),
            PushResult::Finish("hello world\n\n\n\n".to_string())
        );
    }

    #[test]
    fn a_bare_carriage_return_ends_a_line() {
        let mut limiter = StreamLineLimiter::new(2, StopStrategy::LineCount);

        assert_eq!(
            push_chars(&mut limiter, "one\rtwo\rthree"),
            Some("one\rtwo\r".to_string())
        );
    }

    #[test]
    fn a_carriage_return_inside_a_token_still_flushes() {
        let mut limiter = StreamLineLimiter::new(1, StopStrategy::LineCount);

        assert_eq!(
            limiter.push("hello\rworld"),
            PushResult::Finish("hello\rworld".to_string())
        );
    }

    #[test]
    fn zero_limit_disables_the_limiter() {
        let mut limiter = StreamLineLimiter::new(0, StopStrategy::LineCount);

        assert_eq!(push_chars(&mut limiter, "a\nb\nc\nd\ne\n"), None);
        assert_eq!(limiter.into_result(), "a\nb\nc\nd\ne\n");
    }

    #[test]
    fn never_strategy_always_continues() {
        let mut limiter = StreamLineLimiter::new(1, StopStrategy::Never);

        assert_eq!(push_chars(&mut limiter, "a\nb\nc\n"), None);
        assert_eq!(limiter.into_result(), "a\nb\nc\n");
    }
}
