//! Decides when an in-flight generation has produced enough lines.

/// Per-token verdict. Terminal once `Stop` is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopDecision {
    Continue,
    Stop { append_new_content: bool },
}

/// The strategies are pure functions of the accumulated lines; which one a
/// request uses is decided by its request strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StopStrategy {
    /// Let the stream run to its natural end.
    Never,
    /// Stop once the line limit is reached.
    LineCount,
    /// Count lines only after the opening tag's line. The tolerance bounds
    /// how long to wait for a tag that never appears, so a model that skips
    /// the tag cannot run forever.
    OpeningTag { tag: &'static str, tolerance: usize },
    /// Models given FIM markers sometimes echo the pre-cursor context back;
    /// count lines only after the echoed last prefix line, falling back to a
    /// flat line count when no echo is found.
    FimLoopGuard { prefix_last_line: Option<String> },
}

impl StopStrategy {
    pub fn should_stop(&self, existed_lines: &[String], _current_line: &str, line_limit: usize) -> StopDecision {
        match self {
            StopStrategy::Never => StopDecision::Continue,

            StopStrategy::LineCount => stop_at(existed_lines.len(), line_limit),

            StopStrategy::OpeningTag { tag, tolerance } => {
                match existed_lines.iter().position(|line| line.contains(tag)) {
                    Some(index) => stop_at(existed_lines.len() - index - 1, line_limit),
                    None => stop_at(existed_lines.len(), line_limit + tolerance),
                }
            }

            StopStrategy::FimLoopGuard { prefix_last_line } => {
                let Some(last_line) = prefix_last_line else {
                    return stop_at(existed_lines.len(), line_limit);
                };
                match existed_lines.iter().rposition(|line| line == last_line) {
                    Some(index) => stop_at(existed_lines.len(), index + 1 + line_limit),
                    None => stop_at(existed_lines.len(), line_limit),
                }
            }
        }
    }
}

fn stop_at(line_count: usize, limit: usize) -> StopDecision {
    if line_count >= limit {
        StopDecision::Stop { append_new_content: true }
    } else {
        StopDecision::Continue
    }
}
