//! Cleans raw model output into a usable suggestion.
//!
//! Models wrap completions in markdown fences, echo the sentinel tags they
//! were shown, repeat the line they were asked to continue, and regenerate
//! code that already exists after the cursor. Each step here undoes one of
//! those habits.

use crate::text;

pub(crate) struct PostProcessor {
    /// The sentinel tag pair the strategy wrapped the completion in, if any.
    pub code_wrapping_tags: Option<(&'static str, &'static str)>,
    /// A continuation marker to scrub from the output before extraction.
    pub continuation_marker: Option<&'static str>,
}

impl PostProcessor {
    pub fn new(code_wrapping_tags: Option<(&'static str, &'static str)>) -> Self {
        Self {
            code_wrapping_tags,
            continuation_marker: None,
        }
    }

    pub fn post_process(&self, raw_suggestion: &str, infill_prefix: &str, suffix: &[String]) -> String {
        let mut suggestion = self.extract_suggestion(raw_suggestion);
        remove_prefix(&mut suggestion, infill_prefix);
        remove_suffix(&mut suggestion, suffix);
        format!("{infill_prefix}{suggestion}")
    }

    pub fn extract_suggestion(&self, response: &str) -> String {
        let response = match self.continuation_marker {
            Some(marker) => response.replace(marker, ""),
            None => response.to_string(),
        };

        let unfenced = strip_markdown_fence(&response);
        match self.code_wrapping_tags {
            Some((opening, closing)) => extract_enclosed(unfenced, opening, closing).to_string(),
            None => unfenced.to_string(),
        }
    }
}

/// Drop an echoed infill prefix.
fn remove_prefix(suggestion: &mut String, infill_prefix: &str) {
    if let Some(stripped) = suggestion.strip_prefix(infill_prefix) {
        *suggestion = stripped.to_string();
    }
}

/// Window-map the suggestion's trailing lines against the known suffix
/// lines; if the whole matched region reaches back to the suffix's start,
/// the model regenerated code that already exists after the cursor, so cut
/// the suggestion before the first matched line.
fn remove_suffix(suggestion: &mut String, suffix: &[String]) {
    let lines = text::break_lines_terminated(suggestion);
    let Some(last) = lines.last() else { return };
    let Some(match_index) = suffix.iter().position(|line| line == last) else {
        return;
    };

    let mut i = match_index as isize - 1;
    let mut j = lines.len() as isize - 2;
    while i >= 0 && j >= 0 && suffix[i as usize] == lines[j as usize] {
        i -= 1;
        j -= 1;
    }

    if i < 0 {
        let end = j.max(0) as usize;
        *suggestion = lines[..=end].concat();
    }
}

/// If the response opens with a fenced code block, possibly after blank
/// space or a short lead-in sentence ending in a colon, keep only the fenced
/// content. Anything else passes through untouched.
fn strip_markdown_fence(response: &str) -> &str {
    let Some(after_fence) = opening_fence(response) else {
        return response;
    };
    // The rest of the fence line carries the language hint.
    let Some(line_end) = after_fence.find('\n') else {
        return response;
    };

    let body = &after_fence[line_end + 1..];
    match body.find("```") {
        Some(closing) => &body[..closing],
        None => body,
    }
}

fn opening_fence(response: &str) -> Option<&str> {
    let trimmed = response.trim_start_matches([' ', '\n']);
    if let Some(rest) = trimmed.strip_prefix("```") {
        return Some(rest);
    }

    let colon = response.find(':')?;
    response[colon + 1..].strip_prefix("\n```")
}

/// Take the content between the tag pair, tolerating models that ignore the
/// tagging instruction: a second opening tag counts as an implicit close,
/// and with no opening tag at all the text up to the first tag occurrence
/// (or the whole text) is kept.
fn extract_enclosed<'a>(response: &'a str, opening_tag: &str, closing_tag: &str) -> &'a str {
    if opening_tag.is_empty() || closing_tag.is_empty() {
        return response;
    }

    if let Some(start) = response.find(opening_tag) {
        let content = &response[start + opening_tag.len()..];
        if let Some(end) = content.find(closing_tag) {
            return &content[..end];
        }
        if let Some(end) = content.find(opening_tag) {
            return &content[..end];
        }
        return content;
    }

    // No opening tag anywhere, so the first tag occurrence can only be a
    // stray closing tag.
    match response.find(closing_tag) {
        Some(index) => &response[..index],
        None => response,
    }
}
