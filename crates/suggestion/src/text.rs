//! Line-oriented text utilities shared across the pipeline.
//!
//! All splitting preserves line terminators so that concatenating the pieces
//! reconstructs the original text exactly.

use crate::CursorPosition;

/// The line terminator of a text, taken from its last line. Texts that do
/// not end in a terminator are assumed to use `\n`.
pub(crate) fn line_ending(text: &str) -> &'static str {
    if text.ends_with("\r\n") {
        "\r\n"
    } else if text.ends_with('\n') {
        "\n"
    } else if text.ends_with('\r') {
        "\r"
    } else {
        "\n"
    }
}

/// Break a text into lines, keeping the terminator on every line but the
/// last. A text ending in a terminator yields a trailing empty line; an
/// empty text yields no lines.
pub(crate) fn break_lines(text: &str) -> Vec<String> {
    break_lines_inner(text, false)
}

/// Like [`break_lines`], but the last line also gets a terminator. Used by
/// the suffix de-duplication walk, which compares against suffix lines that
/// all carry terminators.
pub(crate) fn break_lines_terminated(text: &str) -> Vec<String> {
    break_lines_inner(text, true)
}

fn break_lines_inner(text: &str, terminate_last: bool) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let ending = line_ending(text);
    let parts: Vec<&str> = text.split(ending).collect();
    let last = parts.len() - 1;

    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            if i == last && !terminate_last {
                part.to_string()
            } else {
                format!("{part}{ending}")
            }
        })
        .collect()
}

/// Split broken lines into the part before and the part after the cursor.
///
/// Total over all inputs: out-of-range lines clamp to whole-prefix or
/// whole-suffix, a negative character puts the cursor's line entirely in the
/// suffix, a character past the end of the line puts it entirely in the
/// prefix. Character offsets count `char`s.
pub(crate) fn split_at_cursor(
    content: &str,
    lines: &[String],
    cursor: CursorPosition,
) -> (Vec<String>, Vec<String>) {
    if content.is_empty() || lines.is_empty() {
        return (Vec::new(), Vec::new());
    }
    if cursor.line < 0 {
        return (Vec::new(), lines.to_vec());
    }
    let line = cursor.line as usize;
    if line >= lines.len() {
        return (lines.to_vec(), Vec::new());
    }

    let mut prefix = lines[..line].to_vec();
    let rest = lines.get(line + 1..).unwrap_or_default();
    let split_line = &lines[line];

    if cursor.character < 0 {
        let mut suffix = vec![split_line.clone()];
        suffix.extend_from_slice(rest);
        return (prefix, suffix);
    }

    let character = cursor.character as usize;
    if character >= split_line.chars().count() {
        prefix.push(split_line.clone());
        return (prefix, rest.to_vec());
    }

    let byte_offset = split_line
        .char_indices()
        .nth(character)
        .map(|(offset, _)| offset)
        .unwrap_or(split_line.len());

    prefix.push(split_line[..byte_offset].to_string());
    let mut suffix = vec![split_line[byte_offset..].to_string()];
    suffix.extend_from_slice(rest);

    (prefix, suffix)
}

/// Keep the first `count` lines of a text. Non-positive counts disable the
/// clipping.
pub(crate) fn keep_lines(text: &str, count: i64) -> String {
    if count <= 0 {
        return text.to_string();
    }

    break_lines(text).into_iter().take(count as usize).collect()
}

/// Drop trailing whitespace and newlines.
pub(crate) fn trim_trailing_whitespace(text: &str) -> &str {
    text.trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: i32, character: i32) -> CursorPosition {
        CursorPosition { line, character }
    }

    #[test]
    fn break_lines_keeps_terminators() {
        assert_eq!(break_lines("a\nb\nc"), vec!["a\n", "b\n", "c"]);
    }

    #[test]
    fn break_lines_yields_trailing_empty_line_for_terminated_text() {
        assert_eq!(break_lines("a\nb\n"), vec!["a\n", "b\n", ""]);
        assert_eq!(break_lines("hello world\n\n\n\n"), vec![
            "hello world\n",
            "\n",
            "\n",
            "\n",
            ""
        ]);
    }

    #[test]
    fn break_lines_of_empty_text_is_empty() {
        assert!(break_lines("").is_empty());
    }

    #[test]
    fn break_lines_detects_carriage_return_line_feed() {
        assert_eq!(break_lines("a\r\nb\r\n"), vec!["a\r\n", "b\r\n", ""]);
    }

    #[test]
    fn terminated_variant_appends_to_the_last_line() {
        assert_eq!(break_lines_terminated("suggestion\na\nb"), vec![
            "suggestion\n",
            "a\n",
            "b\n"
        ]);
    }

    #[test]
    fn split_empty_text() {
        let (prefix, suffix) = split_at_cursor("", &[], pos(0, 0));
        assert!(prefix.is_empty());
        assert!(suffix.is_empty());
    }

    #[test]
    fn split_cursor_line_beyond_end_of_file() {
        let content = "a\nb\nc\nd\ne\nf\ng\n";
        let lines = break_lines(content);
        assert_eq!(lines.len(), 8);

        let (prefix, suffix) = split_at_cursor(content, &lines, pos(100, 0));
        assert_eq!(prefix, lines);
        assert!(suffix.is_empty());
    }

    #[test]
    fn split_negative_line_puts_everything_in_the_suffix() {
        let content = "a\nb\n";
        let lines = break_lines(content);

        let (prefix, suffix) = split_at_cursor(content, &lines, pos(-1, 0));
        assert!(prefix.is_empty());
        assert_eq!(suffix, lines);
    }

    #[test]
    fn split_inside_a_line() {
        let content = "func middle(array: [Int]) -> Int {\n    // find the middle\n    let middle = array.count / 2\n    return array[middle]\n}\n";
        let lines = break_lines(content);

        let (prefix, suffix) = split_at_cursor(content, &lines, pos(2, 14));
        assert_eq!(prefix.last().map(String::as_str), Some("    let middle"));
        assert_eq!(suffix.first().map(String::as_str), Some(" = array.count / 2\n"));
    }

    #[test]
    fn split_negative_character_keeps_the_line_in_the_suffix() {
        let content = "a\nbb\nc\n";
        let lines = break_lines(content);

        let (prefix, suffix) = split_at_cursor(content, &lines, pos(1, -1));
        assert_eq!(prefix, vec!["a\n"]);
        assert_eq!(suffix, vec!["bb\n", "c\n", ""]);
    }

    #[test]
    fn split_character_past_line_end_keeps_the_line_in_the_prefix() {
        let content = "a\nbb\nc\n";
        let lines = break_lines(content);

        let (prefix, suffix) = split_at_cursor(content, &lines, pos(1, 50));
        assert_eq!(prefix, vec!["a\n", "bb\n"]);
        assert_eq!(suffix, vec!["c\n", ""]);
    }

    #[test]
    fn split_round_trips_to_the_original_text() {
        let content = "let a = 1\nlet b = 2\nlet c = 3";
        let lines = break_lines(content);

        for line in -1..5 {
            for character in -1..12 {
                let (prefix, suffix) = split_at_cursor(content, &lines, pos(line, character));
                let rejoined: String = prefix.into_iter().chain(suffix).collect();
                assert_eq!(rejoined, content, "cursor at ({line}, {character})");
            }
        }
    }

    #[test]
    fn keep_lines_clips_and_zero_disables() {
        assert_eq!(keep_lines("a\nb\nc\n", 2), "a\nb\n");
        assert_eq!(keep_lines("a\nb\nc\n", 0), "a\nb\nc\n");
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        assert_eq!(trim_trailing_whitespace("code()\n  \n\n"), "code()");
    }
}
