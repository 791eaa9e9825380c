//! Inbound request and outbound suggestion types.

use uuid::Uuid;

/// A zero-based (line, character) position in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: i32,
    pub character: i32,
}

/// A half-open range between two cursor positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorRange {
    pub start: CursorPosition,
    pub end: CursorPosition,
}

/// An auxiliary piece of codebase context supplied by the editor. Snippets
/// are ordered by priority, highest first; the truncation engine drops them
/// from the back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantSnippet {
    pub content: String,
    pub priority: i32,
}

/// Language identifier forwarded to backends that accept one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLanguage(pub String);

impl CodeLanguage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A completion request from the editor.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    /// Full text of the document.
    pub content: String,
    /// Absolute path of the document.
    pub file_path: String,
    /// Workspace-relative path, preferred over `file_path` in prompts.
    pub relative_path: Option<String>,
    /// Where the completion is requested.
    pub cursor: CursorPosition,
    /// Indentation width of the document.
    pub indent_size: u32,
    /// Whether the document indents with tabs.
    pub uses_tabs_for_indentation: bool,
    /// Context snippets from elsewhere in the codebase.
    pub relevant_snippets: Vec<RelevantSnippet>,
    /// Language of the document, if known.
    pub language: Option<CodeLanguage>,
}

impl SuggestionRequest {
    /// The path shown to the model.
    pub(crate) fn display_path(&self) -> &str {
        self.relative_path.as_deref().unwrap_or(&self.file_path)
    }
}

/// An accepted completion candidate, anchored at the requesting cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSuggestion {
    pub id: String,
    pub text: String,
    pub position: CursorPosition,
    pub range: CursorRange,
}

/// Per-request context carried through the pipeline for log attribution.
pub(crate) struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}
