//! Streaming code-completion engine for editor integrations.
//!
//! A [`SuggestionService`] takes a document and a cursor position, renders a
//! backend-specific prompt, streams the model's output with client-side
//! early stopping, and returns cleaned-up [`CodeSuggestion`] candidates.
//! A newer request cancels the one before it.

mod error;
mod orchestrator;
mod postprocess;
mod prompt;
mod provider;
mod request;
mod service;
mod strategy;
mod stream;
mod text;
mod truncation;

pub use error::SuggestionError;
pub use request::{
    CodeLanguage, CodeSuggestion, CursorPosition, CursorRange, RelevantSnippet, SuggestionRequest,
};
pub use service::SuggestionService;

pub type Result<T> = std::result::Result<T, SuggestionError>;
