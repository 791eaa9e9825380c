use serde::Deserialize;
use thiserror::Error;

/// Errors produced by the suggestion pipeline.
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// The cursor position is not worth completing. Not a failure.
    #[error("completion skipped at this cursor position")]
    Skipped,

    /// The request was superseded by a newer one, or cancelled explicitly.
    #[error("request cancelled")]
    Cancelled,

    /// Network or connection error before a response arrived.
    #[error("connection error: {0}")]
    Connection(String),

    /// Non-2xx HTTP response with no recognizable error envelope.
    #[error("backend returned HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    /// Structured error decoded from the backend's error envelope.
    #[error("backend error: {0}")]
    Api(String),

    /// A streamed chunk failed to parse. Fatal for that generation only.
    #[error("failed to decode stream chunk: {0}")]
    Decode(String),

    /// The configured model's backend format is unrecognized.
    #[error("unknown model format: {0}")]
    UnknownFormat(String),
}

/// Error envelopes the backends wrap their messages in. Both the OpenAI
/// `{"error": {"message": …}}` shape and the bare `{"message": …}` shape
/// are accepted.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetails>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetails {
    message: String,
}

impl SuggestionError {
    /// Map a non-2xx response body to an error, preferring the structured
    /// envelope message when one decodes.
    pub(crate) fn from_response(status: u16, body: String) -> Self {
        if let Ok(envelope) = sonic_rs::from_str::<ErrorEnvelope>(&body) {
            if let Some(details) = envelope.error {
                return SuggestionError::Api(details.message);
            }
            if let Some(message) = envelope.message {
                return SuggestionError::Api(message);
            }
        }

        SuggestionError::Transport { status, message: body }
    }
}
