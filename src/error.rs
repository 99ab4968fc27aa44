use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub const RETRY_SUGGESTION: &str = "Please try again or rephrase your question.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("API key is not configured. Set OCR_CHAT_API_KEY and restart.")]
    MissingCredential,
    #[error("Network error: please check your connection.")]
    Network(String),
    #[error("Authentication error: the API key may be invalid.")]
    Unauthorized,
    #[error("Rate limit exceeded: please wait a moment and try again.")]
    RateLimited,
    #[error("The model is currently unavailable: please try again later.")]
    NotFound,
    #[error("Error: {message}")]
    Http { status: u16, message: String },
    #[error("Invalid response received from the assistant service.")]
    InvalidResponse,
    #[error("The assistant returned an empty response.")]
    EmptyResponse,
}

impl ChatError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::NOT_FOUND => Self::NotFound,
            _ => Self::Http {
                status: status.as_u16(),
                message: server_message(status, body),
            },
        }
    }

    /// Text appended to the transcript when a submission fails.
    pub fn transcript_text(&self) -> String {
        format!("{self} {RETRY_SUGGESTION}")
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// Prefers `{"error":{"message":...}}`, then the raw body, then the status line.
fn server_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.error.message.trim().is_empty() {
            return envelope.error.message;
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_statuses() {
        assert_eq!(
            ChatError::from_status(StatusCode::UNAUTHORIZED, ""),
            ChatError::Unauthorized
        );
        assert_eq!(
            ChatError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ChatError::RateLimited
        );
        assert_eq!(
            ChatError::from_status(StatusCode::NOT_FOUND, ""),
            ChatError::NotFound
        );
    }

    #[test]
    fn other_status_prefers_server_error_message() {
        let err = ChatError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":{"message":"model overloaded","type":"server_error"}}"#,
        );

        assert_eq!(err.to_string(), "Error: model overloaded");
    }

    #[test]
    fn other_status_falls_back_to_raw_body_then_status() {
        let raw = ChatError::from_status(StatusCode::BAD_GATEWAY, "  upstream down ");
        assert_eq!(raw.to_string(), "Error: upstream down");

        let empty = ChatError::from_status(StatusCode::BAD_REQUEST, "");
        assert_eq!(empty.to_string(), "Error: HTTP 400 Bad Request");
    }

    #[test]
    fn transcript_text_adds_retry_suggestion() {
        let text = ChatError::RateLimited.transcript_text();

        assert!(text.starts_with("Rate limit exceeded"));
        assert!(text.ends_with(RETRY_SUGGESTION));
    }
}
