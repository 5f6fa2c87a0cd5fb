mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use journal_core::{ChatCompletionClient, JournalError, Provider};

/// Construct the client for a provider with its default endpoint.
pub fn client_for(provider: Provider) -> Box<dyn ChatCompletionClient> {
    match provider {
        Provider::OpenAi => Box::new(OpenAiClient::new()),
        Provider::Anthropic => Box::new(AnthropicClient::new()),
    }
}

/// Map a non-success HTTP status onto the shared error taxonomy. Both
/// providers signal these conditions the same way at the status level.
pub(crate) fn error_for_status(status: reqwest::StatusCode) -> JournalError {
    match status.as_u16() {
        401 | 403 => JournalError::Auth(format!("provider rejected credentials ({})", status)),
        404 => JournalError::InvalidEndpoint(format!("endpoint not found ({})", status)),
        429 => JournalError::RateLimit("provider rate limit or quota exceeded".into()),
        code if status.is_server_error() => JournalError::Server(code),
        _ => JournalError::Request(format!("unexpected status {}", status)),
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> JournalError {
    if e.is_builder() || e.is_connect() {
        JournalError::InvalidEndpoint(e.to_string())
    } else {
        JournalError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED),
            JournalError::Auth(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::FORBIDDEN),
            JournalError::Auth(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND),
            JournalError::InvalidEndpoint(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS),
            JournalError::RateLimit(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR),
            JournalError::Server(500)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY),
            JournalError::Server(502)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST),
            JournalError::Request(_)
        ));
    }
}
