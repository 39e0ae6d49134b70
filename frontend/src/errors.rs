use thiserror::Error;

/// Fallback shown when the server fails without an explanatory body.
pub const SERVER_FALLBACK_MESSAGE: &str = "Something went wrong on the server.";

/// Every way a query round-trip can fail. The client recovers all of them the
/// same way, so the variants only exist for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Non-2xx status. `message` is the response body, or the fallback.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Image response ended before the tag was closed")]
    MalformedImage,
}

impl ClientError {
    /// Builds the error for a failed status from whatever body came back.
    pub fn http(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            SERVER_FALLBACK_MESSAGE.to_string()
        } else {
            body.to_string()
        };
        ClientError::Http { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The text shown in the error banner.
    pub fn banner_text(&self) -> String {
        format!("Sorry, I couldn't process that. Error: {self}. Please try again.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_carries_body() {
        let err = ClientError::http(500, "server exploded");
        assert_eq!(err.to_string(), "server exploded");
        assert_eq!(
            err.banner_text(),
            "Sorry, I couldn't process that. Error: server exploded. Please try again."
        );
    }

    #[test]
    fn empty_http_body_uses_fallback() {
        let err = ClientError::http(502, "  ");
        assert_eq!(err.to_string(), SERVER_FALLBACK_MESSAGE);
    }
}
