use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The failure category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received (connect, DNS, timeout, cancellation, open circuit).
    Transport,
    /// A response arrived with a non-success status.
    Http,
    /// A success response whose body did not match the expected shape.
    Decode,
    /// The request could not be encoded locally.
    InvalidRequest,
    /// The client itself could not be built.
    Configuration,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("HTTP error ({status}): {detail}")]
    Http {
        status: u16,
        /// Canonical reason phrase of the status, if it has one.
        reason: Option<&'static str>,
        /// Response body as text, empty when unreadable.
        body: String,
        /// Body text when non-blank, otherwise the reason phrase.
        detail: String,
    },

    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Transport { .. } => FailureKind::Transport,
            ClientError::Http { .. } => FailureKind::Http,
            ClientError::Decode { .. } => FailureKind::Decode,
            ClientError::InvalidRequest { .. } => FailureKind::InvalidRequest,
            ClientError::Configuration(_) => FailureKind::Configuration,
        }
    }

    /// HTTP status code, for [`FailureKind::Http`] errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        ClientError::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn cancelled() -> Self {
        ClientError::Transport {
            message: "Request cancelled".to_string(),
            source: None,
        }
    }

    pub(crate) fn http(status: reqwest::StatusCode, body: String) -> Self {
        let reason = status.canonical_reason();
        let detail = if body.trim().is_empty() {
            reason.unwrap_or("Unknown error").to_string()
        } else {
            body.clone()
        };

        ClientError::Http {
            status: status.as_u16(),
            reason,
            body,
            detail,
        }
    }
}
