//! Data-fetch error taxonomy.
//!
//! Every failure from the backend or the fallback air-pollution endpoint is
//! reduced to one of four user-facing categories. Classification looks at,
//! in order:
//!
//! 1. The backend's `error_kind` field, when the response carried one
//! 2. The transport failure type (connect / timeout are network errors)
//! 3. Known substrings of the error message
//!
//! Anything else is [`DataFetchError::Unclassified`] with the raw message.

use thiserror::Error;

use super::http::HttpError;

/// Result type for backend fetches.
pub type FetchResult<T> = Result<T, DataFetchError>;

/// Classified data-fetch failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataFetchError {
    /// Credentials missing, invalid, or dataset terms not accepted.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Download quota exceeded.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Connection or timeout problem.
    #[error("network error: {0}")]
    Network(String),

    /// Any other failure, including malformed payloads.
    #[error("{0}")]
    Unclassified(String),
}

impl DataFetchError {
    /// Classify a failure message, optionally tagged by the backend.
    pub fn classify(message: impl Into<String>, error_kind: Option<&str>) -> Self {
        let message = message.into();

        if let Some(kind) = error_kind {
            match kind {
                "credentials_missing" | "auth_error" | "terms_error" => {
                    return DataFetchError::Auth(message)
                }
                "quota_error" => return DataFetchError::QuotaExceeded(message),
                "connection" | "timeout" => return DataFetchError::Network(message),
                _ => {}
            }
        }

        let lower = message.to_lowercase();
        if lower.contains("api key") {
            DataFetchError::Auth(message)
        } else if lower.contains("quota") {
            DataFetchError::QuotaExceeded(message)
        } else if lower.contains("network") || lower.contains("connection") {
            DataFetchError::Network(message)
        } else {
            DataFetchError::Unclassified(message)
        }
    }

    /// A payload that could not be decoded into the expected shape.
    pub fn malformed(endpoint: &str, detail: impl std::fmt::Display) -> Self {
        DataFetchError::Unclassified(format!("malformed response from {}: {}", endpoint, detail))
    }

    /// The raw message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            DataFetchError::Auth(m)
            | DataFetchError::QuotaExceeded(m)
            | DataFetchError::Network(m)
            | DataFetchError::Unclassified(m) => m,
        }
    }

    /// Alert text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            DataFetchError::Auth(_) => "Error de autenticación con la API de Copernicus".to_string(),
            DataFetchError::QuotaExceeded(_) => "Cuota de descarga excedida".to_string(),
            DataFetchError::Network(_) => "Error de conexión a internet".to_string(),
            DataFetchError::Unclassified(m) => format!("Error: {}", m),
        }
    }

    /// Short machine-readable category name.
    pub fn kind(&self) -> &'static str {
        match self {
            DataFetchError::Auth(_) => "auth",
            DataFetchError::QuotaExceeded(_) => "quota",
            DataFetchError::Network(_) => "network",
            DataFetchError::Unclassified(_) => "unclassified",
        }
    }
}

impl From<HttpError> for DataFetchError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Connect(_) | HttpError::Timeout(_) => DataFetchError::Network(e.to_string()),
            HttpError::InvalidUrl(_) | HttpError::Other(_) => {
                DataFetchError::classify(e.to_string(), None)
            }
        }
    }
}
