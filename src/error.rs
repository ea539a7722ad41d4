//! Error types for Muse.

use crate::gateway::ProviderId;
use thiserror::Error;

/// Library-level error type for Muse operations.
#[derive(Error, Debug)]
pub enum MuseError {
    /// The request itself is malformed. Fix the input and try again.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider cannot be used: missing credential or unreachable host.
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: ProviderId, reason: String },

    /// The provider answered with an error or did not answer in time.
    #[error("Provider {provider} failed: {message}")]
    ProviderError { provider: ProviderId, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification used by callers deciding between abort and fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    ProviderUnavailable,
    ProviderError,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidRequest => write!(f, "invalid_request"),
            ErrorKind::ProviderUnavailable => write!(f, "provider_unavailable"),
            ErrorKind::ProviderError => write!(f, "provider_error"),
            ErrorKind::Other => write!(f, "internal"),
        }
    }
}

impl MuseError {
    /// Shorthand for a provider failure.
    pub fn provider(provider: ProviderId, message: impl Into<String>) -> Self {
        MuseError::ProviderError {
            provider,
            message: message.into(),
        }
    }

    /// Shorthand for an unavailable provider.
    pub fn unavailable(provider: ProviderId, reason: impl Into<String>) -> Self {
        MuseError::ProviderUnavailable {
            provider,
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MuseError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            MuseError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            MuseError::ProviderError { .. } => ErrorKind::ProviderError,
            _ => ErrorKind::Other,
        }
    }

    /// Whether trying a different provider could help.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProviderUnavailable | ErrorKind::ProviderError
        )
    }

    /// Collapse any non-gateway error into a `ProviderError` for `provider`.
    pub(crate) fn into_gateway_error(self, provider: ProviderId) -> Self {
        match self.kind() {
            ErrorKind::Other => MuseError::provider(provider, self.to_string()),
            _ => self,
        }
    }

    /// A short hint on how to recover, for CLI and UI rendering.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::InvalidRequest => Some("Check the input and options, then try again."),
            ErrorKind::ProviderUnavailable => {
                Some("Set the provider's API key (see 'muse doctor') or select another provider.")
            }
            ErrorKind::ProviderError => {
                Some("The provider rejected or did not finish the request. Retry later or switch providers.")
            }
            ErrorKind::Other => None,
        }
    }
}

/// Result type alias for Muse operations.
pub type Result<T> = std::result::Result<T, MuseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            MuseError::InvalidRequest("x".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            MuseError::unavailable(ProviderId::OpenAi, "no key").kind(),
            ErrorKind::ProviderUnavailable
        );
        assert_eq!(
            MuseError::provider(ProviderId::DeepSeek, "500").kind(),
            ErrorKind::ProviderError
        );
        assert_eq!(MuseError::Config("bad".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(!MuseError::InvalidRequest("empty".into()).allows_fallback());
        assert!(MuseError::unavailable(ProviderId::Anthropic, "no key").allows_fallback());
        assert!(MuseError::provider(ProviderId::Anthropic, "429").allows_fallback());
    }

    #[test]
    fn test_into_gateway_error_keeps_gateway_kinds() {
        let err = MuseError::Output("ffmpeg exited 1".into()).into_gateway_error(ProviderId::Ffmpeg);
        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert!(err.to_string().contains("ffmpeg exited 1"));

        let err = MuseError::InvalidRequest("bad".into()).into_gateway_error(ProviderId::Ffmpeg);
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
