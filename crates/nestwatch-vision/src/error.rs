/// Errors that can occur during vision analysis.
///
/// `ProviderUnavailable` is the only variant the queue treats as
/// retryable; it is produced by a single provider failing or by the
/// whole fallback chain being exhausted.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// The provider could not be reached or returned a transport-level
    /// failure. Retried per the queue's policy.
    #[error("Vision: provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// Every provider in the fallback chain failed.
    #[error("Vision: all {attempted} providers in the chain failed (last: {last_error})")]
    ChainExhausted { attempted: usize, last_error: String },

    /// The provider answered, but the response could not be mapped onto
    /// the triage/analysis contract.
    #[error("Vision: unparseable response from '{provider}': {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl VisionError {
    pub fn unavailable(provider: &str, reason: impl std::fmt::Display) -> Self {
        Self::ProviderUnavailable {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience `Result` alias for vision operations.
pub type Result<T> = std::result::Result<T, VisionError>;
