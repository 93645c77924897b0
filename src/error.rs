use thiserror::Error;

/// Errors raised while loading credentials, signing save links or assembling batches.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The service-account credential could not be read or is incomplete.
    #[error("credential error: {0}")]
    Credential(String),

    /// The signing key could not be parsed or the signature could not be produced/verified.
    #[error("signing error: {0}")]
    Signing(String),

    /// A payload could not be encoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The input violates a structural constraint (empty payload, boundary collision, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// The HTTP transport failed before a response was received.
    #[error("http error: {0}")]
    Http(String),

    /// The object store answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Api { status: u16, body: String },
}

pub type Result<T, E = WalletError> = std::result::Result<T, E>;

impl WalletError {
    pub(crate) fn credential(msg: impl Into<String>) -> Self {
        WalletError::Credential(msg.into())
    }

    pub(crate) fn signing(msg: impl Into<String>) -> Self {
        WalletError::Signing(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        WalletError::Validation(msg.into())
    }
}
