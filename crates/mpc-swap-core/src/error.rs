//! Error types for trade handshake operations

use thiserror::Error;

/// Result type alias for trade handshake operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a trade session
#[derive(Debug, Error)]
pub enum Error {
    // ============ Configuration Errors ============
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ============ Protocol Errors ============
    /// Inbound message does not match the step the coordinator expects
    #[error("Protocol order violation: expected {expected}, received {received}")]
    ProtocolOrderViolation { expected: String, received: String },

    /// Message in its expected position carries an unusable payload
    #[error("Malformed {step} message: {reason}")]
    MalformedMessage { step: String, reason: String },

    /// Engine context driven out of order or after export
    #[error("Engine misuse: {0}")]
    EngineMisuse(String),

    // ============ Offer Errors ============
    /// Offer hash not present in the registry
    #[error("Offer not found: {0}")]
    OfferNotFound(String),

    /// Offer hash payload is malformed
    #[error("Invalid offer hash: {0}")]
    InvalidOfferHash(String),

    // ============ Cryptographic Errors ============
    /// Message verification failed
    #[error("Message verification failed: {0}")]
    VerificationFailed(String),

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Invalid signature
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Threshold engine could not finalize a valid signature
    #[error("Signature export failed: {0}")]
    SignatureExport(String),

    /// Transaction already carries a signature
    #[error("Transaction already signed")]
    AlreadySigned,

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ============ Transport Errors ============
    /// Peer closed the stream before the expected message arrived
    #[error("Stream closed while waiting for {0}")]
    StreamClosed(String),

    /// Inbound frame exceeds the configured limit
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// Malformed length prefix or truncated frame
    #[error("Framing error: {0}")]
    Framing(String),

    /// Outbound queue is closed
    #[error("Message channel closed")]
    ChannelClosed,

    /// Timeout waiting for message
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    // ============ Chain Errors ============
    /// Chain operation failed
    #[error("Chain error: {0}")]
    ChainError(String),

    /// JSON-RPC transport failure
    #[error("RPC error: {0}")]
    Rpc(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], used for abort logging and by callers
/// that route failures to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Inbound message out of the expected sequence
    ProtocolOrderViolation,
    /// Responder cannot find the referenced offer
    OfferResolutionFailure,
    /// Approval, funding, gas, balance, nonce or broadcast failure
    ChainInteractionFailure,
    /// Threshold engine failed to finalize the signature
    SignatureExportFailure,
    /// Stream, framing or timeout failure
    Transport,
    /// Key material or engine failure
    Crypto,
    /// Invalid configuration
    Configuration,
    /// Anything else
    Internal,
}

impl Error {
    /// Build an order violation from anything displayable
    pub fn order_violation(expected: impl ToString, received: impl ToString) -> Self {
        Error::ProtocolOrderViolation {
            expected: expected.to_string(),
            received: received.to_string(),
        }
    }

    /// Build a malformed-payload error for a handshake step
    pub fn malformed(step: impl ToString, reason: impl ToString) -> Self {
        Error::MalformedMessage {
            step: step.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ProtocolOrderViolation { .. }
            | Error::MalformedMessage { .. }
            | Error::EngineMisuse(_) => ErrorKind::ProtocolOrderViolation,
            Error::OfferNotFound(_) | Error::InvalidOfferHash(_) => {
                ErrorKind::OfferResolutionFailure
            }
            Error::ChainError(_) | Error::Rpc(_) => ErrorKind::ChainInteractionFailure,
            Error::SignatureExport(_) => ErrorKind::SignatureExportFailure,
            Error::StreamClosed(_)
            | Error::FrameTooLarge { .. }
            | Error::Framing(_)
            | Error::ChannelClosed
            | Error::Timeout(_)
            | Error::Io(_) => ErrorKind::Transport,
            Error::VerificationFailed(_) | Error::Crypto(_) | Error::InvalidSignature(_) => {
                ErrorKind::Crypto
            }
            Error::InvalidConfig(_) => ErrorKind::Configuration,
            Error::AlreadySigned
            | Error::Serialization(_)
            | Error::Deserialization(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for errors that must abort a running session
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Configuration)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Deserialization(e.to_string())
    }
}
