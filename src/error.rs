//! Error types for the accounting engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure errors: store I/O, codec, configuration
///
/// These never reach clients as transaction outcomes; the HTTP layer maps
/// them to its generic internal-error response.
#[derive(Error, Debug)]
pub enum Error {
    /// Transaction store error
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Startup bootstrap error
    #[error("bootstrap error: {0}")]
    Bootstrap(String),

    /// Metrics registry error
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a transaction can be rejected
///
/// Errors are values, never control flow across component boundaries. All
/// authorization failures collapse into [`TransactionError::Unauthorized`]
/// so that callers cannot probe which accounts or tokens exist.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Case", content = "Fields")]
pub enum TransactionError {
    /// Authentication or authorization failed
    #[error("transaction is not authorized")]
    Unauthorized,

    /// The source balance cannot cover the transfer
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The named counterparty account does not exist
    #[error("destination account does not exist")]
    DestinationDoesNotExist,

    /// A non-positive (or overflowing) currency amount
    #[error("invalid amount")]
    InvalidAmount,

    /// `OpenAccount` targeting an existing name
    #[error("account already exists")]
    AccountAlreadyExists,

    /// `CreateToken` reusing a token id on the same account
    #[error("token already exists")]
    TokenAlreadyExists,

    /// Internal sentinel: the action belongs to an outer processor.
    /// Never surfaced at the service boundary.
    #[error("action not implemented by this processor")]
    ActionNotImplemented,

    /// Transport-level failure observed by a client
    #[error("network error (status {code}): {body}")]
    Network {
        /// HTTP status code, or 0 when the request never completed
        code: u16,
        /// Response body or transport error text
        body: String,
    },
}
