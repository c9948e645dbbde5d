//! Error type shared by the API client, the store and the command handlers.

use thiserror::Error;

/// Fallback text when neither the backend nor the transport says anything useful.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response.
    #[error("{0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// Local input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// A success response whose body did not match the expected envelope.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    /// Display-ready message for status bars and stderr.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Reject blank required fields before anything goes over the wire.
pub fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{what} is required")));
    }
    Ok(())
}
