//! Error types for mailscope

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed endpoint: {0}")]
    MalformedEndpoint(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
