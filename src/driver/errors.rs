//! Browser driver error types

use thiserror::Error;

/// Errors produced while driving a browser context
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Script failed: {0}")]
    ScriptFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DriverError {
    /// Whether this error is a bounded-wait expiry rather than a hard failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout(_))
    }
}
