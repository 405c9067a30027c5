//! Session acquisition error types
//!
//! Only three failure kinds ever reach the caller: a rejected or
//! undriveable login, a bounded wait that expired, or a storage fault.
//! Absent artifacts and malformed cookies are absorbed into state
//! transitions and never surface here.

use thiserror::Error;

use super::StoreError;
use crate::driver::DriverError;

/// Terminal failures of a session acquisition
#[derive(Error, Debug)]
pub enum SessionError {
    /// The login form was driven but the credentials were rejected
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// A bounded element wait or the post-login probe expired
    #[error("Probe timed out: {0}")]
    ProbeTimeout(String),

    /// The artifact store could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The browser context failed underneath the state machine
    #[error("Driver error: {0}")]
    Driver(DriverError),
}

impl From<DriverError> for SessionError {
    fn from(err: DriverError) -> Self {
        // Bounded-wait expiries keep their timeout identity; everything
        // else is an infrastructure failure.
        if err.is_timeout() {
            SessionError::ProbeTimeout(err.to_string())
        } else {
            SessionError::Driver(err)
        }
    }
}
