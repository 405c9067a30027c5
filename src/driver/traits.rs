//! Browser driver abstraction
//!
//! The session manager only needs this narrow capability set; keeping it
//! behind a trait lets tests script a fake browser and keeps the CDP
//! implementation swappable.

use std::time::Duration;

use async_trait::async_trait;

use crate::session::CookieRecord;

use super::DriverError;

/// Narrow interface over a live browser automation context.
///
/// All element waits take an explicit timeout and must fail with
/// [`DriverError::Timeout`] instead of blocking indefinitely.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the active page to a URL
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Reload the active page
    async fn refresh(&self) -> Result<(), DriverError>;

    /// Capture all cookies from the live context
    async fn get_cookies(&self) -> Result<Vec<CookieRecord>, DriverError>;

    /// Attach a single cookie to the live context
    async fn set_cookie(&self, cookie: &CookieRecord) -> Result<(), DriverError>;

    /// Wait until an element matching the selector is present.
    /// Fails with [`DriverError::Timeout`] once `timeout` elapses.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Clear the value of an input field
    async fn clear_field(&self, selector: &str) -> Result<(), DriverError>;

    /// Type text into an input field
    async fn type_into(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Click an element
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Close the browser context. Must be safe to call more than once.
    async fn close(&self) -> Result<(), DriverError>;
}
