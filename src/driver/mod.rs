//! Browser automation module
//!
//! Defines the narrow driver interface the session manager depends on and
//! the Chrome (CDP) implementation of it.

mod chrome;
mod errors;
mod traits;

pub use chrome::{ChromeDriver, ChromeDriverConfig};
pub use errors::DriverError;
pub use traits::BrowserDriver;
