//! jobdeck - session acquisition entry point
//!
//! Loads the saved configuration, launches a browser context, and
//! acquires an authenticated portal session for the configured identity,
//! reusing saved cookies when possible.
//!
//! Environment variables:
//! - `JOBDECK_USERNAME` - login username (falls back to the configured identity)
//! - `JOBDECK_PASSWORD` - login password (required when a fresh login is needed)

use anyhow::Context;
use tracing::{info, warn};

use jobdeck::driver::{ChromeDriver, ChromeDriverConfig};
use jobdeck::session::{Credentials, FsArtifactStore, SessionManager};
use jobdeck::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = jobdeck::init_logging();

    info!("Starting jobdeck");
    if let Some(dir) = jobdeck::log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let config = AppConfig::load();
    if config.identity.is_empty() {
        anyhow::bail!("No identity configured; set `identity` in the config file");
    }

    let username =
        std::env::var("JOBDECK_USERNAME").unwrap_or_else(|_| config.identity.clone());
    let password = std::env::var("JOBDECK_PASSWORD").unwrap_or_default();
    if password.is_empty() {
        warn!("JOBDECK_PASSWORD not set; acquisition will fail if a fresh login is needed");
    }
    let credentials = Credentials { username, password };

    let sessions_dir = jobdeck::data_dir()
        .context("Could not determine a session storage directory")?;
    let manager = SessionManager::new(FsArtifactStore::new(sessions_dir));

    // One browser context per acquisition; closed on every exit path
    let context_id = uuid::Uuid::new_v4().to_string();
    let driver_config = ChromeDriverConfig::for_context(&context_id).headless(config.headless);
    let driver = ChromeDriver::launch(driver_config)
        .await
        .context("Failed to launch browser")?;

    match manager
        .acquire_session(driver, &config.identity, &credentials, &config.site)
        .await
    {
        Ok(session) => {
            info!(
                "Authenticated session ready for {} (login performed: {})",
                session.identity(),
                session.login_performed()
            );
            // Downstream collaborators (scraper, submitter) would take the
            // session from here; this entry point just proves the flow
            session.close().await.ok();
            Ok(())
        }
        Err(e) => {
            // The browser context is already closed by the manager
            Err(e).context("Session acquisition failed")
        }
    }
}
