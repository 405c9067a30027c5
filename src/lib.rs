//! jobdeck
//!
//! Automates the session side of a careers-portal job-search workflow:
//! persisting browser session cookies per identity, re-injecting them into
//! fresh browser contexts, and falling back to an interactive credential
//! login when the saved session is absent or stale.

pub mod driver;
pub mod jobs;
pub mod session;

use std::path::PathBuf;
use tracing::{error, info, warn};

use session::SiteConfig;

/// Application configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Identity the session belongs to (e.g. an account e-mail)
    pub identity: String,

    /// Run the browser in headless mode
    #[serde(default)]
    pub headless: bool,

    /// Target portal configuration (URLs, selectors, timeouts)
    #[serde(default)]
    pub site: SiteConfig,

    /// Keywords for the downstream job search
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Locations for the downstream job search
    #[serde(default)]
    pub locations: Vec<String>,

    /// Companies to skip when applying
    #[serde(default)]
    pub blacklist_companies: Vec<String>,

    /// Job titles to skip when applying
    #[serde(default)]
    pub blacklist_titles: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identity: String::new(),
            headless: false,
            site: SiteConfig::default(),
            keywords: vec!["frontend".to_string(), "react".to_string(), "python".to_string()],
            locations: vec!["North America".to_string()],
            blacklist_companies: vec![],
            blacklist_titles: vec!["Intern".to_string(), "Junior".to_string()],
        }
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("jobdeck").join("logs"))
}

/// Get data directory path (session artifacts live here)
pub fn data_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("jobdeck").join("sessions"))
}

impl AppConfig {
    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("jobdeck").join("config.json"))
    }

    /// Load config from file
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => match serde_json::from_str(&content) {
                        Ok(config) => {
                            info!("Loaded config from {:?}", path);
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse config file: {}", e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config file: {}", e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    error!("Failed to create config directory: {}", e);
                    return;
                }
            }

            match serde_json::to_string_pretty(self) {
                Ok(content) => {
                    if let Err(e) = std::fs::write(&path, content) {
                        error!("Failed to save config: {}", e);
                    } else {
                        info!("Config saved to {:?}", path);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize config: {}", e);
                }
            }
        }
    }
}

/// Initialize logging: console layer plus a daily rolling file layer.
/// Returns the appender guard which must be held for the process lifetime.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "jobdeck.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.identity.is_empty());
        assert!(!config.headless);
        assert!(config.keywords.contains(&"python".to_string()));
        assert!(config.blacklist_titles.contains(&"Intern".to_string()));
    }

    #[test]
    fn test_app_config_round_trip() {
        let config = AppConfig {
            identity: "agent@example.com".to_string(),
            headless: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.identity, "agent@example.com");
        assert!(back.headless);
    }
}
