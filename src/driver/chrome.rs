//! Chrome browser driver
//!
//! Launches and controls a single Chrome/Chromium instance over the
//! DevTools protocol. One driver owns exactly one browser context; the
//! session manager acquires it at the start of an acquisition and it is
//! closed on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, GetCookiesParams, SetCookiesParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::ReloadParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::session::{CookieRecord, SameSite};

use super::{BrowserDriver, DriverError};

/// How often to re-poll the DOM while waiting for an element
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find Chrome/Chromium executable on the system
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![std::path::PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Configuration for a Chrome driver instance
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeDriverConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<String>,
    /// Run in headless mode
    pub headless: bool,
    /// User data directory
    pub user_data_dir: Option<String>,
    /// Navigation timeout in seconds
    pub nav_timeout_secs: u64,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for ChromeDriverConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            user_data_dir: None,
            nav_timeout_secs: 60,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl ChromeDriverConfig {
    /// Create config with a dedicated user data directory for this context
    pub fn for_context(context_id: &str) -> Self {
        let base = std::env::temp_dir().join("jobdeck").join("browser_data");
        let user_data_dir = base.join(context_id).to_string_lossy().to_string();

        Self {
            user_data_dir: Some(user_data_dir),
            ..Default::default()
        }
    }

    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set Chrome path
    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.chrome_path = path;
        self
    }

    /// Set navigation timeout
    pub fn nav_timeout(mut self, secs: u64) -> Self {
        self.nav_timeout_secs = secs;
        self
    }
}

/// A Chrome browser context driven over CDP
pub struct ChromeDriver {
    /// Unique driver ID (for logs)
    pub id: String,
    /// The browser instance
    browser: Arc<RwLock<Option<Browser>>>,
    /// Current active page
    page: Arc<RwLock<Option<Page>>>,
    /// Driver configuration
    config: ChromeDriverConfig,
    /// Whether the context is alive
    alive: Arc<AtomicBool>,
}

impl ChromeDriver {
    /// Launch a new Chrome context with the given config
    pub async fn launch(config: ChromeDriverConfig) -> Result<Self, DriverError> {
        let driver_id = format!("ctx-{}", &uuid::Uuid::new_v4().to_string()[..8]);

        info!(
            "Launching browser context {} (headless: {})",
            driver_id, config.headless
        );

        // Check if Chrome is available before attempting launch
        if config.chrome_path.is_none() && find_chrome().is_none() {
            return Err(DriverError::LaunchFailed(
                "Chrome/Chromium not found on this system".to_string(),
            ));
        }

        let mut builder = BrowserConfig::builder();

        if config.headless {
            // Modern Chrome requires --headless=new for proper headless
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        } else if let Some(chrome_path) = find_chrome() {
            info!("Auto-detected Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        if let Some(ref dir) = config.user_data_dir {
            let _ = std::fs::create_dir_all(dir);
            builder = builder.user_data_dir(dir);
        }

        builder = builder
            .arg("--disable-gpu")
            .arg("--no-default-browser-check")
            .arg("--disable-notifications")
            .arg("--disable-session-crashed-bubble")
            // Required when running as root (e.g. in Docker or on a VPS)
            .arg("--no-sandbox")
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_secs(config.nav_timeout_secs));

        let browser_config = builder
            .build()
            .map_err(DriverError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        // Spawn handler in background; when it ends Chrome has disconnected
        let driver_id_clone = driver_id.clone();
        let alive_flag = Arc::new(AtomicBool::new(true));
        let alive_for_handler = alive_flag.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Context {} browser event: {:?}", driver_id_clone, event);
            }
            warn!(
                "Context {} Chrome disconnected (event handler ended)",
                driver_id_clone
            );
            alive_for_handler.store(false, Ordering::Relaxed);
        });

        // Chrome opens with a blank tab; take it as our main page and close extras
        let page = {
            let mut pages = browser
                .pages()
                .await
                .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

            let main_page = if !pages.is_empty() {
                pages.remove(0)
            } else {
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| DriverError::LaunchFailed(e.to_string()))?
            };

            for extra_page in pages {
                debug!("Closing extra blank tab");
                let _ = extra_page.close().await;
            }

            main_page
        };

        info!("Browser context {} created", driver_id);

        Ok(Self {
            id: driver_id,
            browser: Arc::new(RwLock::new(Some(browser))),
            page: Arc::new(RwLock::new(Some(page))),
            config,
            alive: alive_flag,
        })
    }

    /// Check if the context is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Run an operation against the active page
    async fn with_page<T, F, Fut>(&self, f: F) -> Result<T, DriverError>
    where
        F: FnOnce(Page) -> Fut,
        Fut: std::future::Future<Output = Result<T, DriverError>>,
    {
        let page = {
            let guard = self.page.read().await;
            guard
                .as_ref()
                .cloned()
                .ok_or(DriverError::ConnectionLost("No active page".into()))?
        };
        f(page).await
    }

    /// Convert a cookie record into the CDP parameter shape
    fn to_cookie_param(cookie: &CookieRecord) -> Result<CookieParam, DriverError> {
        let mut builder = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value.clone())
            .domain(cookie.domain.clone())
            .path(cookie.path.clone())
            .secure(cookie.secure)
            .http_only(cookie.http_only);

        if let Some(expiry) = cookie.expiry {
            builder = builder.expires(TimeSinceEpoch::new(expiry as f64));
        }
        if let Some(same_site) = cookie.same_site {
            builder = builder.same_site(match same_site {
                SameSite::Strict => CookieSameSite::Strict,
                SameSite::Lax => CookieSameSite::Lax,
                SameSite::None => CookieSameSite::None,
            });
        }

        builder
            .build()
            .map_err(|e| DriverError::ScriptFailed(format!("Cookie build error: {}", e)))
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let timeout = Duration::from_secs(self.config.nav_timeout_secs);
        debug!("Context {} navigating to: {}", self.id, url);

        self.with_page(|page| async move {
            tokio::time::timeout(timeout, page.goto(url))
                .await
                .map_err(|_| DriverError::Timeout(format!("Navigation to {} timed out", url)))?
                .map_err(|e| DriverError::NavigationFailed(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn refresh(&self) -> Result<(), DriverError> {
        let timeout = Duration::from_secs(self.config.nav_timeout_secs);
        debug!("Context {} reloading page", self.id);

        self.with_page(|page| async move {
            page.execute(ReloadParams::default())
                .await
                .map_err(|e| DriverError::NavigationFailed(e.to_string()))?;

            tokio::time::timeout(timeout, page.wait_for_navigation())
                .await
                .map_err(|_| DriverError::Timeout("Reload timed out".into()))?
                .map_err(|e| DriverError::NavigationFailed(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_cookies(&self) -> Result<Vec<CookieRecord>, DriverError> {
        self.with_page(|page| async move {
            let resp = page
                .execute(GetCookiesParams::default())
                .await
                .map_err(|e| DriverError::ConnectionLost(e.to_string()))?;

            let cookies = resp
                .result
                .cookies
                .iter()
                .map(|c| CookieRecord {
                    name: c.name.clone(),
                    value: c.value.clone(),
                    domain: c.domain.clone(),
                    path: c.path.clone(),
                    // CDP reports -1 for session cookies
                    expiry: if c.expires > 0.0 {
                        Some(c.expires as i64)
                    } else {
                        None
                    },
                    secure: c.secure,
                    http_only: c.http_only,
                    same_site: c.same_site.as_ref().map(|s| match s {
                        CookieSameSite::Strict => SameSite::Strict,
                        CookieSameSite::Lax => SameSite::Lax,
                        CookieSameSite::None => SameSite::None,
                    }),
                })
                .collect();

            Ok(cookies)
        })
        .await
    }

    async fn set_cookie(&self, cookie: &CookieRecord) -> Result<(), DriverError> {
        let param = Self::to_cookie_param(cookie)?;
        self.with_page(|page| async move {
            page.execute(SetCookiesParams::new(vec![param]))
                .await
                .map_err(|e| DriverError::ScriptFailed(format!("Failed to set cookie: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let sel = selector.to_string();
        self.with_page(|page| async move {
            tokio::time::timeout(timeout, async {
                loop {
                    if page.find_element(sel.as_str()).await.is_ok() {
                        return;
                    }
                    tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
                }
            })
            .await
            .map_err(|_| {
                DriverError::Timeout(format!(
                    "Element {} not found within {:?}",
                    sel, timeout
                ))
            })
        })
        .await
    }

    async fn clear_field(&self, selector: &str) -> Result<(), DriverError> {
        let sel = selector.to_string();
        self.with_page(|page| async move {
            let element = page
                .find_element(sel.as_str())
                .await
                .map_err(|e| DriverError::ElementNotFound(format!("{}: {}", sel, e)))?;

            element
                .call_js_fn(
                    "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                    false,
                )
                .await
                .map_err(|e| DriverError::ScriptFailed(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let sel = selector.to_string();
        let text = text.to_string();
        self.with_page(|page| async move {
            let element = page
                .find_element(sel.as_str())
                .await
                .map_err(|e| DriverError::ElementNotFound(format!("{}: {}", sel, e)))?;

            element
                .click()
                .await
                .map_err(|e| DriverError::ScriptFailed(e.to_string()))?;
            element
                .focus()
                .await
                .map_err(|e| DriverError::ScriptFailed(e.to_string()))?;

            // Type character by character with a human-like cadence
            use rand::SeedableRng;
            let mut rng = rand::rngs::StdRng::from_entropy();
            for c in text.chars() {
                element
                    .type_str(c.to_string())
                    .await
                    .map_err(|e| DriverError::ScriptFailed(e.to_string()))?;
                let delay = rng.gen_range(40..120);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let sel = selector.to_string();
        self.with_page(|page| async move {
            let element = page
                .find_element(sel.as_str())
                .await
                .map_err(|e| DriverError::ElementNotFound(format!("{}: {}", sel, e)))?;

            element
                .click()
                .await
                .map_err(|e| DriverError::ScriptFailed(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<(), DriverError> {
        // Mark as not alive first to prevent new operations
        self.alive.store(false, Ordering::Relaxed);

        // 1. Close the page first (stops navigation/JS execution)
        {
            let mut page = self.page.write().await;
            if let Some(p) = page.take() {
                let _ = p.close().await;
            }
        }

        // 2. Close the browser: graceful close, brief grace period, then force kill
        {
            let mut browser = self.browser.write().await;
            if let Some(mut b) = browser.take() {
                let _ = b.close().await;
                tokio::time::sleep(Duration::from_millis(500)).await;
                let _ = b.kill().await;
            }
        }

        info!("Browser context {} closed", self.id);
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
    }
}
