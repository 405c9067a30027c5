//! Session acquisition state machine
//!
//! One acquisition request walks
//! `START → COOKIES_LOADED? → INJECTED → VALIDATING → {AUTHENTICATED |
//! NEEDS_LOGIN} → LOGGING_IN → {AUTHENTICATED | LOGIN_FAILED}`.
//!
//! The manager is the sole owner of the durable artifact for an
//! identity: downstream collaborators get an [`AuthenticatedSession`]
//! and never touch cookie storage directly.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, DriverError};

use super::{storage_key, ArtifactStore, SessionArtifact, SessionError};

/// How long to re-check for the login form when deciding whether a
/// failed post-login probe means rejected credentials
const LOGIN_FORM_RECHECK: Duration = Duration::from_secs(2);

/// Target portal configuration: URLs, selectors, and bounded waits.
/// Supplied by the caller; nothing here is validated against the portal.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Base URL of the portal; cookies can only be attached once a
    /// document from this origin is active
    pub base_url: String,
    /// Interactive login page
    pub login_url: String,
    /// Selector for an element rendered only for logged-in users
    pub auth_probe_selector: String,
    /// Login form field selectors
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
    /// Cookie domain the portal scopes its session cookies to
    pub cookie_domain: String,
    /// Bounded wait for the authenticated-state probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Bounded wait for locating login form elements
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,
    /// Settle delay after refresh/submit for client-side redirects
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_element_timeout_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    2_000
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".to_string(),
            login_url: "https://www.linkedin.com/login".to_string(),
            auth_probe_selector: "#global-nav-typeahead".to_string(),
            username_selector: "#username".to_string(),
            password_selector: "#password".to_string(),
            submit_selector: "button[type='submit']".to_string(),
            cookie_domain: ".linkedin.com".to_string(),
            probe_timeout_ms: default_probe_timeout_ms(),
            element_timeout_ms: default_element_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl SiteConfig {
    /// Base origin to navigate to before attaching cookies
    pub fn origin(&self) -> String {
        url::Url::parse(&self.base_url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| self.base_url.clone())
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Login credentials. Only needed when a fresh login may be required.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A browser context that is authenticated at hand-over time.
/// Downstream collaborators drive it through the driver interface.
pub struct AuthenticatedSession<D: BrowserDriver> {
    driver: D,
    identity: String,
    login_performed: bool,
}

impl<D: BrowserDriver> std::fmt::Debug for AuthenticatedSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("identity", &self.identity)
            .field("login_performed", &self.login_performed)
            .finish_non_exhaustive()
    }
}

impl<D: BrowserDriver> AuthenticatedSession<D> {
    /// Identity this session belongs to
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Whether an interactive login was required to reach this state
    pub fn login_performed(&self) -> bool {
        self.login_performed
    }

    /// Access the underlying browser context
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Close the underlying browser context
    pub async fn close(self) -> Result<(), DriverError> {
        self.driver.close().await
    }
}

/// Owns the session lifecycle for identities: artifact load, cookie
/// injection, validation, interactive login fallback, and persistence.
pub struct SessionManager<S: ArtifactStore> {
    store: S,
}

impl<S: ArtifactStore> SessionManager<S> {
    /// Create a manager over the given artifact store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Acquire an authenticated browser session for `identity`.
    ///
    /// Takes ownership of a freshly launched driver. On success the
    /// driver is handed back inside the [`AuthenticatedSession`]; on any
    /// failure it is closed before the error propagates, so no
    /// partially-authenticated handle ever escapes.
    pub async fn acquire_session<D: BrowserDriver>(
        &self,
        driver: D,
        identity: &str,
        credentials: &Credentials,
        site: &SiteConfig,
    ) -> Result<AuthenticatedSession<D>, SessionError> {
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        match self.run_acquisition(&request_id, &driver, identity, credentials, site).await {
            Ok(login_performed) => Ok(AuthenticatedSession {
                driver,
                identity: identity.to_string(),
                login_performed,
            }),
            Err(e) => {
                warn!("Acquisition {} failed: {}", request_id, e);
                if let Err(close_err) = driver.close().await {
                    warn!("Acquisition {} context close failed: {}", request_id, close_err);
                }
                Err(e)
            }
        }
    }

    /// The state machine proper. Returns whether an interactive login
    /// was performed.
    async fn run_acquisition<D: BrowserDriver>(
        &self,
        request_id: &str,
        driver: &D,
        identity: &str,
        credentials: &Credentials,
        site: &SiteConfig,
    ) -> Result<bool, SessionError> {
        let key = storage_key(identity);
        info!("Acquisition {} for identity {} (key {})", request_id, identity, &key[..12]);

        // START -> COOKIES_LOADED?
        let artifact = self.store.load(&key).await?;

        let injected = match artifact {
            Some(ref artifact) if !artifact.is_empty() => {
                // COOKIES_LOADED? -> INJECTED -> VALIDATING
                let count = self.inject_cookies(request_id, driver, artifact, site).await?;
                if count > 0 {
                    driver.refresh().await?;
                    tokio::time::sleep(site.settle()).await;
                }
                count
            }
            Some(_) => {
                debug!("Acquisition {} artifact is empty", request_id);
                0
            }
            None => {
                // Absence is a normal outcome, not an error
                info!("Acquisition {} no prior session artifact", request_id);
                0
            }
        };

        // VALIDATING -> AUTHENTICATED | NEEDS_LOGIN
        if injected > 0 && self.probe_authenticated(driver, site).await? {
            info!("Acquisition {} authenticated via saved session", request_id);
            return Ok(false);
        }

        // NEEDS_LOGIN -> LOGGING_IN
        info!("Acquisition {} needs interactive login", request_id);
        self.login(request_id, driver, credentials, site).await?;

        // LOGGING_IN -> AUTHENTICATED: capture and overwrite the artifact
        let cookies = driver.get_cookies().await?;
        let fresh = SessionArtifact::capture(cookies);
        self.store.save(&key, &fresh).await?;

        info!(
            "Acquisition {} authenticated via login ({} cookies persisted)",
            request_id,
            fresh.cookies.len()
        );
        Ok(true)
    }

    /// Attach the artifact's cookies to the live context. Malformed or
    /// expired records are skipped and logged, never fatal. Returns the
    /// number of cookies attached.
    async fn inject_cookies<D: BrowserDriver>(
        &self,
        request_id: &str,
        driver: &D,
        artifact: &SessionArtifact,
        site: &SiteConfig,
    ) -> Result<usize, SessionError> {
        // Cookie scoping rules require an active document on the target
        // origin before cookies can be attached
        driver.navigate(&site.origin()).await?;

        let mut attached = 0usize;
        let mut skipped = 0usize;

        for cookie in &artifact.cookies {
            if let Err(defect) = cookie.validate() {
                warn!(
                    "Acquisition {} skipping cookie {:?} for domain {:?}: {}",
                    request_id, cookie.name, cookie.domain, defect
                );
                skipped += 1;
                continue;
            }

            if !cookie.domain.ends_with(site.cookie_domain.trim_start_matches('.')) {
                debug!(
                    "Acquisition {} cookie {} has foreign domain {}",
                    request_id, cookie.name, cookie.domain
                );
            }

            match driver.set_cookie(cookie).await {
                Ok(()) => attached += 1,
                Err(e) => {
                    // A cookie the browser rejects is as useless as a
                    // malformed one; skip it and keep going
                    warn!(
                        "Acquisition {} browser rejected cookie {}: {}",
                        request_id, cookie.name, e
                    );
                    skipped += 1;
                }
            }
        }

        info!(
            "Acquisition {} injected {} cookies ({} skipped)",
            request_id, attached, skipped
        );
        Ok(attached)
    }

    /// Single bounded probe for the authenticated-only element.
    /// A timeout is a negative result, not an error.
    async fn probe_authenticated<D: BrowserDriver>(
        &self,
        driver: &D,
        site: &SiteConfig,
    ) -> Result<bool, SessionError> {
        match driver
            .wait_for_element(&site.auth_probe_selector, site.probe_timeout())
            .await
        {
            Ok(()) => Ok(true),
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(SessionError::Driver(e)),
        }
    }

    /// Drive the interactive login form, then re-probe once.
    async fn login<D: BrowserDriver>(
        &self,
        request_id: &str,
        driver: &D,
        credentials: &Credentials,
        site: &SiteConfig,
    ) -> Result<(), SessionError> {
        driver.navigate(&site.login_url).await?;

        // Locate, clear, and fill each form field within a bounded wait
        driver
            .wait_for_element(&site.username_selector, site.element_timeout())
            .await?;
        map_form_err(driver.clear_field(&site.username_selector).await)?;
        map_form_err(driver.type_into(&site.username_selector, &credentials.username).await)?;

        driver
            .wait_for_element(&site.password_selector, site.element_timeout())
            .await?;
        map_form_err(driver.clear_field(&site.password_selector).await)?;
        map_form_err(driver.type_into(&site.password_selector, &credentials.password).await)?;

        driver
            .wait_for_element(&site.submit_selector, site.element_timeout())
            .await?;
        map_form_err(driver.click(&site.submit_selector).await)?;

        tokio::time::sleep(site.settle()).await;

        // Re-run the validation probe exactly once
        match driver
            .wait_for_element(&site.auth_probe_selector, site.probe_timeout())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_timeout() => {
                // Distinguish rejected credentials (form still present)
                // from a probe that never reached a decidable state
                match driver
                    .wait_for_element(&site.username_selector, LOGIN_FORM_RECHECK)
                    .await
                {
                    Ok(()) => Err(SessionError::LoginFailed(format!(
                        "acquisition {}: login form still present after submit",
                        request_id
                    ))),
                    Err(recheck) if recheck.is_timeout() => Err(SessionError::ProbeTimeout(
                        format!(
                            "acquisition {}: authenticated probe {} never succeeded after login",
                            request_id, site.auth_probe_selector
                        ),
                    )),
                    Err(recheck) => Err(SessionError::Driver(recheck)),
                }
            }
            Err(e) => Err(SessionError::Driver(e)),
        }
    }
}

/// Missing form elements after a successful wait are a login failure,
/// not an infrastructure fault
fn map_form_err(result: Result<(), DriverError>) -> Result<(), SessionError> {
    result.map_err(|e| match e {
        DriverError::ElementNotFound(msg) => {
            SessionError::LoginFailed(format!("login form element missing: {}", msg))
        }
        other => SessionError::from(other),
    })
}
