//! Cookie records and the durable session artifact
//!
//! A [`SessionArtifact`] is the serialized proof of an authenticated
//! browser session: the ordered cookie set captured right after a
//! successful login. Round-trip through JSON is exact on every field.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SameSite attribute of a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A single browser cookie, as captured from or injected into a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Expiry as seconds since the UNIX epoch; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

/// Why a cookie record was rejected at injection time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDefect {
    EmptyName,
    EmptyDomain,
    Expired,
}

impl std::fmt::Display for CookieDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookieDefect::EmptyName => write!(f, "empty name"),
            CookieDefect::EmptyDomain => write!(f, "empty domain"),
            CookieDefect::Expired => write!(f, "already expired"),
        }
    }
}

impl CookieRecord {
    /// Validate the record for injection into a live context.
    ///
    /// Malformed or already-expired cookies are skipped by the caller,
    /// never treated as fatal.
    pub fn validate(&self) -> Result<(), CookieDefect> {
        self.validate_at(chrono::Utc::now().timestamp())
    }

    /// Validate against an explicit clock (testable)
    pub fn validate_at(&self, now: i64) -> Result<(), CookieDefect> {
        if self.name.is_empty() {
            return Err(CookieDefect::EmptyName);
        }
        if self.domain.is_empty() {
            return Err(CookieDefect::EmptyDomain);
        }
        if let Some(expiry) = self.expiry {
            if expiry <= now {
                return Err(CookieDefect::Expired);
            }
        }
        Ok(())
    }
}

/// The durable, serialized representation of a browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionArtifact {
    /// Cookies in capture order
    pub cookies: Vec<CookieRecord>,
    /// When this artifact was captured (seconds since the UNIX epoch).
    /// Informational only; staleness is decided by the live probe.
    pub captured_at: i64,
}

impl SessionArtifact {
    /// Build an artifact from a freshly captured cookie set
    pub fn capture(cookies: Vec<CookieRecord>) -> Self {
        Self {
            cookies,
            captured_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Derive the storage key for an identity.
///
/// Deterministic and collision-resistant: the same identity always maps
/// to the same key, and two distinct identities practically never share
/// one. The key doubles as a safe file name.
pub fn storage_key(identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str) -> CookieRecord {
        CookieRecord {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            expiry: None,
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }

    #[test]
    fn test_storage_key_deterministic() {
        let a = storage_key("agent@example.com");
        let b = storage_key("agent@example.com");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_storage_key_distinct_identities() {
        assert_ne!(storage_key("a@example.com"), storage_key("b@example.com"));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let mut c = cookie("");
        c.name.clear();
        assert_eq!(c.validate_at(1_000), Err(CookieDefect::EmptyName));
    }

    #[test]
    fn test_validate_rejects_empty_domain() {
        let mut c = cookie("sid");
        c.domain.clear();
        assert_eq!(c.validate_at(1_000), Err(CookieDefect::EmptyDomain));
    }

    #[test]
    fn test_validate_rejects_expired() {
        let mut c = cookie("sid");
        c.expiry = Some(999);
        assert_eq!(c.validate_at(1_000), Err(CookieDefect::Expired));
    }

    #[test]
    fn test_validate_accepts_session_cookie() {
        assert!(cookie("sid").validate_at(1_000).is_ok());
    }

    #[test]
    fn test_validate_accepts_future_expiry() {
        let mut c = cookie("sid");
        c.expiry = Some(2_000);
        assert!(c.validate_at(1_000).is_ok());
    }

    #[test]
    fn test_artifact_round_trip_exact() {
        let mut with_expiry = cookie("li_at");
        with_expiry.expiry = Some(1_999_999_999);
        with_expiry.same_site = Some(SameSite::Strict);

        let artifact = SessionArtifact {
            cookies: vec![with_expiry, cookie("JSESSIONID")],
            captured_at: 1_700_000_000,
        };

        let json = serde_json::to_string(&artifact).unwrap();
        let back: SessionArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
    }

    #[test]
    fn test_artifact_preserves_cookie_order() {
        let artifact = SessionArtifact {
            cookies: vec![cookie("b"), cookie("a"), cookie("c")],
            captured_at: 0,
        };
        let json = serde_json::to_string(&artifact).unwrap();
        let back: SessionArtifact = serde_json::from_str(&json).unwrap();
        let names: Vec<&str> = back.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
