//! Origin handling and resource key derivation
//!
//! Requests are classified by their *logical key*: the URL relative to the
//! worker's origin, with cache-busting `?v=` suffixes and fragments removed.
//! Every spelling of the application root (`origin`, `origin/`,
//! `origin/#route`, `origin/?v=3`) collapses to [`ROOT_KEY`].

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::manifest::ROOT_KEY;
use std::fmt;

/// Cache-busting query marker appended by the hosting page
const VERSION_QUERY: &str = "?v=";

/// Scheme + authority the worker is registered for, without a trailing slash
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    /// Parse an origin such as `https://app.example.com` or `http://localhost:8080`
    pub fn parse(value: &str) -> ShellcacheResult<Self> {
        let trimmed = value.trim().trim_end_matches('/');
        let invalid = |reason: &str| ShellcacheError::OriginInvalid {
            origin: value.to_string(),
            reason: reason.to_string(),
        };

        let authority = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| invalid("expected an http:// or https:// scheme"))?;

        if authority.is_empty() {
            return Err(invalid("missing host"));
        }
        if authority.contains(['/', '?', '#']) {
            return Err(invalid("an origin cannot contain a path, query or fragment"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the logical resource key for a URL on this origin.
    ///
    /// Returns `None` for URLs on other origins.
    pub fn resource_key(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(self.0.as_str())?;

        let path = if rest.is_empty() || rest.starts_with('#') {
            ""
        } else {
            rest.strip_prefix('/')?
        };

        let path = path.split('#').next().unwrap_or_default();
        let path = match path.find(VERSION_QUERY) {
            Some(idx) => &path[..idx],
            None => path,
        };

        if path.is_empty() {
            Some(ROOT_KEY.to_string())
        } else {
            Some(path.to_string())
        }
    }

    /// Canonical absolute URL under which a logical key is stored
    pub fn url_for(&self, key: &str) -> String {
        if key == ROOT_KEY {
            format!("{}/", self.0)
        } else {
            format!("{}/{}", self.0, key.trim_start_matches('/'))
        }
    }

    /// Resolve a user-supplied target (absolute URL or origin-relative path)
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.0, target)
        } else {
            format!("{}/{}", self.0, target)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
