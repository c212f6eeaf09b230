//! Session token scraping
//!
//! Management pages embed a per-page token as an escaped hex string:
//!
//! ```text
//! var _sessionTmpToken = "\x33\x39\x31\x32";
//! ```
//!
//! Writes must echo the decoded bytes back as `_sessionTOKEN`.

use f680_core::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SESSION_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"_sessionTmpToken = "([\\x0-9A-Fa-f]+)""#).expect("session token pattern is valid")
});

/// Raw session token bytes
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionToken(Vec<u8>);

impl SessionToken {
    /// Wrap raw token bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Token as sent in the form body
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for the empty token
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Tokens are credentials; only their length is printed.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<{} bytes>)", self.0.len())
    }
}

/// Result of scraping a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapedToken {
    /// The page embeds a token
    Found(SessionToken),
    /// The page has no token (no write form on it)
    Absent,
}

impl ScrapedToken {
    /// Token to submit; an absent token is submitted empty
    pub fn into_token(self) -> SessionToken {
        match self {
            Self::Found(token) => token,
            Self::Absent => SessionToken::default(),
        }
    }
}

/// Extracts the session token from a management page
pub trait SessionTokenScraper: Send + Sync {
    /// Scrape `html`
    ///
    /// A missing token is [`ScrapedToken::Absent`], not an error. A token
    /// that is present but cannot be decoded is a parse error.
    fn scrape(&self, html: &str) -> Result<ScrapedToken>;
}

/// Default scraper matching `_sessionTmpToken = "..."`
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScraper;

impl SessionTokenScraper for PatternScraper {
    fn scrape(&self, html: &str) -> Result<ScrapedToken> {
        let Some(captures) = SESSION_TOKEN_RE.captures(html) else {
            return Ok(ScrapedToken::Absent);
        };

        let escaped = &captures[1];
        let raw = hex::decode(escaped.replace(r"\x", ""))
            .map_err(|e| Error::parse(format!("invalid session token {:?}: {}", escaped, e)))?;

        Ok(ScrapedToken::Found(SessionToken::new(raw)))
    }
}
