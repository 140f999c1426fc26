//! Hierarchical cache keys.
//!
//! A key is an ordered list of parts. Equal requests build equal keys, and
//! invalidation works on part-wise prefixes: `["weather"]` matches every
//! weather entry, `["weather", "current"]` only current-conditions entries.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Text(String),
    Number(u64),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u32> for KeyPart {
    fn from(n: u32) -> Self {
        Self::Number(u64::from(n))
    }
}

impl From<u64> for KeyPart {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Builder-style append.
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Part-wise prefix test. The empty key is a prefix of everything.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", part)?;
        }
        f.write_str("]")
    }
}

pub const WEATHER: &str = "weather";

/// Key constructors for the weather queries.
pub mod weather_keys {
    use super::{QueryKey, WEATHER};

    /// Prefix covering every weather entry.
    pub fn all() -> QueryKey {
        QueryKey::new([WEATHER])
    }

    // Text parts are trimmed the way the gateway trims them, so `" paris "`
    // and `"paris"` share an entry.

    pub fn search(query: &str) -> QueryKey {
        all().with("search").with(query.trim())
    }

    pub fn current(location: &str) -> QueryKey {
        current_scope(location)
    }

    pub fn forecast(location: &str, days: u32) -> QueryKey {
        forecast_scope(location).with(days)
    }

    pub fn data(location: &str, days: u32) -> QueryKey {
        data_scope(location).with(days)
    }

    /// Prefixes covering every current, forecast and combined entry for
    /// `location`, whatever the day count.
    pub fn location_scopes(location: &str) -> [QueryKey; 3] {
        [
            current_scope(location),
            forecast_scope(location),
            data_scope(location),
        ]
    }

    fn current_scope(location: &str) -> QueryKey {
        all().with("current").with(location.trim())
    }

    fn forecast_scope(location: &str) -> QueryKey {
        all().with("forecast").with(location.trim())
    }

    fn data_scope(location: &str) -> QueryKey {
        all().with("data").with(location.trim())
    }
}
