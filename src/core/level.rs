//! Log level names
//!
//! Levels are open-ended: any non-empty name a logger is configured with is
//! valid. The four defaults carry no ordering between them.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(String);

impl Level {
    pub const DEBUG: &'static str = "debug";
    pub const INFO: &'static str = "info";
    pub const WARN: &'static str = "warn";
    pub const ERROR: &'static str = "error";

    /// Levels bound by a logger when none are configured
    pub const DEFAULTS: [&'static str; 4] = [Self::DEBUG, Self::INFO, Self::WARN, Self::ERROR];

    pub fn new(name: impl Into<String>) -> Self {
        Level(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(format!("Invalid log level: '{}'", s));
        }
        Ok(Level(s.to_string()))
    }
}

impl From<&str> for Level {
    fn from(name: &str) -> Self {
        Level(name.to_string())
    }
}

impl From<String> for Level {
    fn from(name: String) -> Self {
        Level(name)
    }
}

impl Borrow<str> for Level {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Level {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Level {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Level::DEFAULTS, ["debug", "info", "warn", "error"]);
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!("".parse::<Level>().is_err());
        assert!("  ".parse::<Level>().is_err());
        assert_eq!("audit".parse::<Level>().unwrap(), "audit");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Level::from("warn")).unwrap();
        assert_eq!(json, "\"warn\"");
    }
}
