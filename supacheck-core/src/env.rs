//! Plain `KEY=VALUE` environment files.
//!
//! The format is deliberately dumb: one pair per line, split on the first `=`,
//! no quoting, no escapes, no comments. Anything without an `=` is ignored.

use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap {
    vars: BTreeMap<String, String>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path` into a map. A missing or unreadable file yields an empty map.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let map = Self::parse_str(&content);
                tracing::debug!(path = %path.display(), keys = map.len(), "loaded env file");
                map
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "env file not found");
                Self::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "env file unreadable");
                Self::new()
            }
        }
    }

    pub fn parse_str(content: &str) -> Self {
        let mut vars = BTreeMap::new();
        for line in content.lines() {
            if let Some((key, value)) = line.trim().split_once('=') {
                vars.insert(key.to_string(), value.to_string());
            }
        }
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_equals_only() {
        let env = EnvMap::parse_str("TOKEN=abc==\nURL=https://x.supabase.co?a=b\n");
        assert_eq!(env.get("TOKEN"), Some("abc=="));
        assert_eq!(env.get("URL"), Some("https://x.supabase.co?a=b"));
    }

    #[test]
    fn skips_lines_without_separator() {
        let env = EnvMap::parse_str("just some text\n\nKEY=v\n");
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("KEY"), Some("v"));
    }

    #[test]
    fn keeps_quotes_and_trims_line() {
        let env = EnvMap::parse_str("  QUOTED=\"x y\"  \r\n");
        assert_eq!(env.get("QUOTED"), Some("\"x y\""));
    }

    #[test]
    fn later_duplicate_wins() {
        let env = EnvMap::parse_str("A=1\nA=2\n");
        assert_eq!(env.get("A"), Some("2"));
    }

    #[test]
    fn empty_value_is_kept() {
        let env = EnvMap::parse_str("EMPTY=\n");
        assert_eq!(env.get("EMPTY"), Some(""));
    }
}
