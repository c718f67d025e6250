//! Append-only trip message log.
use serde::{Deserialize, Serialize};

/// Session-scoped log. Storage is unbounded; display uses [`MessageLog::recent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MessageLog(Vec<String>);

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a log with a single opening line.
    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// The most recent `count` entries, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> &[String] {
        let start = self.0.len().saturating_sub(count);
        &self.0[start..]
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_tail_in_order() {
        let mut log = MessageLog::with_message("start");
        for idx in 0..7 {
            log.push(format!("line {idx}"));
        }
        assert_eq!(log.len(), 8);
        assert_eq!(log.recent(3), ["line 4", "line 5", "line 6"]);
        assert_eq!(log.recent(50).len(), 8);
        assert_eq!(log.last(), Some("line 6"));
    }

    #[test]
    fn serializes_as_plain_array() {
        let log = MessageLog::with_message("hello");
        let json = serde_json::to_string(&log).unwrap();
        assert_eq!(json, r#"["hello"]"#);
    }
}
