//! Identifier for a table section in the configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of an entry under `tables:`.
///
/// Also names the table's checkpoint state file and its metrics label.
///
/// # Examples
///
/// ```
/// use soulsink::config::TableKey;
///
/// let key = TableKey::new("events");
/// assert_eq!(key.id(), "events");
/// assert_eq!(key.state_file_name(), "events.json");
/// ```
#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableKey(String);

impl TableKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// Whether the key contains `/` or `\\`. Such keys are rejected by
    /// config validation.
    pub fn has_path_separator(&self) -> bool {
        self.0.contains(['/', '\\'])
    }

    /// File name of this table's trigger state inside the state directory.
    pub fn state_file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TableKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_separators() {
        assert!(TableKey::new("db/events").has_path_separator());
        assert!(TableKey::new("db\\events").has_path_separator());
        assert!(!TableKey::new("db_events").has_path_separator());
        assert_eq!(TableKey::new("db_events").state_file_name(), "db_events.json");
    }

    #[test]
    fn test_display() {
        assert_eq!(TableKey::from("users").to_string(), "users");
    }
}
