//! User/reminder directory.
//!
//! The agent only needs one thing from the enrollment system: the
//! reminder list for a recognized name. This directory reads the same
//! users file the enrollment side maintains, ignoring everything in it
//! except names and reminders.

use crate::sensing::{ReminderLookup, SensorError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry in the user directory.
///
/// Unknown fields in the file (face encodings and the like) are skipped
/// on deserialize; this side never touches biometric data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    #[serde(default)]
    pub reminders: Vec<String>,
}

/// Read-only view over the user store, keyed by lowercase name.
pub struct UserDirectory {
    users: Vec<UserRecord>,
}

impl UserDirectory {
    /// Load the directory from a JSON file. A missing file is an empty
    /// directory, matching a deployment where nobody is enrolled yet.
    pub fn load(path: &Path) -> Result<Self, UserStoreError> {
        if !path.exists() {
            return Ok(Self::empty());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| UserStoreError::Io(e.to_string()))?;
        let users: Vec<UserRecord> =
            serde_json::from_str(&content).map_err(|e| UserStoreError::Parse(e.to_string()))?;
        Ok(Self { users })
    }

    /// An empty directory.
    pub fn empty() -> Self {
        Self { users: Vec::new() }
    }

    /// Build a directory from in-memory records.
    pub fn in_memory(users: Vec<UserRecord>) -> Self {
        Self { users }
    }

    /// Look up a user by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&UserRecord> {
        let needle = name.to_lowercase();
        self.users.iter().find(|u| u.name.to_lowercase() == needle)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl ReminderLookup for UserDirectory {
    fn reminders_for(&self, name: &str) -> Result<Vec<String>, SensorError> {
        Ok(self.get(name).map(|u| u.reminders.clone()).unwrap_or_default())
    }
}

/// User store errors.
#[derive(Debug)]
pub enum UserStoreError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for UserStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStoreError::Io(e) => write!(f, "IO error: {e}"),
            UserStoreError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for UserStoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, reminders: &[&str]) -> UserRecord {
        UserRecord {
            name: name.to_string(),
            reminders: reminders.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = UserDirectory::in_memory(vec![record("alice", &["keys"])]);
        assert!(dir.get("Alice").is_some());
        assert!(dir.get("ALICE").is_some());
        assert!(dir.get("bob").is_none());
    }

    #[test]
    fn test_reminders_for_unknown_user_is_empty() {
        let dir = UserDirectory::in_memory(vec![record("alice", &["keys"])]);
        assert_eq!(dir.reminders_for("alice").unwrap(), vec!["keys".to_string()]);
        assert!(dir.reminders_for("bob").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_empty_directory() {
        let dir = UserDirectory::load(Path::new("/nonexistent/users.json")).unwrap();
        assert!(dir.is_empty());
    }

    #[test]
    fn test_parse_skips_unknown_fields() {
        let json = r#"[{"name": "alice", "face_encodings": [[0.1, 0.2]], "reminders": ["keys", "wallet"]}]"#;
        let users: Vec<UserRecord> = serde_json::from_str(json).unwrap();
        let dir = UserDirectory::in_memory(users);
        assert_eq!(
            dir.reminders_for("alice").unwrap(),
            vec!["keys".to_string(), "wallet".to_string()]
        );
    }
}
