use serde::{Deserialize, Serialize};

/// Name of a contested resource, e.g. `leader:job-sweeper`.
///
/// A key maps to at most one holder in the store at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseKey(String);

impl LeaseKey {
    /// Create a new lease key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Return the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty (or whitespace only).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeaseKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LeaseKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier proving which holder owns a lease.
///
/// Minted once per election engine. A restarted process gets a fresh token,
/// so it can never pass itself off as its previous incarnation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaderToken(String);

impl LeaderToken {
    /// Generate a fresh random token (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an externally supplied token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Return the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeaderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique() {
        let a = LeaderToken::generate();
        let b = LeaderToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn blank_keys() {
        assert!(LeaseKey::new("").is_blank());
        assert!(LeaseKey::new("   ").is_blank());
        assert!(!LeaseKey::new("leader:job-sweeper").is_blank());
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let key = LeaseKey::from("leader:job-sweeper");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"leader:job-sweeper\"");
        assert_eq!(key.to_string(), "leader:job-sweeper");
    }
}
