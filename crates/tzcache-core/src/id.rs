//! Timezone identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque timezone identifier (e.g. `"America/New_York"`).
///
/// The service treats identifiers as uninterpreted strings; legacy
/// forms are mapped to canonical ones through the alias table, not by
/// inspecting the id itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TzId(String);

impl TzId {
    /// Creates a new identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TzId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TzId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TzId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TzId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip() {
        let id = TzId::new("America/New_York");
        assert_eq!(id.as_str(), "America/New_York");
        assert_eq!(id.to_string(), "America/New_York");
        assert_eq!(TzId::from("America/New_York"), id);
    }

    #[test]
    fn id_serde_transparent() {
        let id = TzId::new("Europe/Paris");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Europe/Paris\"");
        let back: TzId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
