//! Legacy alias table.
//!
//! The timezone service publishes aliases as properties-style
//! `old=new` lines. The table itself is a plain lookup; chain walking
//! and its hop bound live in the resolution engine.

use std::collections::HashMap;

use tracing::debug;

/// Mapping from legacy/alternate timezone ids to canonical ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a properties-style alias document.
    ///
    /// Blank lines and lines starting with `#` or `!` are skipped, as
    /// are lines without a `=`. Later duplicates of a key win.
    pub fn parse(text: &str) -> Self {
        let mut map = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((old, new)) = line.split_once('=') else {
                debug!(line = %line, "skipping malformed alias line");
                continue;
            };
            let (old, new) = (old.trim(), new.trim());
            if old.is_empty() || new.is_empty() {
                debug!(line = %line, "skipping empty alias mapping");
                continue;
            }
            map.insert(old.to_string(), new.to_string());
        }
        Self { map }
    }

    /// Adds a single mapping.
    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.map.insert(old.into(), new.into());
    }

    /// Returns the canonical id one hop away, if `id` is aliased.
    pub fn canonical(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(String::as_str)
    }

    /// Returns the number of mappings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the table has no mappings.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
