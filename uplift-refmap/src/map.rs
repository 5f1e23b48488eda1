use crate::pattern::NamePattern;
use crate::version::VersionRange;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;
use uplift_types::reference::DependencyRef;

/// One `(name pattern, version range)` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub name: NamePattern,
    pub versions: VersionRange,
}

impl MatchRule {
    pub fn new(name: NamePattern, versions: VersionRange) -> Self {
        Self { name, versions }
    }

    pub fn accepts(&self, name: &str, version: Option<&str>) -> bool {
        self.name.matches(name) && self.versions.matches(version)
    }
}

/// Translates one or more outdated references into an ordered set of replacements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub name: String,
    pub rules: Vec<MatchRule>,
    pub replacements: Vec<DependencyRef>,
}

impl MappingEntry {
    pub fn accepts(&self, name: &str, version: Option<&str>) -> bool {
        self.rules.iter().any(|r| r.accepts(name, version))
    }

    /// Checks the invariants a well-formed entry must hold.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("entry with empty name".to_string());
        }
        if self.rules.is_empty() {
            return Err(format!("entry '{}' has no match rules", self.name));
        }

        let mut seen = BTreeSet::new();
        for replacement in &self.replacements {
            if replacement.name.trim().is_empty() {
                return Err(format!("entry '{}' has a replacement with empty name", self.name));
            }
            if !seen.insert(replacement.name.to_ascii_lowercase()) {
                return Err(format!(
                    "entry '{}' lists replacement '{}' more than once",
                    self.name, replacement.name
                ));
            }
            // A replacement its own rules accept would be rewritten again on the next run.
            if self.accepts(&replacement.name, replacement.version.as_deref()) {
                return Err(format!(
                    "entry '{}' replacement {} is matched by its own rules",
                    self.name, replacement
                ));
            }
        }
        Ok(())
    }
}

/// Immutable, ordered mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    source: Option<Utf8PathBuf>,
    entries: Vec<MappingEntry>,
}

impl ReferenceMap {
    /// Builds a map from already-validated entries. Use [`crate::parse`] or [`crate::load`]
    /// for untrusted input.
    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        Self {
            source: None,
            entries,
        }
    }

    pub(crate) fn with_source(mut self, source: &Utf8Path) -> Self {
        self.source = Some(source.to_path_buf());
        self
    }

    pub fn source(&self) -> Option<&Utf8Path> {
        self.source.as_deref()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// No replacement may be matched again by any entry, or a second rewrite would
    /// replace what the first one added.
    pub(crate) fn validate_closed(&self) -> Result<(), String> {
        for entry in &self.entries {
            for replacement in &entry.replacements {
                if let Some(other) =
                    self.find_match(&replacement.name, replacement.version.as_deref())
                {
                    return Err(format!(
                        "entry '{}' replacement {} is matched by entry '{}'",
                        entry.name, replacement, other.name
                    ));
                }
            }
        }
        Ok(())
    }

    /// First entry, in declared order, whose rules accept `(name, version)`.
    pub fn find_match(&self, name: &str, version: Option<&str>) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.accepts(name, version))
    }
}
