use crate::error::RefMapError;
use crate::map::{MappingEntry, MatchRule, ReferenceMap};
use crate::pattern::NamePattern;
use crate::version::VersionRange;
use camino::Utf8Path;
use serde::Deserialize;
use std::io::ErrorKind;
use tracing::debug;
use uplift_types::reference::DependencyRef;

/// On-disk formats for the reference map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// Top-level array of entries.
    Json,
    /// `[[entry]]` array of tables.
    Toml,
}

impl MapFormat {
    /// Picks the format from the file extension; anything but `.toml` is read as JSON.
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => MapFormat::Toml,
            _ => MapFormat::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryWire {
    name: String,

    #[serde(rename = "match", default)]
    rules: Vec<RuleWire>,

    #[serde(default)]
    replacements: Vec<DependencyRef>,
}

#[derive(Debug, Deserialize)]
struct RuleWire {
    name: String,

    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlFile {
    #[serde(default)]
    entry: Vec<EntryWire>,
}

/// Load and validate a reference map from disk.
pub async fn load(path: &Utf8Path) -> Result<ReferenceMap, RefMapError> {
    debug!(path = %path, "loading reference map");

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RefMapError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(RefMapError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    let map = parse(&contents, MapFormat::from_path(path), path)?;
    debug!(path = %path, entries = map.len(), "loaded reference map");
    Ok(map.with_source(path))
}

/// Parse and validate reference map contents. `path` is only used for error messages.
pub fn parse(
    contents: &str,
    format: MapFormat,
    path: &Utf8Path,
) -> Result<ReferenceMap, RefMapError> {
    let malformed = |message: String| RefMapError::ConfigMalformed {
        path: path.to_path_buf(),
        message,
    };

    let wire: Vec<EntryWire> = match format {
        MapFormat::Json => serde_json::from_str(contents).map_err(|e| malformed(e.to_string()))?,
        MapFormat::Toml => {
            toml::from_str::<TomlFile>(contents)
                .map_err(|e| malformed(e.to_string()))?
                .entry
        }
    };

    let mut entries = Vec::with_capacity(wire.len());
    for w in wire {
        let entry = to_entry(w).map_err(&malformed)?;
        entry.validate().map_err(&malformed)?;
        entries.push(entry);
    }

    let map = ReferenceMap::from_entries(entries);
    map.validate_closed().map_err(malformed)?;
    Ok(map)
}

fn to_entry(w: EntryWire) -> Result<MappingEntry, String> {
    let mut rules = Vec::with_capacity(w.rules.len());
    for r in w.rules {
        if r.name.trim().is_empty() {
            return Err(format!("entry '{}' has a match rule with empty name", w.name));
        }
        let versions = match r.version.as_deref() {
            Some(v) => VersionRange::parse(v).map_err(|e| format!("entry '{}': {e}", w.name))?,
            None => VersionRange::any(),
        };
        rules.push(MatchRule::new(NamePattern::new(r.name), versions));
    }

    Ok(MappingEntry {
        name: w.name,
        rules,
        replacements: w.replacements,
    })
}
