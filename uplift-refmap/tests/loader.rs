//! Reference map loading tests against real files.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use uplift_refmap::{MapFormat, RefMapError, load, parse};
use uplift_types::reference::DependencyRef;

const JSON_MAP: &str = r#"
[
  {
    "name": "web-stack",
    "match": [
      { "name": "PackageA", "version": "<2.0" },
      { "name": "PackageA.Extras" }
    ],
    "replacements": [
      { "name": "PackageB", "version": "2.0" },
      { "name": "PackageB.Extras", "version": "2.0" }
    ]
  },
  {
    "name": "logging",
    "match": [{ "name": "legacy-log*", "version": "[1.0,3.0)" }],
    "replacements": [{ "name": "tracing", "version": "0.1" }]
  }
]
"#;

const TOML_MAP: &str = r#"
[[entry]]
name = "web-stack"
match = [{ name = "PackageA", version = "<2.0" }]
replacements = [{ name = "PackageB", version = "2.0" }]

[[entry]]
name = "logging"
match = [{ name = "legacy-log*" }]
replacements = [{ name = "tracing", version = "0.1" }]
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn loads_json_map_in_declared_order() {
    let td = TempDir::new().unwrap();
    let path = write(&td, "refmap.json", JSON_MAP);

    let map = load(&path).await.unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.source(), Some(path.as_path()));
    assert_eq!(map.entries()[0].name, "web-stack");
    assert_eq!(
        map.entries()[0].replacements,
        vec![
            DependencyRef::versioned("PackageB", "2.0"),
            DependencyRef::versioned("PackageB.Extras", "2.0"),
        ]
    );

    assert_eq!(
        map.find_match("packagea.extras", Some("7.0")).map(|e| e.name.as_str()),
        Some("web-stack")
    );
    assert_eq!(
        map.find_match("legacy-logger", Some("2.5")).map(|e| e.name.as_str()),
        Some("logging")
    );
    assert!(map.find_match("legacy-logger", Some("3.0")).is_none());
}

#[tokio::test]
async fn loads_toml_map() {
    let td = TempDir::new().unwrap();
    let path = write(&td, "refmap.toml", TOML_MAP);

    let map = load(&path).await.unwrap();

    assert_eq!(map.len(), 2);
    assert!(map.find_match("PackageA", Some("1.0")).is_some());
    assert!(map.find_match("legacy-log", None).is_some());
}

#[tokio::test]
async fn missing_file_is_config_not_found() {
    let td = TempDir::new().unwrap();
    let path = Utf8PathBuf::from_path_buf(td.path().join("absent.json")).unwrap();

    let err = load(&path).await.unwrap_err();

    assert_eq!(err, RefMapError::ConfigNotFound { path: path.clone() });
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn structurally_invalid_file_is_config_malformed() {
    let td = TempDir::new().unwrap();
    let path = write(&td, "refmap.json", r#"{ "not": "an array" }"#);

    let err = load(&path).await.unwrap_err();

    assert!(matches!(err, RefMapError::ConfigMalformed { .. }));
    assert_eq!(err.path(), &path);
}

#[test]
fn invalid_version_range_is_malformed() {
    let json = r#"[{ "name": "e", "match": [{ "name": "a", "version": "[1.0," }] }]"#;
    let err = parse(json, MapFormat::Json, Utf8Path::new("m.json")).unwrap_err();
    match err {
        RefMapError::ConfigMalformed { message, .. } => {
            assert!(message.contains("invalid version range"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn duplicate_replacement_names_are_malformed() {
    let json = r#"[{
        "name": "e",
        "match": [{ "name": "a" }],
        "replacements": [{ "name": "b", "version": "1" }, { "name": "B", "version": "2" }]
    }]"#;
    let err = parse(json, MapFormat::Json, Utf8Path::new("m.json")).unwrap_err();
    assert!(matches!(err, RefMapError::ConfigMalformed { .. }));
}

#[test]
fn empty_map_is_valid() {
    let map = parse("[]", MapFormat::Json, Utf8Path::new("m.json")).unwrap();
    assert!(map.is_empty());
    assert!(map.find_match("anything", None).is_none());
}

proptest! {
    #[test]
    fn find_match_is_deterministic(
        name in "[A-Za-z][A-Za-z0-9._-]{0,12}",
        version in proptest::option::of("[0-9]{1,2}\\.[0-9]{1,2}"),
    ) {
        let map = parse(JSON_MAP, MapFormat::Json, Utf8Path::new("m.json")).unwrap();
        let first = map.find_match(&name, version.as_deref()).map(|e| e.name.clone());
        let second = map.find_match(&name, version.as_deref()).map(|e| e.name.clone());
        prop_assert_eq!(first, second);
    }
}
