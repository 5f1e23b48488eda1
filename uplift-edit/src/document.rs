use toml_edit::{DocumentMut, Item, Table, TableLike, value};
use uplift_types::reference::DependencyRef;

/// Dependency containers recognised at the top level and under `[target.<cfg>]`.
const DEP_TABLES: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];

/// In-memory structural view of a project resource.
///
/// Edits only touch memory; persistence goes through [`crate::ProjectStore::save`].
pub trait ProjectDocument: Send + Sync {
    /// Declared references, in document order.
    fn references(&self) -> Vec<DependencyRef>;

    /// Removes every declaration with this name (case-insensitive) and exactly this version.
    /// Containers left empty are removed too. Returns the number of declarations removed.
    fn remove_reference(&mut self, reference: &DependencyRef) -> usize;

    /// Adds a declaration to the first container that already declares references,
    /// creating a container when none does.
    fn add_reference(&mut self, reference: &DependencyRef);

    /// Serialized form, suitable for persisting.
    fn render(&self) -> String;
}

/// TOML manifest with `[dependencies]`-style tables, edited with `toml_edit` so that
/// formatting and comments survive.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    doc: DocumentMut,
}

impl ManifestDocument {
    pub fn parse(contents: &str) -> Result<Self, String> {
        let doc = contents.parse::<DocumentMut>().map_err(|e| e.to_string())?;
        let this = Self { doc };
        this.validate()?;
        Ok(this)
    }

    fn validate(&self) -> Result<(), String> {
        let root = self.doc.as_table();
        for (key, item) in root.iter() {
            if DEP_TABLES.contains(&key) && !item.is_table_like() {
                return Err(format!("[{key}] must be a table"));
            }
        }

        if let Some(target) = root.get("target") {
            let targets = target
                .as_table_like()
                .ok_or_else(|| "[target] must be a table".to_string())?;
            for (cfg, cfg_item) in targets.iter() {
                let cfg_tbl = cfg_item
                    .as_table_like()
                    .ok_or_else(|| format!("[target.{cfg}] must be a table"))?;
                for (key, item) in cfg_tbl.iter() {
                    if DEP_TABLES.contains(&key) && !item.is_table_like() {
                        return Err(format!("[target.{cfg}.{key}] must be a table"));
                    }
                }
            }
        }

        for path in self.dependency_tables() {
            let Some(table) = table_at(&self.doc, &path) else {
                continue;
            };
            for (name, item) in table.iter() {
                entry_version(item)
                    .map_err(|why| format!("dependency '{name}' in [{}] {why}", path.join(".")))?;
            }
        }
        Ok(())
    }

    /// Paths of all dependency tables in document order.
    fn dependency_tables(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        for (key, item) in self.doc.as_table().iter() {
            if DEP_TABLES.contains(&key) && item.is_table_like() {
                out.push(vec![key.to_string()]);
                continue;
            }
            if key != "target" {
                continue;
            }
            let Some(targets) = item.as_table_like() else {
                continue;
            };
            for (cfg, cfg_item) in targets.iter() {
                let Some(cfg_tbl) = cfg_item.as_table_like() else {
                    continue;
                };
                for (k, i) in cfg_tbl.iter() {
                    if DEP_TABLES.contains(&k) && i.is_table_like() {
                        out.push(vec!["target".to_string(), cfg.to_string(), k.to_string()]);
                    }
                }
            }
        }
        out
    }

    /// Remove the container at `path` and any ancestors it leaves empty.
    fn prune_empty(&mut self, path: &[String]) {
        for depth in (1..=path.len()).rev() {
            let empty = table_at(&self.doc, &path[..depth]).is_some_and(|t| t.is_empty());
            if !empty {
                break;
            }
            if let Some(parent) = table_at_mut(&mut self.doc, &path[..depth - 1]) {
                parent.remove(&path[depth - 1]);
            }
        }
    }
}

impl ProjectDocument for ManifestDocument {
    fn references(&self) -> Vec<DependencyRef> {
        let mut out = Vec::new();
        for path in self.dependency_tables() {
            let Some(table) = table_at(&self.doc, &path) else {
                continue;
            };
            for (name, item) in table.iter() {
                let version = entry_version(item).ok().flatten();
                out.push(DependencyRef {
                    name: name.to_string(),
                    version,
                });
            }
        }
        out
    }

    fn remove_reference(&mut self, reference: &DependencyRef) -> usize {
        let mut removed = 0;
        for path in self.dependency_tables() {
            let Some(table) = table_at_mut(&mut self.doc, &path) else {
                continue;
            };
            let keys: Vec<String> = table
                .iter()
                .filter(|(name, item)| {
                    reference.has_name(name)
                        && entry_version(item).ok().flatten() == reference.version
                })
                .map(|(name, _)| name.to_string())
                .collect();
            if keys.is_empty() {
                continue;
            }
            for key in &keys {
                table.remove(key);
            }
            removed += keys.len();
            self.prune_empty(&path);
        }
        removed
    }

    fn add_reference(&mut self, reference: &DependencyRef) {
        let target = self
            .dependency_tables()
            .into_iter()
            .find(|p| table_at(&self.doc, p).is_some_and(|t| !t.is_empty()))
            .unwrap_or_else(|| vec!["dependencies".to_string()]);

        if table_at(&self.doc, &target).is_none() {
            self.doc
                .as_table_mut()
                .insert("dependencies", Item::Table(Table::new()));
        }

        let version = reference.version.as_deref().unwrap_or("*");
        if let Some(table) = table_at_mut(&mut self.doc, &target) {
            table.insert(&reference.name, value(version));
        }
    }

    fn render(&self) -> String {
        self.doc.to_string()
    }
}

/// Version of a single dependency declaration: `name = "1.0"` or `name = { version = "1.0", .. }`.
fn entry_version(item: &Item) -> Result<Option<String>, String> {
    if let Some(s) = item.as_str() {
        return Ok(Some(s.to_string()));
    }
    if let Some(t) = item.as_table_like() {
        return match t.get("version") {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| "has a non-string version".to_string()),
        };
    }
    Err("must be a version string or a table".to_string())
}

fn table_at<'a>(doc: &'a DocumentMut, path: &[String]) -> Option<&'a dyn TableLike> {
    let mut cur: &'a dyn TableLike = doc.as_table();
    for seg in path {
        cur = cur.get(seg)?.as_table_like()?;
    }
    Some(cur)
}

fn table_at_mut<'a>(doc: &'a mut DocumentMut, path: &[String]) -> Option<&'a mut dyn TableLike> {
    let mut cur: &'a mut dyn TableLike = doc.as_table_mut();
    for seg in path {
        cur = cur.get_mut(seg)?.as_table_like_mut()?;
    }
    Some(cur)
}
