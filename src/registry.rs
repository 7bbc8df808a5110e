//! Shared read-mostly tables: query templates and named scripts
//!
//! Readers take an `Arc` snapshot of the whole table. Writers build a
//! complete replacement and publish it with one pointer swap, so a reader
//! never observes a half-applied update.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::info;

/// Extension of a script file
pub const SCRIPT_EXTENSION: &str = "gqlp";

/* ===================== Shared Table ===================== */

pub struct SharedTable<V> {
    inner: RwLock<Arc<HashMap<String, V>>>,
}

impl<V: Clone> SharedTable<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Current table; later updates do not affect the returned snapshot
    pub fn snapshot(&self) -> Arc<HashMap<String, V>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.snapshot().get(key).cloned()
    }

    /// Publish `entries` as the whole table
    pub fn replace(&self, entries: HashMap<String, V>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(entries);
    }

    /// Publish the current table overlaid with `entries`
    pub fn merge(&self, entries: HashMap<String, V>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = HashMap::clone(&guard);
        next.extend(entries);
        *guard = Arc::new(next);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for SharedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/* ===================== Template Registry ===================== */

/// Query templates keyed by the trimmed inner text of a query body
#[derive(Default)]
pub struct TemplateRegistry {
    table: SharedTable<String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.table.get(key)
    }

    pub fn merge(&self, templates: HashMap<String, String>) {
        self.table.merge(templates);
    }

    pub fn replace(&self, templates: HashMap<String, String>) {
        self.table.replace(templates);
    }

    /// Merge every entry of a `.gqlpk` pack; returns the number of entries read
    pub fn merge_pack(&self, pack: &str) -> usize {
        let templates = parse_template_pack(pack);
        let count = templates.len();
        self.merge(templates);
        count
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn pack_entry() -> &'static Regex {
    static PACK_ENTRY: OnceLock<Regex> = OnceLock::new();
    PACK_ENTRY.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]:\[\s*([\s\S]*?)\s*\]").expect("pack entry pattern is valid")
    })
}

/// Parse a template pack made of repeated `[key]:[ body ]` entries
///
/// Keys and bodies are trimmed; entries with an empty key or body are skipped.
pub fn parse_template_pack(pack: &str) -> HashMap<String, String> {
    pack_entry()
        .captures_iter(pack)
        .filter_map(|caps| {
            let key = caps[1].trim();
            let body = caps[2].trim();
            if key.is_empty() || body.is_empty() {
                None
            } else {
                Some((key.to_string(), body.to_string()))
            }
        })
        .collect()
}

/* ===================== Script Registry ===================== */

/// A registered script and the hash identifying its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub source: String,
    pub version_hash: String,
}

impl ScriptEntry {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let version_hash = hash_source(&source);
        Self {
            source,
            version_hash,
        }
    }
}

/// Hash script source to create a version identifier
fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
pub struct ScriptRegistry {
    table: SharedTable<ScriptEntry>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ScriptEntry> {
        self.table.get(name)
    }

    /// Register scripts by name, overwriting existing entries of the same name
    pub fn merge(&self, scripts: HashMap<String, String>) {
        let entries: HashMap<String, ScriptEntry> = scripts
            .into_iter()
            .map(|(name, source)| {
                let entry = ScriptEntry::new(source);
                info!(script = %name, version = %&entry.version_hash[..12], "registered script");
                (name, entry)
            })
            .collect();
        self.table.merge(entries);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Name a script file registers under: its stem without the `.gqlp` extension
pub fn script_name_from_file(file_name: &str) -> String {
    let path = Path::new(file_name);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext == SCRIPT_EXTENSION => path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name)
            .to_string(),
        _ => path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file_name)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn test_merge_overlays_existing_entries() {
        let table = SharedTable::new();
        table.replace(hashmap! {
            "a".to_string() => 1,
            "b".to_string() => 2,
        });
        table.merge(hashmap! {
            "b".to_string() => 20,
            "c".to_string() => 30,
        });

        assert_eq!(table.get("a"), Some(1));
        assert_eq!(table.get("b"), Some(20));
        assert_eq!(table.get("c"), Some(30));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_replace_drops_old_entries() {
        let table = SharedTable::new();
        table.merge(hashmap! { "a".to_string() => 1 });
        table.replace(hashmap! { "b".to_string() => 2 });

        assert_eq!(table.get("a"), None);
        assert_eq!(table.get("b"), Some(2));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_updates() {
        let table = SharedTable::new();
        table.merge(hashmap! { "a".to_string() => 1 });

        let before = table.snapshot();
        table.merge(hashmap! { "a".to_string() => 2, "b".to_string() => 3 });

        assert_eq!(before.get("a"), Some(&1));
        assert_eq!(before.len(), 1);
        assert_eq!(table.get("a"), Some(2));
    }

    #[test]
    fn test_concurrent_readers_see_whole_tables() {
        let table = Arc::new(SharedTable::new());
        let old: HashMap<String, u32> = (0..50).map(|i| (format!("k{}", i), 0)).collect();
        let new: HashMap<String, u32> = (0..50).map(|i| (format!("k{}", i), 1)).collect();
        table.replace(old.clone());

        let reader = {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let snap = table.snapshot();
                    let first = snap.values().next().copied();
                    assert!(snap.values().all(|v| Some(*v) == first), "mixed table observed");
                }
            })
        };
        for i in 0..200 {
            table.replace(if i % 2 == 0 { new.clone() } else { old.clone() });
        }

        reader.join().unwrap();
    }

    #[test]
    fn test_parse_template_pack() {
        let pack = r#"
            [user]:[
                query { user(id: ${id}) { name } }
            ]
            [ items ]:[ query { items { id } } ]
            [empty]:[   ]
        "#;

        let templates = parse_template_pack(pack);
        assert_eq!(
            templates,
            hashmap! {
                "user".to_string() => "query { user(id: ${id}) { name } }".to_string(),
                "items".to_string() => "query { items { id } }".to_string(),
            }
        );
    }

    #[test]
    fn test_template_registry_merge_pack() {
        let registry = TemplateRegistry::new();
        registry.merge(hashmap! { "old".to_string() => "query { old }".to_string() });

        let count = registry.merge_pack("[new]:[query { new }]");

        assert_eq!(count, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("new").as_deref(), Some("query { new }"));
    }

    #[test]
    fn test_script_registry_hashes_versions() {
        let registry = ScriptRegistry::new();
        registry.merge(hashmap! { "main".to_string() => "int n = 1;".to_string() });
        let first = registry.get("main").unwrap();

        registry.merge(hashmap! { "main".to_string() => "int n = 2;".to_string() });
        let second = registry.get("main").unwrap();

        assert_eq!(first.version_hash.len(), 64);
        assert_ne!(first.version_hash, second.version_hash);
        assert_eq!(second.source, "int n = 2;");
        assert_eq!(ScriptEntry::new("int n = 1;").version_hash, first.version_hash);
    }

    #[test]
    fn test_script_name_from_file() {
        assert_eq!(script_name_from_file("checkout.gqlp"), "checkout");
        assert_eq!(script_name_from_file("scripts/checkout.gqlp"), "checkout");
        assert_eq!(script_name_from_file("notes.txt"), "notes.txt");
        assert_eq!(script_name_from_file("plain"), "plain");
    }
}
