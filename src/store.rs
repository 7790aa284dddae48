use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StoreError;
use crate::menu::{MenuItem, Snapshot};

/// The last-known menu, kept as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load the previous snapshot.
    ///
    /// A missing file is the first run and yields an empty snapshot. Any other
    /// read or parse failure is an error, never a silent reset.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no previous snapshot, treating as first run");
                return Ok(Snapshot::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let items: Vec<MenuItem> =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), items = items.len(), "loaded snapshot");
        Ok(Snapshot::from_items(items))
    }

    /// Replace the stored snapshot: write a sibling temp file, then rename it
    /// over the target so readers only ever see a complete file.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let content = serde_json::to_string_pretty(snapshot).map_err(StoreError::Serialize)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;

        info!(path = %self.path.display(), items = snapshot.len(), "saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        Snapshot::from_items(vec![
            MenuItem {
                name: "Margherita".into(),
                description: Some("Tomato, mozzarella".into()),
                image_url: Some("https://cdn.example.com/m-xl.jpg".into()),
            },
            MenuItem::named("Élan Bianca"),
            MenuItem::named("'Nduja"),
        ])
    }

    #[test]
    fn missing_file_is_first_run() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data.json"));
        let snapshot = sample();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn file_is_a_json_array_with_all_fields() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data.json"));
        store.save(&Snapshot::from_items(vec![MenuItem::named("Funghi")])).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!([{"name": "Funghi", "description": null, "imageUrl": null}])
        );
    }

    #[test]
    fn reads_files_written_by_older_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(
            &path,
            r#"[
  {"name": "Pepperoni", "description": "Cup & char", "imageUrl": null},
  {"name": "Margherita", "description": null, "imageUrl": "https://x/y.jpg"}
]"#,
        )
        .unwrap();
        let loaded = SnapshotStore::new(&path).load().unwrap();
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["Margherita", "Pepperoni"]);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "[{\"name\": \"Marg").unwrap();
        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));

        fs::write(&path, r#"{"name": "not an array"}"#).unwrap();
        assert!(SnapshotStore::new(&path).load().is_err());
    }

    #[test]
    fn save_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("state").join("data.json"));
        store.save(&sample()).unwrap();

        let leftovers = fs::read_dir(dir.path().join("state"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data.json"));
        let original = sample();
        store.save(&original).unwrap();

        // a directory squatting on the temp path makes the write fail mid-save
        fs::create_dir(dir.path().join("data.json.tmp")).unwrap();
        let replacement = Snapshot::from_items(vec![MenuItem::named("Only")]);
        assert!(store.save(&replacement).is_err());

        assert_eq!(store.load().unwrap(), original);
    }

    #[test]
    fn overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data.json"));
        store.save(&sample()).unwrap();
        let next = Snapshot::from_items(vec![MenuItem::named("Funghi")]);
        store.save(&next).unwrap();
        assert_eq!(store.load().unwrap(), next);
    }
}
