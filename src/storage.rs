//! Entries store - the user-configured launcher content
//!
//! The store keeps three record lists in one JSON file under
//! `~/.local/state/paperlane/entries.json`: placement records (`entries`),
//! launchable payloads (`launches`) and folder payloads (`folders`). A
//! placement points at exactly one payload and at an optional parent folder;
//! sibling order is the persisted `order_index`, preserved exactly on load.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apps::DesktopEntry;
use crate::config::state_dir;
use crate::model::{Entry, EntryId, EntryKind};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed entries file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("entry {entry} references missing launch {launch}")]
    MissingLaunch { entry: i64, launch: i64 },

    #[error("entry {entry} references missing folder {folder}")]
    MissingFolder { entry: i64, folder: i64 },

    #[error("entry {entry} is neither a launch nor a folder")]
    EmptyEntry { entry: i64 },

    #[error("folder {folder} contains itself")]
    FolderCycle { folder: i64 },
}

/// Placement of one entry within a sibling list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: i64,
    pub order_index: i32,
    #[serde(default)]
    pub launch_id: Option<i64>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    /// None places the entry in the root list
    #[serde(default)]
    pub parent_folder_id: Option<i64>,
}

/// A launchable payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub id: i64,
    pub name: String,
    /// Command line, resolved from the desktop entry at store time
    pub exec: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub use_icon_color: bool,
}

/// A folder payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EntriesDocument {
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
    #[serde(default)]
    pub launches: Vec<LaunchRecord>,
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
}

/// The JSON-file backed entries store
pub struct EntriesStore {
    path: PathBuf,
    doc: EntriesDocument,
}

impl EntriesStore {
    pub fn default_path() -> PathBuf {
        state_dir().join("entries.json")
    }

    /// Open the store, starting empty when the file is missing or broken
    pub fn open(path: PathBuf) -> Self {
        let doc = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<EntriesDocument>(&contents) {
                Ok(doc) => {
                    tracing::info!(
                        "Loaded {} entries from {:?}",
                        doc.entries.len(),
                        path
                    );
                    doc
                }
                Err(e) => {
                    tracing::error!("Failed to parse entries.json: {:?}", e);
                    EntriesDocument::default()
                }
            },
            Err(_) => EntriesDocument::default(),
        };
        Self { path, doc }
    }

    pub fn is_empty(&self) -> bool {
        self.doc.entries.is_empty()
    }

    /// Save the document
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.doc) {
            if let Err(e) = std::fs::write(&self.path, json) {
                tracing::warn!("Failed to save entries: {:?}", e);
            }
        }
    }

    /// Root sibling list, in persisted order
    pub fn load_root_content(&self) -> Result<Vec<Entry>, StorageError> {
        let mut visiting = Vec::new();
        self.entries_for_parent(None, &mut visiting)
    }

    /// Children of one folder, in persisted order
    pub fn load_sub_entries(&self, folder_id: i64) -> Result<Vec<Entry>, StorageError> {
        let mut visiting = vec![folder_id];
        self.entries_for_parent(Some(folder_id), &mut visiting)
    }

    fn entries_for_parent(
        &self,
        parent: Option<i64>,
        visiting: &mut Vec<i64>,
    ) -> Result<Vec<Entry>, StorageError> {
        let mut records: Vec<&EntryRecord> = self
            .doc
            .entries
            .iter()
            .filter(|r| r.parent_folder_id == parent)
            .collect();
        // Stable sort keeps insertion order for equal order_index values
        records.sort_by_key(|r| r.order_index);

        let mut result = Vec::with_capacity(records.len());
        for record in records {
            result.push(self.assemble(record, visiting)?);
        }
        Ok(result)
    }

    fn assemble(
        &self,
        record: &EntryRecord,
        visiting: &mut Vec<i64>,
    ) -> Result<Entry, StorageError> {
        if let Some(launch_id) = record.launch_id {
            let launch = self
                .doc
                .launches
                .iter()
                .find(|l| l.id == launch_id)
                .ok_or(StorageError::MissingLaunch {
                    entry: record.id,
                    launch: launch_id,
                })?;
            return Ok(Entry {
                id: EntryId(record.id),
                name: launch.name.clone(),
                icon: launch.icon.clone(),
                use_icon_color: launch.use_icon_color,
                kind: EntryKind::Launch {
                    target: launch.exec.clone(),
                },
            });
        }

        if let Some(folder_id) = record.folder_id {
            let folder = self
                .doc
                .folders
                .iter()
                .find(|f| f.id == folder_id)
                .ok_or(StorageError::MissingFolder {
                    entry: record.id,
                    folder: folder_id,
                })?;
            if visiting.contains(&folder_id) {
                return Err(StorageError::FolderCycle { folder: folder_id });
            }
            visiting.push(folder_id);
            let children = self.entries_for_parent(Some(folder_id), visiting)?;
            visiting.pop();
            return Ok(Entry {
                id: EntryId(record.id),
                name: folder.name.clone(),
                icon: folder.icon.clone(),
                use_icon_color: false,
                kind: EntryKind::Folder { children },
            });
        }

        Err(StorageError::EmptyEntry { entry: record.id })
    }

    /// First-run seeding: turn the first scanned applications into root
    /// entries so a fresh install shows something useful.
    pub fn seed_from_apps(&mut self, apps: &[DesktopEntry], count: usize) {
        if !self.is_empty() {
            return;
        }
        for (i, app) in apps.iter().take(count).enumerate() {
            let id = i as i64 + 1;
            self.doc.launches.push(LaunchRecord {
                id,
                name: app.name.clone(),
                exec: app.exec.clone(),
                icon: app.icon.clone(),
                use_icon_color: true,
            });
            self.doc.entries.push(EntryRecord {
                id,
                order_index: i as i32,
                launch_id: Some(id),
                folder_id: None,
                parent_folder_id: None,
            });
        }
        tracing::info!("Seeded {} entries from installed applications", self.doc.entries.len());
        self.save();
    }
}
