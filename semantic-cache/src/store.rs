//! Persistent document store.
//!
//! `CacheStore` owns the vector index, the slot table and the documents as
//! one value, so slot/key alignment is maintained in a single place. The slot
//! table maps every index slot to the key it embeds, or to `None` for a
//! tombstoned slot: the embedding still occupies the index but is never
//! searched or resolved. The key→slot direction is each document's
//! `index_id`.
//!
//! On disk the store is three files in one directory:
//!
//! - `metadata.json`: key → document, pretty JSON
//! - `faiss_index`: the binary vector index
//! - `food_names.bin`: the slot table
//!
//! `metadata.json` is written last and deleted first, so it is the commit
//! point: without it the other files are ignored. On load the slot table is
//! rebuilt from the documents' `index_id`s, and `food_names.bin` only settles
//! two documents claiming one slot, so a write interrupted before the
//! metadata rename still loads as the previous store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use snapchef_embeddings::{Embedding, FlatIndex, Neighbor};

use crate::document::UnifiedDocument;
use crate::error::{CacheError, Result, StorageError};

/// File name of the document map.
pub const METADATA_FILE: &str = "metadata.json";

/// File name of the vector index.
pub const INDEX_FILE: &str = "faiss_index";

/// File name of the slot table.
pub const FOOD_NAMES_FILE: &str = "food_names.bin";

/// Slot id → key, `None` for tombstones.
pub type SlotTable = Vec<Option<String>>;

/// The vector index and document map, kept in lock-step.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory the store persists into.
    root: PathBuf,

    /// Embeddings by slot.
    index: FlatIndex,

    /// Key owning each slot.
    slots: SlotTable,

    /// Documents by normalized key.
    documents: HashMap<String, UnifiedDocument>,
}

impl CacheStore {
    /// An empty store rooted at `root`.
    pub fn empty(root: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            root: root.into(),
            index: FlatIndex::new(dimension),
            slots: Vec::new(),
            documents: HashMap::new(),
        }
    }

    /// Load the store from `root`, starting empty when nothing usable is there.
    pub async fn load(root: impl Into<PathBuf>, dimension: usize) -> Self {
        let root = root.into();
        match Self::try_load(&root, dimension).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Starting with an empty cache, {}: {e}", root.display());
                Self::empty(root, dimension)
            }
        }
    }

    /// Load the store from `root`, reporting unreadable files.
    pub async fn try_load(root: &Path, dimension: usize) -> Result<Self> {
        let metadata_path = root.join(METADATA_FILE);
        if !metadata_path.exists() {
            debug!("No cache metadata at {}", root.display());
            return Ok(Self::empty(root, dimension));
        }

        let content = fs::read_to_string(&metadata_path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", metadata_path.display())))?;
        let documents: HashMap<String, UnifiedDocument> = serde_json::from_str(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", metadata_path.display())))?;

        let index = FlatIndex::load_or_new(&root.join(INDEX_FILE), dimension).await;

        let slots_path = root.join(FOOD_NAMES_FILE);
        let on_disk = match fs::read(&slots_path).await {
            Ok(bytes) => match bincode::deserialize::<SlotTable>(&bytes) {
                Ok(slots) => Some(slots),
                Err(e) => {
                    warn!("Ignoring unreadable slot table {}: {e}", slots_path.display());
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Slot table missing, rebuilding it from document slots");
                None
            }
            Err(e) => {
                warn!("Ignoring slot table {}: {e}", slots_path.display());
                None
            }
        };

        let store = Self::reconcile(root.to_path_buf(), index, on_disk, documents);
        info!(
            "Loaded cache with {} documents over {} slots",
            store.len(),
            store.vector_count()
        );
        Ok(store)
    }

    /// Derive the slot table from the documents.
    ///
    /// Each document claims the slot in its `index_id`; unclaimed slots are
    /// tombstones. When two documents claim one slot, the key `on_disk` names
    /// there keeps it. Empty documents and documents past the end of the
    /// index are dropped.
    fn reconcile(
        root: PathBuf,
        index: FlatIndex,
        on_disk: Option<SlotTable>,
        mut documents: HashMap<String, UnifiedDocument>,
    ) -> Self {
        let mut slots: SlotTable = vec![None; index.len()];

        let mut keys: Vec<String> = documents.keys().cloned().collect();
        keys.sort();
        for key in keys {
            let Some(doc) = documents.get(&key) else {
                continue;
            };
            let slot = doc.index_id;
            if doc.is_empty() {
                warn!("Dropping empty document '{key}'");
                documents.remove(&key);
                continue;
            }

            let Some(entry) = slots.get_mut(slot) else {
                warn!("Dropping document '{key}' past the end of the index (slot {slot})");
                documents.remove(&key);
                continue;
            };
            let recorded = on_disk
                .as_ref()
                .and_then(|table| table.get(slot))
                .is_some_and(|owner| owner.as_deref() == Some(key.as_str()));

            if entry.is_none() {
                *entry = Some(key);
            } else if recorded {
                if let Some(loser) = entry.replace(key) {
                    warn!("Dropping document '{loser}', slot {slot} is recorded for another key");
                    documents.remove(&loser);
                }
            } else {
                warn!("Dropping document '{key}', slot {slot} is already taken");
                documents.remove(&key);
            }
        }

        if on_disk.is_some_and(|table| table != slots) {
            warn!("Slot table disagrees with metadata, rebuilt from documents");
        }

        Self {
            root,
            index,
            slots,
            documents,
        }
    }

    /// Directory the store persists into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Embedding dimension of the index.
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of vectors in the index, tombstones included.
    pub fn vector_count(&self) -> usize {
        self.index.len()
    }

    /// Number of tombstoned slots.
    pub fn tombstones(&self) -> usize {
        self.slots.iter().filter(|entry| entry.is_none()).count()
    }

    /// The slot table, positionally aligned with the index.
    pub fn food_names(&self) -> &[Option<String>] {
        &self.slots
    }

    /// Get a document by key.
    pub fn get(&self, key: &str) -> Option<&UnifiedDocument> {
        self.documents.get(key)
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    /// All keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Live documents in slot order.
    pub fn all(&self) -> Vec<&UnifiedDocument> {
        self.slots
            .iter()
            .flatten()
            .filter_map(|key| self.documents.get(key))
            .collect()
    }

    /// Document owning `slot`, if the slot is live.
    pub fn resolve(&self, slot: usize) -> Option<&UnifiedDocument> {
        self.slots
            .get(slot)?
            .as_ref()
            .and_then(|key| self.documents.get(key))
    }

    /// Nearest live slots to `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let slots = &self.slots;
        self.index
            .search_filtered(query, k, |slot| slots.get(slot).is_some_and(Option::is_some))
            .map_err(CacheError::from)
    }

    /// Add a document under a new key, embedding it at the next slot.
    ///
    /// The document's `index_id` is set to the slot it lands in.
    pub fn append(
        &mut self,
        key: impl Into<String>,
        mut document: UnifiedDocument,
        embedding: Embedding,
    ) -> Result<usize> {
        let key = key.into();
        if self.documents.contains_key(&key) {
            return Err(CacheError::InvalidDocument(format!("key '{key}' already stored")));
        }
        if document.is_empty() {
            return Err(CacheError::InvalidDocument(format!("'{key}' is empty")));
        }

        let slot = self.index.add(embedding)?;
        document.index_id = slot;
        self.slots.push(Some(key.clone()));
        self.documents.insert(key, document);
        Ok(slot)
    }

    /// Overwrite the document stored under an existing key.
    ///
    /// The replacement must keep the key's slot.
    pub fn put(&mut self, key: &str, document: UnifiedDocument) -> Result<()> {
        let current = self
            .documents
            .get(key)
            .ok_or_else(|| CacheError::InvalidDocument(format!("key '{key}' not stored")))?;

        if document.index_id != current.index_id {
            return Err(CacheError::InvalidDocument(format!(
                "'{key}' must stay at slot {}, got {}",
                current.index_id, document.index_id
            )));
        }
        if document.is_empty() {
            return Err(CacheError::InvalidDocument(format!("'{key}' is empty")));
        }

        self.documents.insert(key.to_string(), document);
        Ok(())
    }

    /// Remove a document and tombstone its slot.
    pub fn remove(&mut self, key: &str) -> Option<UnifiedDocument> {
        let slot = self.documents.get(key)?.index_id;
        self.tombstone(slot)
    }

    /// Retire `slot`, dropping the document that owned it.
    ///
    /// The embedding stays in the index but is never searched or resolved.
    pub fn tombstone(&mut self, slot: usize) -> Option<UnifiedDocument> {
        let key = self.slots.get_mut(slot)?.take()?;
        self.documents.remove(&key)
    }

    /// Re-key the document owning `slot`, keeping its slot.
    pub fn rename_slot(&mut self, slot: usize, key: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.documents.contains_key(&key) {
            return Err(CacheError::InvalidDocument(format!("key '{key}' already stored")));
        }

        let Some(Some(old)) = self.slots.get(slot).cloned() else {
            return Err(CacheError::InvalidDocument(format!("slot {slot} is not live")));
        };
        self.slots[slot] = Some(key.clone());

        if let Some(document) = self.documents.remove(&old) {
            self.documents.insert(key, document);
        }
        Ok(())
    }

    /// Forget everything in memory.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.documents.clear();
    }

    /// Write all three files, `metadata.json` last.
    pub async fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", self.root.display())))?;

        let index_path = self.root.join(INDEX_FILE);
        self.index
            .save(&index_path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", index_path.display())))?;

        let slots = bincode::serialize(&self.slots)
            .map_err(|e| StorageError::WriteFile(format!("{FOOD_NAMES_FILE}: {e}")))?;
        write_atomic(&self.root.join(FOOD_NAMES_FILE), &slots).await?;

        let ordered: BTreeMap<&String, &UnifiedDocument> = self.documents.iter().collect();
        let metadata = serde_json::to_string_pretty(&ordered)?;
        write_atomic(&self.root.join(METADATA_FILE), metadata.as_bytes()).await?;

        debug!(
            "Saved cache with {} documents over {} slots",
            self.len(),
            self.vector_count()
        );
        Ok(())
    }

    /// Delete the persisted files under `root`, `metadata.json` first.
    ///
    /// Only failing to delete `metadata.json` is an error. Once it is gone the
    /// store is empty, so a leftover index or slot table is logged and left
    /// for the next persist to overwrite.
    pub async fn remove_files(root: &Path) -> Result<()> {
        let metadata_path = root.join(METADATA_FILE);
        match fs::remove_file(&metadata_path).await {
            Ok(()) => debug!("Deleted {}", metadata_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(
                    StorageError::DeleteFile(format!("{}: {e}", metadata_path.display())).into(),
                );
            }
        }

        for name in [INDEX_FILE, FOOD_NAMES_FILE] {
            let path = root.join(name);
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Leaving {} behind: {e}", path.display()),
            }
        }
        Ok(())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)
        .await
        .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;
    Ok(())
}
