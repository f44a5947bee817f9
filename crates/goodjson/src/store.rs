//! Storage collaborator seam.
//!
//! The codec fetches referenced documents and persists auto-saved ones
//! through [`DocumentStore`]. It never interprets storage errors; they are
//! returned to the caller unchanged.

use std::sync::{RwLock, RwLockReadGuard};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::StoreError;
use crate::model::{Document, ObjectId};

/// Lookup-by-identifier and persist operations.
pub trait DocumentStore {
    /// Looks up a document. `Ok(None)` means it does not exist.
    fn get(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError>;

    /// Saves a document, assigning an id if it has none. Returns the id.
    fn persist(&self, document: Document) -> Result<ObjectId, StoreError>;

    /// Like [`get`](Self::get), but a missing document is an error.
    fn fetch(&self, collection: &str, id: &ObjectId) -> Result<Document, StoreError> {
        self.get(collection, id)?.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: *id,
        })
    }

    fn exists(&self, collection: &str, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.get(collection, id)?.is_some())
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id)
    }

    fn persist(&self, document: Document) -> Result<ObjectId, StoreError> {
        (**self).persist(document)
    }
}

/// In-process store keyed by `(collection, id)`.
///
/// Used by tests and the bench binary; safe to share across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<DocumentMap>,
}

type DocumentMap = FxHashMap<(String, ObjectId), Document>;

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all collections.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of stored documents in one collection.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.read()?.keys().filter(|(c, _)| c == collection).count())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DocumentMap>, StoreError> {
        self.documents.read().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let docs = self.read()?;
        Ok(docs.get(&(collection.to_string(), *id)).cloned())
    }

    fn persist(&self, mut document: Document) -> Result<ObjectId, StoreError> {
        let id = match document.id() {
            Some(id) => id,
            None => {
                let id = ObjectId::new();
                document.set_id(id);
                id
            }
        };
        trace!(collection = %document.collection(), id = %id, "persisting document");
        let mut docs = self
            .documents
            .write()
            .map_err(|_| poisoned())?;
        docs.insert((document.collection().to_string(), id), document);
        Ok(id)
    }
}
