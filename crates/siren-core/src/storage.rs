//! Document backend abstraction.
//!
//! The portal originally leaned on a hosted realtime database as an ambient
//! singleton. Here the backend is an explicitly constructed object injected
//! into every component that needs it (request store, guest counter, account
//! directory), with its lifecycle owned by the server entrypoint.
//!
//! The contract is deliberately small:
//! - Conditional writes with preconditions (the counter and all status
//!   transitions are compare-and-swap, never read-then-write)
//! - Version tokens are opaque strings so a hosted backend can map them to
//!   whatever its own revision scheme is
//! - Listing returns metadata only; callers fetch the documents they want

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// Precondition for conditional writes (CAS operations).
#[derive(Debug, Clone)]
pub enum WritePrecondition {
    /// Write only if the document does not exist.
    DoesNotExist,
    /// Write only if the document's version matches the given token.
    MatchesVersion(String),
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
#[derive(Debug, Clone)]
pub enum WriteResult {
    /// Write succeeded, returns the new version token.
    Success {
        /// The new version token after the write.
        version: String,
    },
    /// Precondition failed, returns the current version token.
    PreconditionFailed {
        /// The version that caused the precondition to fail.
        current_version: String,
    },
}

impl WriteResult {
    /// Returns true when the write was applied.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Metadata about a stored document.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    /// Document key.
    pub key: String,
    /// Document size in bytes.
    pub size: u64,
    /// Version token for CAS operations.
    pub version: String,
    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A document fetched together with its version token.
#[derive(Debug, Clone)]
pub struct VersionedDocument {
    /// Raw document bytes.
    pub data: Bytes,
    /// Version token observed at read time.
    pub version: String,
}

/// Backend trait for the shared document collection.
///
/// All backends (hosted realtime database, memory) implement this trait.
/// The backend is independently concurrent: two callers may race on the same
/// key, and only the preconditions make read-modify-write sequences safe.
#[async_trait]
pub trait DocumentBackend: Send + Sync + 'static {
    /// Reads a document together with its current version token.
    ///
    /// Returns `Error::NotFound` if the document doesn't exist.
    async fn get(&self, key: &str) -> Result<VersionedDocument>;

    /// Writes with an optional precondition.
    ///
    /// Returns `WriteResult::PreconditionFailed` if the precondition is not
    /// met. Precondition failure is a normal result, never an error.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult>;

    /// Deletes a document. Succeeds even if it doesn't exist (idempotent).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists documents with the given prefix.
    ///
    /// **Ordering**: Results come back in arbitrary order. Callers requiring
    /// deterministic order sort the fetched documents themselves.
    async fn list(&self, prefix: &str) -> Result<Vec<DocumentMeta>>;

    /// Gets document metadata without reading content.
    ///
    /// Returns `None` if the document doesn't exist.
    async fn head(&self, key: &str) -> Result<Option<DocumentMeta>>;
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory document backend.
///
/// Thread-safe via `RwLock`. Used for tests and debug deployments. Uses
/// numeric versions internally (stored as strings) to simulate the version
/// tokens a hosted backend would hand out.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Arc<RwLock<HashMap<String, StoredDocument>>>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Bytes,
    version: i64,
    last_modified: DateTime<Utc>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn meta_of(key: &str, doc: &StoredDocument) -> DocumentMeta {
    DocumentMeta {
        key: key.to_string(),
        size: doc.data.len() as u64,
        version: doc.version.to_string(),
        last_modified: Some(doc.last_modified),
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<VersionedDocument> {
        let documents = self.documents.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        documents
            .get(key)
            .map(|doc| VersionedDocument {
                data: doc.data.clone(),
                version: doc.version.to_string(),
            })
            .ok_or_else(|| Error::not_found("document", key))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> Result<WriteResult> {
        let mut documents = self.documents.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        let current = documents.get(key);

        match precondition {
            WritePrecondition::DoesNotExist => {
                if let Some(doc) = current {
                    return Ok(WriteResult::PreconditionFailed {
                        current_version: doc.version.to_string(),
                    });
                }
            }
            WritePrecondition::MatchesVersion(expected) => {
                let expected_num: i64 = expected.parse().unwrap_or(-1);
                match current {
                    Some(doc) if doc.version != expected_num => {
                        return Ok(WriteResult::PreconditionFailed {
                            current_version: doc.version.to_string(),
                        });
                    }
                    None => {
                        return Ok(WriteResult::PreconditionFailed {
                            current_version: "0".to_string(),
                        });
                    }
                    _ => {}
                }
            }
            WritePrecondition::None => {}
        }

        let new_version = current.map_or(1, |doc| doc.version + 1);
        documents.insert(
            key.to_string(),
            StoredDocument {
                data,
                version: new_version,
                last_modified: Utc::now(),
            },
        );
        drop(documents);

        Ok(WriteResult::Success {
            version: new_version.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.documents
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<DocumentMeta>> {
        let documents = self.documents.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(documents
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, doc)| meta_of(key, doc))
            .collect())
    }

    async fn head(&self, key: &str) -> Result<Option<DocumentMeta>> {
        let documents = self.documents.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(documents.get(key).map(|doc| meta_of(key, doc)))
    }
}
