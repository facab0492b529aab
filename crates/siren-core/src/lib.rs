//! # siren-core
//!
//! Core primitives for the Siren emergency-services portal:
//!
//! - **Errors**: the shared taxonomy every component reports through
//! - **Identifiers**: strongly-typed ULID newtypes
//! - **Service kinds**: the three independent partitions (ambulance, fire, crime)
//! - **Storage**: the injected document backend with conditional writes
//! - **Observability**: tracing initialization and span constructors
//!
//! This crate carries no domain policy. The request lifecycle lives in
//! `siren-dispatch`; the HTTP surface in `siren-api`.

pub mod error;
pub mod id;
pub mod keys;
pub mod observability;
pub mod service;
pub mod storage;

pub use error::{Error, Result};
pub use id::{AccountId, RequestId};
pub use service::ServiceKind;

/// Commonly used items, re-exported for convenience.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{AccountId, RequestId};
    pub use crate::service::ServiceKind;
    pub use crate::storage::{
        DocumentBackend, DocumentMeta, MemoryBackend, VersionedDocument, WritePrecondition,
        WriteResult,
    };
}
