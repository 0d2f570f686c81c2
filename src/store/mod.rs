//! Inventory store collaborators.
//!
//! The store is a document database seen through one operation: fetch every
//! document of a named collection or sub-collection. All I/O lives here and in
//! the [`loader`]; the tracer only ever sees the assembled snapshot.

pub mod loader;
pub mod memory;
pub mod toon;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use toon::ToonStore;

pub const ODFS: &str = "odfs";
pub const FIBERS: &str = "fibers";
pub const MUFLAS: &str = "muflas";
pub const CAJAS_NAP: &str = "cajas_nap";
pub const SPLITTERS: &str = "splitters";

pub const POSITIONS: &str = "positions";
pub const SPLICES: &str = "splices";
pub const PORTS: &str = "ports";
pub const OUTPUTS: &str = "outputs";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cannot decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("read timed out after {0:?}")]
    Timeout(Duration),
}

/// `odfs` or `odfs/<id>/positions`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn root(collection: &str) -> Self {
        Self { segments: vec![collection.to_string()] }
    }

    pub fn sub(collection: &str, parent_id: &str, sub_collection: &str) -> Self {
        Self {
            segments: vec![collection.to_string(), parent_id.to_string(), sub_collection.to_string()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A raw document: its id plus the field map as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self { id: id.into(), body }
    }
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Every document in `path`. A collection that was never written is empty, not an error.
    async fn fetch(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError>;
}
