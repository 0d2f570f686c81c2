// directory of .toon files, one per collection
//
// <root>/odfs.toon
// <root>/odfs/<odf id>/positions.toon
//
// Each file is a TOON object with a `documents` list; every entry carries its `id`.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::store::{CollectionPath, Document, InventoryStore, StoreError};

#[derive(Debug, Clone)]
pub struct ToonStore {
    root: PathBuf,
}

impl ToonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, path: &CollectionPath) -> PathBuf {
        let mut file = self.root.clone();
        for segment in path.segments() {
            file.push(segment);
        }
        file.set_extension("toon");
        file
    }

    /// Replaces the whole collection file.
    pub async fn write(&self, path: &CollectionPath, docs: &[Document]) -> Result<(), StoreError> {
        let entries: Vec<Value> = docs
            .iter()
            .map(|d| {
                let mut body = d.body.clone();
                if let Value::Object(map) = &mut body {
                    map.insert("id".to_string(), Value::String(d.id.clone()));
                }
                body
            })
            .collect();
        let text = toon_format::encode_default(&json!({ "documents": entries }))
            .map_err(|e| StoreError::Decode { path: path.to_string(), message: e.to_string() })?;

        let file = self.file_for(path);
        if let Some(dir) = file.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&file, text).await?;
        Ok(())
    }
}

fn decode_collection(path: &CollectionPath, text: &str) -> Result<Vec<Document>, StoreError> {
    let bad = |message: String| StoreError::Decode { path: path.to_string(), message };

    let value: Value = toon_format::decode_default(text).map_err(|e| bad(e.to_string()))?;
    let entries = match value.get("documents") {
        Some(Value::Array(entries)) => entries.clone(),
        Some(_) => return Err(bad("`documents` is not a list".to_string())),
        None => Vec::new(),
    };

    entries
        .into_iter()
        .map(|body| {
            let id = match body.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(bad("document without an id".to_string())),
            };
            Ok(Document { id, body })
        })
        .collect()
}

#[async_trait]
impl InventoryStore for ToonStore {
    async fn fetch(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(StoreError::Unreachable(format!("{} does not exist", self.root.display())));
        }

        let file = self.file_for(path);
        let text = match tokio::fs::read_to_string(&file).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%path, "collection file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        decode_collection(path, &text)
    }
}
