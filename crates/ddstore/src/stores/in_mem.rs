//! # Previously, on ddstore...
//!
//! 🎬 The cluster was down. Or it was never up. Or somebody just wanted to run
//! the profiler on a laptop on a plane. Someone had to pretend to be Elasticsearch.
//! Someone had to keep indices in a `HashMap` and act like it was fine.
//!
//! That someone was this module.
//!
//! [`InMemoryStore`] follows the same rules as the real thing: schemas before
//! documents, generated ids for text, caller ids (and overwrites) for profiles,
//! and a [`StoreNotReady`] for anyone who writes too early. It is `Clone`, and
//! clones share state, so tests can hand one copy to the code under test and
//! inspect the other.
//!
//! 🦆
//!
//! ⚠️ Documents survive `tear_down_store`, same as in a real cluster. Closing the
//! connection doesn't delete the data. It just stops you from adding more.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{PreparedDocument, Store, StoreNotReady, WriteOutcome, WriteResult};
use crate::mappings::{IndexKind, PROFILE_INDEX, TEXT_INDEX};

/// 📦 One pretend index: its mapping and its documents, ordered by id for stable test output.
#[derive(Debug, Clone, Default)]
struct InMemoryIndex {
    mapping: Option<Value>,
    documents: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    ready: bool,
    indices: HashMap<IndexKind, InMemoryIndex>,
    next_generated_id: u64,
}

// 📛 The pretend store always uses the default index names.
fn index_name(kind: IndexKind) -> &'static str {
    match kind {
        IndexKind::Text => TEXT_INDEX,
        IndexKind::Profile => PROFILE_INDEX,
    }
}

/// 🧠 A store that never forgets, at least until the process exits.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📊 Number of documents currently in the index for `kind`.
    pub async fn len(&self, kind: IndexKind) -> usize {
        let state = self.state.lock().await;
        state
            .indices
            .get(&kind)
            .map(|index| index.documents.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, kind: IndexKind) -> bool {
        self.len(kind).await == 0
    }

    /// 🔍 Fetch one document by id, the way `GET /{index}/_doc/{id}` would.
    pub async fn document(&self, kind: IndexKind, document_id: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(&kind)
            .and_then(|index| index.documents.get(document_id).cloned())
    }

    /// 📋 Every document in the index for `kind`, ordered by id.
    pub async fn documents(&self, kind: IndexKind) -> Vec<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(&kind)
            .map(|index| index.documents.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 🗺️ The mapping applied to the index for `kind`, if `init_store` got that far.
    pub async fn mapping(&self, kind: IndexKind) -> Option<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(&kind)
            .and_then(|index| index.mapping.clone())
    }

    pub async fn is_ready(&self) -> bool {
        self.state.lock().await.ready
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn init_store(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        for kind in [IndexKind::Text, IndexKind::Profile] {
            let index = state.indices.entry(kind).or_default();
            index.mapping = Some(kind.mapping());
        }
        state.ready = true;
        debug!("🧠 in-memory store ready — two indices, zero network, infinite vibes");
        Ok(())
    }

    async fn write(&self, document: PreparedDocument) -> Result<WriteOutcome> {
        let source: Value = serde_json::from_slice(&document.body)
            .context("💀 The in-memory store was handed a document that is not JSON")?;

        let mut state = self.state.lock().await;
        if !state.ready {
            return Err(anyhow::Error::new(StoreNotReady { operation: "write" }));
        }

        let document_id = match document.document_id {
            Some(id) => id,
            None => {
                state.next_generated_id += 1;
                format!("mem-{}", state.next_generated_id)
            }
        };

        let index = state.indices.entry(document.kind).or_default();
        let previous = index.documents.insert(document_id.clone(), source);
        let result = match previous {
            Some(_) => WriteResult::Updated,
            None => WriteResult::Created,
        };

        Ok(WriteOutcome {
            index: index_name(document.kind).to_string(),
            document_id,
            result,
        })
    }

    async fn tear_down_store(&mut self) -> Result<()> {
        self.state.lock().await.ready = false;
        Ok(())
    }
}
