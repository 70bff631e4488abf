//! 🔌 Stores — where documents actually leave the building.
//!
//! 🗃️ A store takes finished records, turns them into documents, and writes them into
//! an index. It also declares the two index schemas once, before anybody writes anything.
//! That's the whole job. No caching, no retries, no cluster babysitting.
//!
//! 🎭 This module is the casting agency. Need a real Elasticsearch cluster? Got it.
//! Need a pretend one living in RAM for tests and dry runs? Got that too.
//!
//! 🧠 Knowledge graph:
//! - [`Store`]: the four-operation contract the rest of the profiler depends on.
//! - [`StoreBackend`]: enum dispatch over the concrete stores, built from `StoreConfig`.
//! - [`WriteOutcome`]: what the store said about a write. Success is never assumed.
//! - [`StoreNotReady`]: the defined error for writing before `init_store` or after teardown.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::StoreConfig;
use crate::common::ProfileRecord;
use crate::mappings::IndexKind;
use crate::transforms::{Document, ProfileDocument, TextDocument};

pub mod common_config;
pub mod elasticsearch;
pub mod in_mem;

pub use common_config::CommonStoreConfig;
pub use elasticsearch::{ElasticsearchStore, ElasticsearchStoreConfig};
pub use in_mem::InMemoryStore;

// ===== Outcomes and errors =====

/// ✅ How the store reported a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Created,
    Updated,
    /// Anything else the store chose to say (`noop`, future vocabulary, ...).
    Other(String),
}

impl WriteResult {
    pub fn from_wire(result: &str) -> Self {
        match result {
            "created" => WriteResult::Created,
            "updated" => WriteResult::Updated,
            other => WriteResult::Other(other.to_string()),
        }
    }
}

/// 📬 The receipt for one document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The concrete index the document landed in.
    pub index: String,
    /// The id the document lives under. Store-generated for text documents.
    pub document_id: String,
    pub result: WriteResult,
}

/// 🚧 A store operation was attempted before `init_store` succeeded (or after teardown).
///
/// Carried inside `anyhow::Error`; callers that care can `downcast_ref::<StoreNotReady>()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreNotReady {
    pub operation: &'static str,
}

impl std::fmt::Display for StoreNotReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "store is not initialized: '{}' was called before init_store() completed (or after tear_down_store())",
            self.operation
        )
    }
}

impl std::error::Error for StoreNotReady {}

/// 📦 A document already serialized and addressed, ready for any store to write.
///
/// Built synchronously from a [`Document`] so the write future holds owned bytes
/// instead of borrows of the caller's record.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub kind: IndexKind,
    pub document_id: Option<String>,
    pub body: Vec<u8>,
}

impl PreparedDocument {
    pub fn prepare<D: Document>(document: &D) -> Result<Self> {
        Ok(Self {
            kind: document.index_kind(),
            document_id: document.document_id(),
            body: document.to_body()?,
        })
    }
}

// ===== Store trait and backend enum =====

/// 🗃️ The store contract.
///
/// # Contract
/// - `init_store` ensures both indices exist and carry their mappings. Idempotent.
///   Nothing may be written until it has returned `Ok`.
/// - `index_data` appends a text document; `store_document` upserts a profile document
///   under the record's id.
/// - Writes take `&self` so callers may run them concurrently. Lifecycle calls take
///   `&mut self`, so the borrow checker refuses a teardown while writes are in flight.
/// - `tear_down_store` releases the connection. Calling it twice is harmless.
#[async_trait]
pub trait Store: std::fmt::Debug + Send + Sync {
    /// 🏗️ Ensure indices and mappings exist. Opens the connection.
    async fn init_store(&mut self) -> Result<()>;

    /// 📤 Write one prepared document. The building block under both write operations.
    async fn write(&self, document: PreparedDocument) -> Result<WriteOutcome>;

    /// 🗑️ Release the connection and forget it.
    async fn tear_down_store(&mut self) -> Result<()>;

    /// 📝 Join `values` into a text blob and append it to the text index.
    async fn index_data(
        &self,
        id: i32,
        source_name: &str,
        column_name: &str,
        values: &[String],
    ) -> Result<WriteOutcome> {
        let document = TextDocument::new(id, source_name, column_name, values);
        let prepared = PreparedDocument::prepare(&document)?;
        self.write(prepared).await
    }

    /// 📊 Write a profile document under the record's own id. Same id overwrites.
    async fn store_document(&self, profile: &ProfileRecord) -> Result<WriteOutcome> {
        let prepared = PreparedDocument::prepare(&ProfileDocument::from(profile))?;
        self.write(prepared).await
    }
}

/// 🎭 The many faces of a Store.
///
/// Each variant wraps a concrete store. The enum dispatches via `impl Store for StoreBackend`,
/// so callers never need to know whether their documents land in a cluster or in a `HashMap`.
#[derive(Debug)]
pub enum StoreBackend {
    Elasticsearch(ElasticsearchStore),
    InMemory(InMemoryStore),
}

impl StoreBackend {
    /// 🚀 Build the store named by the config. No I/O happens until `init_store`.
    pub fn from_config(config: StoreConfig) -> Self {
        match config {
            StoreConfig::Elasticsearch(es_config) => {
                StoreBackend::Elasticsearch(ElasticsearchStore::new(es_config))
            }
            StoreConfig::InMemory => StoreBackend::InMemory(InMemoryStore::new()),
        }
    }
}

#[async_trait]
impl Store for StoreBackend {
    async fn init_store(&mut self) -> Result<()> {
        match self {
            StoreBackend::Elasticsearch(store) => store.init_store().await,
            StoreBackend::InMemory(store) => store.init_store().await,
        }
    }

    async fn write(&self, document: PreparedDocument) -> Result<WriteOutcome> {
        match self {
            StoreBackend::Elasticsearch(store) => store.write(document).await,
            StoreBackend::InMemory(store) => store.write(document).await,
        }
    }

    async fn tear_down_store(&mut self) -> Result<()> {
        match self {
            StoreBackend::Elasticsearch(store) => store.tear_down_store().await,
            StoreBackend::InMemory(store) => store.tear_down_store().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_wire_vocabulary_is_understood() {
        assert_eq!(WriteResult::from_wire("created"), WriteResult::Created);
        assert_eq!(WriteResult::from_wire("updated"), WriteResult::Updated);
        assert_eq!(
            WriteResult::from_wire("noop"),
            WriteResult::Other("noop".to_string())
        );
    }

    #[test]
    fn the_one_where_the_config_picks_the_backend() {
        let backend = StoreBackend::from_config(StoreConfig::InMemory);
        assert!(matches!(backend, StoreBackend::InMemory(_)));
    }

    #[test]
    fn the_one_where_not_ready_says_what_was_attempted() {
        let err = anyhow::Error::new(StoreNotReady {
            operation: "store_document",
        });
        assert!(err.to_string().contains("store_document"));
        assert!(err.downcast_ref::<StoreNotReady>().is_some());
    }
}
