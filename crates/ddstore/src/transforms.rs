//! 🔄 Transforms — records in, documents out 🎭
//!
//! 🎬 COLD OPEN — INT. TRANSLATION BOOTH — 2:47 AM
//!
//! On the left screen: a profile record, fresh from the profiler, snake_case and proud.
//! On the right screen: the document format the index has expected since before
//! anyone on the team can remember. camelCase. Stringly-typed entity lists.
//! A trailing space on every text blob. In between: this module.
//!
//! ## Knowledge Graph 🧠
//! - Depends on: `common::{TextRecord, ProfileRecord}`, `mappings::IndexKind`
//! - Used by: `stores::*` (every write goes through a [`Document`])
//! - Pattern: borrowed `Serialize` views over the records. No cloning of sample values
//!   beyond the one unavoidable join.
//!
//! ```text
//!   TextRecord ──▶ TextDocument ────▶ text index     (store-generated _id)
//!   ProfileRecord ─▶ ProfileDocument ─▶ profile index  (_id = "{id}")
//! ```
//!
//! 🦆

use anyhow::{Context, Result};
use serde::Serialize;

use crate::mappings::IndexKind;

pub mod profile;
pub mod text;

pub use profile::ProfileDocument;
pub use text::TextDocument;

/// 📤 A document ready to be written to one of the two indices.
///
/// # Contract 📜
/// - `index_kind` says which schema the document belongs to. The store maps it to a
///   configured index name.
/// - `document_id` returns `Some` when the caller owns the id (overwrite semantics),
///   `None` when the store should generate one (append semantics).
/// - `to_body` serializes the exact JSON the store will receive.
pub trait Document: Serialize {
    fn index_kind(&self) -> IndexKind;

    fn document_id(&self) -> Option<String>;

    /// 📦 Serialize the document body. Fails only if serde does, which for these
    /// field types means "never", but the `Result` keeps the cause if it ever does.
    fn to_body(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context(format!(
            "💀 Failed to serialize a {} document. The JSON that describes a column refused to become JSON.",
            self.index_kind()
        ))
    }
}
