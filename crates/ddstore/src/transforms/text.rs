//! 📝 Text documents — a column's sample values, flattened into one searchable blob.
//!
//! Wire shape:
//!
//! ```text
//! {"id":"42","sourceName":"employees.csv","columnName":"city","text":"boston oslo "}
//! ```
//!
//! ⚠️ `id` is a *string* here even though the mapping says `integer`. The cluster
//! coerces it. Existing documents were written that way, so we keep writing them that way.

use serde::Serialize;

use super::Document;
use crate::common::{TextRecord, concat_values};
use crate::mappings::IndexKind;

/// 📝 The text-index document. Borrows names from the caller, owns the joined blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocument<'a> {
    pub id: String,
    pub source_name: &'a str,
    pub column_name: &'a str,
    pub text: String,
}

impl<'a> TextDocument<'a> {
    pub fn new<S: AsRef<str>>(
        id: i32,
        source_name: &'a str,
        column_name: &'a str,
        values: &[S],
    ) -> Self {
        Self {
            id: id.to_string(),
            source_name,
            column_name,
            text: concat_values(values),
        }
    }
}

impl<'a> From<&'a TextRecord> for TextDocument<'a> {
    fn from(record: &'a TextRecord) -> Self {
        Self::new(
            record.id,
            &record.source_name,
            &record.column_name,
            record.values.as_slice(),
        )
    }
}

impl Document for TextDocument<'_> {
    fn index_kind(&self) -> IndexKind {
        IndexKind::Text
    }

    /// 🎲 Text documents are append-only. The cluster picks the id.
    fn document_id(&self) -> Option<String> {
        None
    }
}
