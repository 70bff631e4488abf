//! 📊 Profile documents — one per column, keyed by the column's id.
//!
//! Wire shape (abridged):
//!
//! ```text
//! {"id":7,"sourceName":"...","columnName":"...","dataType":"N","totalValues":1200,
//!  "uniqueValues":640,"entities":"[PERSON, LOCATION]","minValue":1.5, ... ,"iqr":21000}
//! ```
//!
//! 🐛 Historical note: the previous writer stuffed the entity list into `minValue` too.
//! The mapping says `float`, so that only ever worked when the list happened to be
//! unparseable-but-ignored. We write the actual minimum. Indices built by the old writer
//! will have garbage in `minValue`; reprofiling the column overwrites it.

use serde::Serialize;

use super::Document;
use crate::common::ProfileRecord;
use crate::mappings::IndexKind;

/// 📊 The profile-index document, borrowed from a [`ProfileRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument<'a> {
    pub id: i32,
    pub source_name: &'a str,
    pub column_name: &'a str,
    pub data_type: &'a str,
    pub total_values: i32,
    pub unique_values: i32,
    pub entities: String,
    pub min_value: f32,
    pub max_value: f32,
    pub avg_value: f32,
    pub median: i64,
    pub iqr: i64,
}

impl<'a> From<&'a ProfileRecord> for ProfileDocument<'a> {
    fn from(record: &'a ProfileRecord) -> Self {
        Self {
            id: record.id,
            source_name: &record.source_name,
            column_name: &record.column_name,
            data_type: &record.data_type,
            total_values: record.total_values,
            unique_values: record.unique_values,
            entities: record.entities_repr(),
            min_value: record.min_value,
            max_value: record.max_value,
            avg_value: record.avg_value,
            median: record.median,
            iqr: record.iqr,
        }
    }
}

impl Document for ProfileDocument<'_> {
    fn index_kind(&self) -> IndexKind {
        IndexKind::Profile
    }

    /// 🆔 Same column, same id, same document. Reprofiling overwrites.
    fn document_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}
