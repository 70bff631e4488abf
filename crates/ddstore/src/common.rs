//! 📦 Common data structures — the records that arrive from the profiler, fully cooked.
//!
//! ---
//!
//! 🎬 COLD OPEN — INT. PROFILER — SOMEWHERE UPSTREAM — 2:14 AM
//!
//! A column has been read. Every value counted, every entity guessed, every
//! quartile argued over. The statistics are done. Nobody here computed them.
//! We just carry them the last mile, like a courier who did not bake the cake
//! but will absolutely drop it if the cluster is down.
//!
//! 🦆
//!
//! Two records live here:
//! - [`TextRecord`]: a column's raw sample values, destined for full-text search.
//! - [`ProfileRecord`]: a column's computed profile, destined for the profile index.
//!
//! Both are transient. They are borrowed by a write call and forgotten afterwards.
//! No caching, no retention, no sentimentality.

use serde::{Deserialize, Serialize};

/// 🔤 The separator placed after *every* sample value when building the text blob.
/// After every value, including the last one. Yes, the trailing space is load-bearing:
/// existing indices were built that way and we are not here to start a schism.
pub const TEXT_VALUE_SEPARATOR: char = ' ';

/// 📝 Raw sample values of one column, on their way to the text index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRecord {
    pub id: i32,
    pub source_name: String,
    pub column_name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// 📊 The profile of one column, computed upstream and persisted by us.
///
/// Field names deserialize from camelCase so an NDJSON dump written by the
/// profiler (or by anything that speaks the profile document format) can be
/// fed straight back in.
///
/// ⚠️ `entities` is a list here, but it lands in the document as its string
/// representation (`"[PERSON, LOCATION]"`), not as a JSON array. The mapping
/// analyzes it as text. See [`ProfileRecord::entities_repr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: i32,
    pub source_name: String,
    pub column_name: String,
    pub data_type: String,
    pub total_values: i32,
    pub unique_values: i32,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub min_value: f32,
    #[serde(default)]
    pub max_value: f32,
    #[serde(default)]
    pub avg_value: f32,
    #[serde(default)]
    pub median: i64,
    #[serde(default)]
    pub iqr: i64,
}

impl TextRecord {
    /// 🧵 Joins the sample values into a single blob: each value followed by one space.
    ///
    /// `["a", "b", "c"]` → `"a b c "`. Empty list → empty string.
    pub fn text_blob(&self) -> String {
        concat_values(&self.values)
    }
}

impl ProfileRecord {
    /// 🏷️ The entity list rendered the way the profile index has always stored it:
    /// square brackets, comma-space separated. `[]` when nothing was detected.
    pub fn entities_repr(&self) -> String {
        format!("[{}]", self.entities.join(", "))
    }

    /// 🆔 The document id in the profile index: the record id as a plain decimal string.
    /// Same id, same document. Last write wins.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

/// 🔗 Concatenates values with a trailing [`TEXT_VALUE_SEPARATOR`] after each one.
///
/// Pre-allocates so a column with a few hundred thousand samples does not
/// reallocate its way into a memory-usage graph that makes people nervous.
pub fn concat_values<S: AsRef<str>>(values: &[S]) -> String {
    let estimated_size: usize = values.iter().map(|v| v.as_ref().len() + 1).sum();
    let mut blob = String::with_capacity(estimated_size);
    for value in values {
        blob.push_str(value.as_ref());
        blob.push(TEXT_VALUE_SEPARATOR);
    }
    blob
}
