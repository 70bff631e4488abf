//! 🗺️ Index mappings — the two schemas ddstore declares exactly once at startup.
//!
//! 🧠 Knowledge graph:
//! - `text` index: raw column samples, `text` field analyzed with the `english` analyzer
//!   and term vectors on, so search can snippet and highlight.
//! - `profile` index: one document per column profile, exact-match numbers and ids,
//!   analyzed `columnName` and `entities`.
//! - "Analyzed" means `text`, "exact match" means `keyword` (or a numeric type).
//!   The old `string` + `not_analyzed` vocabulary died with Elasticsearch 5. We mourn briefly.
//!
//! ⚠️ These field names and types have compatibility weight. Existing deployed indices
//! were built with them. Change them and the next `PUT _mapping` gets a 400 with a
//! message about conflicting field types. Ask me how I know. 🦆

use serde_json::{Value, json};

/// 📛 Default name of the index holding raw column text.
pub const TEXT_INDEX: &str = "text";

/// 📛 Default name of the index holding column profiles.
pub const PROFILE_INDEX: &str = "profile";

/// 🏷️ Document type used by the legacy typed endpoints. Only sent when configured.
pub const LEGACY_DOCUMENT_TYPE: &str = "column";

/// 🏷️ Longest `columnName` still indexed in the text index. Longer names are stored, not indexed.
pub const COLUMN_NAME_IGNORE_ABOVE: u32 = 512;

/// 📝 Mapping body for the text index (`PUT /{index}/_mapping`).
pub fn text_mapping() -> Value {
    json!({
        "properties": {
            "id": {
                "type": "integer",
                "store": true
            },
            "sourceName": {
                "type": "keyword"
            },
            "columnName": {
                "type": "keyword",
                "ignore_above": COLUMN_NAME_IGNORE_ABOVE
            },
            "text": {
                "type": "text",
                "store": false,
                "analyzer": "english",
                "term_vector": "yes"
            }
        }
    })
}

/// 📊 Mapping body for the profile index (`PUT /{index}/_mapping`).
pub fn profile_mapping() -> Value {
    json!({
        "properties": {
            "id": { "type": "integer" },
            "sourceName": { "type": "keyword" },
            "columnName": {
                "type": "text",
                "analyzer": "english"
            },
            "dataType": { "type": "keyword" },
            "totalValues": { "type": "integer" },
            "uniqueValues": { "type": "integer" },
            "entities": { "type": "text" },
            "minValue": { "type": "float" },
            "maxValue": { "type": "float" },
            "avgValue": { "type": "float" },
            "median": { "type": "long" },
            "iqr": { "type": "long" }
        }
    })
}

/// 🎯 Which of the two schemas an index carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Text,
    Profile,
}

impl IndexKind {
    pub fn mapping(self) -> Value {
        match self {
            IndexKind::Text => text_mapping(),
            IndexKind::Profile => profile_mapping(),
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Text => f.write_str("text"),
            IndexKind::Profile => f.write_str("profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_text_mapping_keeps_its_english_accent() {
        let mapping = text_mapping();
        let props = &mapping["properties"];

        assert_eq!(props["id"]["type"], "integer");
        assert_eq!(props["id"]["store"], true);
        assert_eq!(props["sourceName"]["type"], "keyword");
        assert_eq!(props["columnName"]["type"], "keyword");
        assert_eq!(props["columnName"]["ignore_above"], 512);
        assert_eq!(props["text"]["type"], "text");
        assert_eq!(props["text"]["analyzer"], "english");
        assert_eq!(props["text"]["term_vector"], "yes");
        assert_eq!(props["text"]["store"], false);
    }

    #[test]
    fn the_one_where_profile_numbers_stay_exact() {
        let mapping = profile_mapping();
        let props = mapping["properties"]
            .as_object()
            .expect("💀 properties must be an object, the cluster insists");

        assert_eq!(props.len(), 12, "eleven profile fields plus the id. count them. we did.");
        for exact in ["totalValues", "uniqueValues", "id"] {
            assert_eq!(props[exact]["type"], "integer", "{exact} should be an integer");
        }
        for float in ["minValue", "maxValue", "avgValue"] {
            assert_eq!(props[float]["type"], "float", "{float} should be a float");
        }
        assert_eq!(props["median"]["type"], "long");
        assert_eq!(props["iqr"]["type"], "long");
        assert_eq!(props["dataType"]["type"], "keyword");
        assert_eq!(props["sourceName"]["type"], "keyword");
    }

    #[test]
    fn the_one_where_column_names_and_entities_get_analyzed() {
        let mapping = profile_mapping();
        assert_eq!(mapping["properties"]["columnName"]["type"], "text");
        assert_eq!(mapping["properties"]["columnName"]["analyzer"], "english");
        assert_eq!(mapping["properties"]["entities"]["type"], "text");
    }

    #[test]
    fn the_one_where_index_kind_picks_the_right_schema() {
        assert_eq!(IndexKind::Text.mapping(), text_mapping());
        assert_eq!(IndexKind::Profile.mapping(), profile_mapping());
        assert_eq!(IndexKind::Profile.to_string(), "profile");
    }
}
