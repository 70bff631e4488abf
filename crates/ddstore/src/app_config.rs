//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! ```toml
//! [store_config.Elasticsearch]
//! host = "localhost"
//! port = 9200
//!
//! [runtime]
//! write_parallelism = 4
//! ```

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::stores::ElasticsearchStoreConfig;

/// 📦 The AppConfig: one struct to rule them all.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct AppConfig {
    /// 🗃️ Which store, and how to reach it. Defaults to Elasticsearch on localhost:9200.
    #[serde(default)]
    pub store_config: StoreConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🎭 Which store to write to. Externally tagged:
/// `[store_config.Elasticsearch]` in TOML, or `store_config = "InMemory"`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum StoreConfig {
    #[serde(alias = "elasticsearch")]
    Elasticsearch(ElasticsearchStoreConfig),
    /// 🧠 Process-local pretend store. Dry runs and tests. Gone when the process exits.
    #[serde(alias = "in_memory", alias = "inmemory")]
    InMemory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Elasticsearch(ElasticsearchStoreConfig::default())
    }
}

/// ⚙️ Knobs for the batch loader. The store itself has no runtime knobs; it just writes.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 🧵 How many writes may be in flight at once. 1 = strictly one after another.
    #[serde(default = "default_write_parallelism")]
    pub write_parallelism: usize,
    /// 💀 Stop at the first failed write instead of counting failures and moving on.
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_write_parallelism() -> usize {
    1
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            write_parallelism: default_write_parallelism(),
            fail_fast: false,
        }
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of defaults.
///
/// 🔧 Merges environment variables (`DDSTORE_*`, nested with `__`) with an optional TOML file.
///   - `config_file_name` is None  → env vars only.
///   - `config_file_name` is Some  → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable, with a message that says which source to blame.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("DDSTORE_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (DDSTORE_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (DDSTORE_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
