//! 🎬 *[two timeouts walk into a struct. one waits for the handshake. one waits for the answer.]*
//!
//! 📦 **Common Store Config** — the knobs every networked store shares.
//!
//! 🧠 Knowledge graph:
//! - Flattened into `ElasticsearchStoreConfig`, so in TOML these sit right next to
//!   `host` and `port` instead of hiding in a sub-table.
//! - `connect_timeout_secs`: how long we wait for TCP + TLS to say hello.
//! - `request_timeout_secs`: how long we wait for the whole request, body and all.
//!
//! "He who waits forever on a dead cluster, profiles nothing." — Ancient proverb 🦆

use std::time::Duration;

use serde::Deserialize;

/// 🔧 Shared connection knobs for stores that talk over the network.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CommonStoreConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// 🤝 10 seconds to shake hands. if the cluster can't manage that, it's not having a good day.
fn default_connect_timeout_secs() -> u64 {
    10
}

// ⏱️ 30 seconds per request. a text blob for a wide column can be chunky. we're not monsters.
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for CommonStoreConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl CommonStoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
