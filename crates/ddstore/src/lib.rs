//! 🗃️ ddstore — writes column profiles and raw column text into Elasticsearch.
//!
//! Two indices, two schemas, four operations: `init_store`, `index_data`,
//! `store_document`, `tear_down_store`. Everything else in here exists so those
//! four have somewhere to live, something to log with, and a file to read from. 🦆

pub mod app_config;
pub mod common;
pub mod mappings;
mod progress;
pub mod records;
pub mod stores;
mod supervisors;
pub mod transforms;

use std::path::Path;

use anyhow::{Context, Result};

use crate::app_config::AppConfig;
use crate::mappings::IndexKind;
use crate::supervisors::Supervisor;

pub use crate::supervisors::{LoadFailure, LoadReport};

/// 🏗️ Create both indices (if missing) and apply their mappings.
pub async fn init(app_config: AppConfig) -> Result<()> {
    Supervisor::new(app_config)
        .init()
        .await
        .context("💀 ddstore could not prepare the indices")
}

/// 📤 Load an NDJSON (optionally gzipped) file of `kind` records into the store.
pub async fn load(app_config: AppConfig, kind: IndexKind, path: &Path) -> Result<LoadReport> {
    Supervisor::new(app_config)
        .load(kind, path)
        .await
        .context(format!("💀 ddstore could not load {} records", kind))
}
