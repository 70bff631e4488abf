//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 *[a file of ten thousand column profiles sits on disk, unindexed]*
//! 🎬 "In a world where records wait patiently in NDJSON..."
//! 🎬 "One supervisor dared to load them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor module — part middle manager, part helicopter parent.
//! It opens the store, hands it every record in a file, counts who made it,
//! and closes the store again. Whether or not anyone asked.
//!
//! 🧵 Writes run with at most `runtime.write_parallelism` in flight, via
//! `buffer_unordered`. Order of completion is not order of the file. Nobody promised that.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::app_config::AppConfig;
use crate::common::{ProfileRecord, TextRecord};
use crate::mappings::IndexKind;
use crate::progress::ProgressMetrics;
use crate::records::read_records;
use crate::stores::{Store, StoreBackend, StoreNotReady, WriteOutcome, WriteResult};

/// 💀 One record that did not make it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub record_id: i32,
    pub reason: String,
}

/// 🧾 What a load did, for the summary table and for anyone grepping logs at 3am.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub kind: IndexKind,
    /// 📏 records read from the file
    pub records: usize,
    pub created: usize,
    pub updated: usize,
    /// 🤷 the cluster answered 2xx with a result we don't have a name for ("noop", mostly)
    pub other: usize,
    pub failures: Vec<LoadFailure>,
    pub elapsed: Duration,
}

impl LoadReport {
    fn new(kind: IndexKind, records: usize) -> Self {
        Self {
            kind,
            records,
            created: 0,
            updated: 0,
            other: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// ✅ Documents the store acknowledged, whatever it called them.
    pub fn written(&self) -> usize {
        self.created + self.updated + self.other
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record_outcome(&mut self, outcome: &WriteOutcome) {
        match outcome.result {
            WriteResult::Created => self.created += 1,
            WriteResult::Updated => self.updated += 1,
            WriteResult::Other(_) => self.other += 1,
        }
    }
}

/// 📄 A record the supervisor knows how to hand to a store.
#[async_trait]
trait Loadable: DeserializeOwned + Send + Sync {
    const KIND: IndexKind;

    fn record_id(&self) -> i32;

    async fn write_to(&self, store: &StoreBackend) -> Result<WriteOutcome>;
}

#[async_trait]
impl Loadable for TextRecord {
    const KIND: IndexKind = IndexKind::Text;

    fn record_id(&self) -> i32 {
        self.id
    }

    async fn write_to(&self, store: &StoreBackend) -> Result<WriteOutcome> {
        store
            .index_data(self.id, &self.source_name, &self.column_name, &self.values)
            .await
    }
}

#[async_trait]
impl Loadable for ProfileRecord {
    const KIND: IndexKind = IndexKind::Profile;

    fn record_id(&self) -> i32 {
        self.id
    }

    async fn write_to(&self, store: &StoreBackend) -> Result<WriteOutcome> {
        store.store_document(self).await
    }
}

/// 📦 The Supervisor: owns the store for the length of one command.
#[derive(Debug)]
pub(crate) struct Supervisor {
    app_config: AppConfig,
    store: StoreBackend,
}

impl Supervisor {
    /// 🚀 Build the store named in the config. Nothing touches the network yet.
    pub(crate) fn new(app_config: AppConfig) -> Self {
        let store = StoreBackend::from_config(app_config.store_config.clone());
        Self { app_config, store }
    }

    /// 🧪 Supervise a store someone else built. Tests hand in an `InMemoryStore` they can peek at.
    #[cfg(test)]
    pub(crate) fn with_store(app_config: AppConfig, store: StoreBackend) -> Self {
        Self { app_config, store }
    }

    /// 🏗️ Make sure both indices and their mappings exist, then let go of the connection.
    pub(crate) async fn init(&mut self) -> Result<()> {
        self.store
            .init_store()
            .await
            .context("💀 Supervisor could not initialize the store")?;
        self.store
            .tear_down_store()
            .await
            .context("💀 Supervisor initialized the store but could not close it again")?;
        info!("✅ indices and mappings are in place");
        Ok(())
    }

    /// 📤 Load every record of `kind` from `path` into the store.
    pub(crate) async fn load(&mut self, kind: IndexKind, path: &Path) -> Result<LoadReport> {
        match kind {
            IndexKind::Text => self.load_records::<TextRecord>(path).await,
            IndexKind::Profile => self.load_records::<ProfileRecord>(path).await,
        }
    }

    async fn load_records<R: Loadable>(&mut self, path: &Path) -> Result<LoadReport> {
        // 📖 read first: a broken file should never cost us a connection
        let records: Vec<R> = read_records(path).await?;
        info!(
            kind = %R::KIND,
            records = records.len(),
            path = %path.display(),
            "📖 records read, opening the store"
        );

        self.store
            .init_store()
            .await
            .context("💀 Supervisor could not initialize the store before loading")?;

        let written = self.write_all(&records).await;

        // 🗑️ the door closes whether the load went well or not
        if let Err(teardown_err) = self.store.tear_down_store().await {
            match &written {
                Ok(_) => {
                    return Err(teardown_err.context("💀 Load finished but the store would not close"));
                }
                Err(_) => error!("⚠️ store teardown also failed: {:#}", teardown_err),
            }
        }

        written
    }

    async fn write_all<R: Loadable>(&self, records: &[R]) -> Result<LoadReport> {
        let started = Instant::now();
        let parallelism = self.app_config.runtime.write_parallelism.max(1);
        let fail_fast = self.app_config.runtime.fail_fast;

        let mut report = LoadReport::new(R::KIND, records.len());
        let mut progress = ProgressMetrics::new(R::KIND.to_string(), records.len() as u64);

        let store = &self.store;
        let mut writes = stream::iter(records)
            .map(|record| async move { (record.record_id(), record.write_to(store).await) })
            .buffer_unordered(parallelism);

        while let Some((record_id, result)) = writes.next().await {
            match result {
                Ok(outcome) => {
                    report.record_outcome(&outcome);
                    progress.update(1, 0);
                }
                Err(err) => {
                    // 💀 a closed store fails every record after this one too. no point counting them.
                    if fail_fast || err.downcast_ref::<StoreNotReady>().is_some() {
                        progress.finish();
                        return Err(err.context(format!(
                            "💀 Record {} could not be written, so the load stopped here",
                            record_id
                        )));
                    }
                    warn!(record_id, "⚠️ write failed: {:#}", err);
                    report.failures.push(LoadFailure {
                        record_id,
                        reason: format!("{:#}", err),
                    });
                    progress.update(0, 1);
                }
            }
        }

        progress.finish();
        report.elapsed = started.elapsed();
        info!(
            kind = %R::KIND,
            written = report.written(),
            failed = report.failed(),
            "🏁 load finished"
        );
        Ok(report)
    }
}
