//! # 📡 THE ELASTICSEARCH STORE
//!
//! 🎬 COLD OPEN — INT. SERVER ROOM — 3:47 AM
//!
//! The profiler finished an hour ago. Twelve thousand columns, every one of them
//! counted, sorted, quartiled. And all of it is sitting in memory, waiting for
//! one small adapter to carry it into the index before somebody closes the laptop.
//!
//! 🚀 This module is that adapter. One HTTP client. Two indices. Two schemas,
//! declared once. After that, one request per document: `POST` for text
//! (the cluster picks the id), `PUT` for profiles (the column's id is the id).
//!
//! 🧠 Knowledge graph:
//! - `init_store`: `HEAD /{index}` → `PUT /{index}` if missing → `PUT /{index}/_mapping`.
//!   Both indices, in order, before the client is handed to writers.
//! - `write`: `POST /{index}/_doc` or `PUT /{index}/_doc/{id}`. With a legacy
//!   `document_type` configured, that type replaces `_doc` in every path.
//! - Auth: API key beats basic auth. This is not a democracy.
//! - 🔄 No retries. A failed write is an `Err` with the status and body attached.
//!   What happens next is the caller's business.
//!
//! 🦆 (mandatory duck, no context provided, none shall be requested)

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, trace, warn};

use super::{
    CommonStoreConfig, PreparedDocument, Store, StoreNotReady, WriteOutcome, WriteResult,
};
use crate::mappings::{IndexKind, PROFILE_INDEX, TEXT_INDEX};

/// 📡 Where the cluster lives and how to talk to it.
///
/// ```toml
/// [store_config.Elasticsearch]
/// host = "es.internal"
/// port = 9200
/// document_type = "column"   # only for clusters that still speak typed endpoints
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ElasticsearchStoreConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// 🔒 Username. The bouncer at the club. Except the club is a database.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key — the velvet rope variant of authentication. Wins over basic auth.
    #[serde(default)]
    pub api_key: Option<String>,
    /// 🏷️ Legacy mapping type (e.g. `"column"`). `None` means typeless `_doc` endpoints.
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default = "default_text_index")]
    pub text_index: String,
    #[serde(default = "default_profile_index")]
    pub profile_index: String,
    #[serde(flatten, default)]
    pub common_config: CommonStoreConfig,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_text_index() -> String {
    TEXT_INDEX.to_string()
}

fn default_profile_index() -> String {
    PROFILE_INDEX.to_string()
}

impl Default for ElasticsearchStoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: default_scheme(),
            username: None,
            password: None,
            api_key: None,
            document_type: None,
            text_index: default_text_index(),
            profile_index: default_profile_index(),
            common_config: CommonStoreConfig::default(),
        }
    }
}

impl ElasticsearchStoreConfig {
    /// 🌐 `scheme://host:port`, no trailing slash. Every path is glued on after this.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn index_name(&self, kind: IndexKind) -> &str {
        match kind {
            IndexKind::Text => &self.text_index,
            IndexKind::Profile => &self.profile_index,
        }
    }

    /// 🏷️ The path segment after the index name: the legacy type, or `_doc`.
    fn type_segment(&self) -> &str {
        self.document_type.as_deref().unwrap_or("_doc")
    }
}

/// 📬 The part of an index response we care about. Elasticsearch says a lot more.
/// We nod politely and keep three fields.
#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    result: String,
}

/// 📡 The Elasticsearch-backed [`Store`].
///
/// Holds the config always, and the HTTP client only between `init_store` and
/// `tear_down_store`. No client, no writes: that's the whole state machine.
#[derive(Debug)]
pub struct ElasticsearchStore {
    config: ElasticsearchStoreConfig,
    client: Option<reqwest::Client>,
}

impl ElasticsearchStore {
    /// 🚀 Build an uninitialized store. No sockets are opened here.
    pub fn new(config: ElasticsearchStoreConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    pub fn config(&self) -> &ElasticsearchStoreConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    fn ready_client(&self, operation: &'static str) -> Result<&reqwest::Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow::Error::new(StoreNotReady { operation }))
    }

    /// 🔒 Same auth dance for every request. API key first, basic auth second, anonymous last.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("ApiKey {}", api_key))
        } else if let Some(ref username) = self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }

    fn index_url(&self, kind: IndexKind) -> String {
        format!("{}/{}", self.config.base_url(), self.config.index_name(kind))
    }

    fn mapping_url(&self, kind: IndexKind) -> String {
        match self.config.document_type {
            Some(ref doc_type) => format!("{}/_mapping/{}", self.index_url(kind), doc_type),
            None => format!("{}/_mapping", self.index_url(kind)),
        }
    }

    fn document_url(&self, kind: IndexKind, document_id: Option<&str>) -> String {
        let collection = format!("{}/{}", self.index_url(kind), self.config.type_segment());
        match document_id {
            Some(id) => format!("{}/{}", collection, id),
            None => collection,
        }
    }

    /// 🏗️ Make sure the index exists. Already there? Great. Created by a neighbor a
    /// millisecond ago? Also great.
    async fn ensure_index(&self, client: &reqwest::Client, kind: IndexKind) -> Result<()> {
        let index_url = self.index_url(kind);

        let probe = self
            .authorize(client.head(&index_url))
            .send()
            .await
            .context(format!(
                "💀 Knocked on '{}' to see if the index exists. Nobody answered. Is the cluster up?",
                index_url
            ))?;

        if probe.status().is_success() {
            debug!(index = %index_url, "✅ index already exists — welcome mat is out");
            return Ok(());
        }
        if probe.status() != reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!(
                "💀 Asked whether index '{}' exists and got '{}'. That is neither yes nor no.",
                index_url,
                probe.status()
            );
        }

        let response = self
            .authorize(client.put(&index_url))
            .send()
            .await
            .context(format!("💀 Failed to send the create request for '{}'", index_url))?;

        let status = response.status();
        if status.is_success() {
            info!(index = %index_url, "🏗️ created index");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if body.contains("resource_already_exists_exception") {
            // -- 🏁 lost the race to another process. the index exists. that's all we wanted.
            debug!(index = %index_url, "index appeared between probe and create");
            return Ok(());
        }

        error!(index = %index_url, %status, %body, "💀 index creation rejected");
        anyhow::bail!(
            "💀 Elasticsearch refused to create index '{}' with '{}'. The body of the response read: '{}'",
            index_url,
            status,
            body
        )
    }

    /// 🗺️ Apply the fixed mapping. Re-applying an identical mapping is a no-op on the cluster side.
    async fn put_mapping(&self, client: &reqwest::Client, kind: IndexKind) -> Result<()> {
        let mapping_url = self.mapping_url(kind);
        let body = serde_json::to_vec(&kind.mapping())
            .context("💀 The mapping refused to serialize. The schema that describes JSON is not JSON.")?;

        let response = self
            .authorize(client.put(&mapping_url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .context(format!("💀 Failed to send the {} mapping to '{}'", kind, mapping_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %mapping_url, %status, %body, "💀 mapping rejected");
            anyhow::bail!(
                "💀 Elasticsearch rejected the {} mapping at '{}' with '{}'. The body of the response read: '{}'. \
                 An existing field with a different type is the usual suspect.",
                kind,
                mapping_url,
                status,
                body
            );
        }

        debug!(url = %mapping_url, "🗺️ mapping applied");
        Ok(())
    }
}

#[async_trait]
impl Store for ElasticsearchStore {
    async fn init_store(&mut self) -> Result<()> {
        if self.client.is_some() {
            warn!("⚠️ init_store called on an initialized store — re-checking schemas anyway");
        }

        info!(
            url = %self.config.base_url(),
            text_index = %self.config.text_index,
            profile_index = %self.config.profile_index,
            "🔧 initializing Elasticsearch store"
        );

        // 🔧 One client for schema work and for writes. It pools connections and is cheap to share.
        let client = reqwest::Client::builder()
            .connect_timeout(self.config.common_config.connect_timeout())
            .timeout(self.config.common_config.request_timeout())
            .build()
            .context("💀 The HTTP client refused to be born. Probably a missing TLS cert or a cursed system OpenSSL.")?;

        for kind in [IndexKind::Text, IndexKind::Profile] {
            self.ensure_index(&client, kind)
                .await
                .context(format!("💀 Could not ensure the {} index exists", kind))?;
            self.put_mapping(&client, kind)
                .await
                .context(format!("💀 Could not apply the {} mapping", kind))?;
        }

        // ✅ Only now do writers get a client. Schemas first, documents second. Always.
        self.client = Some(client);
        info!("✅ Elasticsearch store ready");
        Ok(())
    }

    async fn write(&self, document: PreparedDocument) -> Result<WriteOutcome> {
        let client = self.ready_client("write")?;
        let url = self.document_url(document.kind, document.document_id.as_deref());

        let request = match document.document_id {
            Some(_) => client.put(&url),
            None => client.post(&url),
        };

        debug!(url = %url, bytes = document.body.len(), "📡 writing document");
        let response = self
            .authorize(request)
            .header("Content-Type", "application/json")
            .body(document.body)
            .send()
            .await
            .context(format!(
                "💀 The {} document never made it to '{}'. Check connectivity, check timeouts.",
                document.kind, url
            ))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Elasticsearch looked at our {} document and said '{}'. The body of the response read: '{}'",
                document.kind,
                status,
                body
            );
        }

        let bytes = response
            .bytes()
            .await
            .context("💀 The write succeeded but the response body got lost on the way back")?;
        let parsed: IndexResponse = serde_json::from_slice(&bytes).context(format!(
            "💀 The write to '{}' returned {} but the body was not an index response",
            url, status
        ))?;

        trace!(index = %parsed.index, id = %parsed.id, result = %parsed.result, "🚀 document landed");
        Ok(WriteOutcome {
            index: parsed.index,
            document_id: parsed.id,
            result: WriteResult::from_wire(&parsed.result),
        })
    }

    async fn tear_down_store(&mut self) -> Result<()> {
        match self.client.take() {
            Some(_) => info!("🗑️ Elasticsearch store torn down — connection pool released"),
            None => debug!("🗑️ tear_down_store on a store that was never up. nothing to release."),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::{sample_profile, sample_text};
    use crate::mappings::LEGACY_DOCUMENT_TYPE;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ElasticsearchStoreConfig {
        ElasticsearchStoreConfig {
            host: server.address().ip().to_string(),
            port: server.address().port(),
            ..ElasticsearchStoreConfig::default()
        }
    }

    fn index_response(index: &str, id: &str, result: &str) -> ResponseTemplate {
        ResponseTemplate::new(201).set_body_json(json!({
            "_index": index,
            "_id": id,
            "_version": 1,
            "result": result
        }))
    }

    /// 🧪 A cluster where both indices already exist and every mapping is welcome.
    async fn mount_happy_schema(server: &MockServer) {
        for index in ["text", "profile"] {
            Mock::given(method("HEAD"))
                .and(path(format!("/{}", index)))
                .respond_with(ResponseTemplate::new(200))
                .mount(server)
                .await;
            Mock::given(method("PUT"))
                .and(path(format!("/{}/_mapping", index)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
                .mount(server)
                .await;
        }
    }

    #[test]
    fn the_one_where_urls_are_glued_together_without_double_slashes() {
        let mut config = ElasticsearchStoreConfig::default();
        let store = ElasticsearchStore::new(config.clone());
        assert_eq!(store.config().base_url(), "http://localhost:9200");
        assert_eq!(
            store.document_url(IndexKind::Profile, Some("7")),
            "http://localhost:9200/profile/_doc/7"
        );
        assert_eq!(
            store.mapping_url(IndexKind::Text),
            "http://localhost:9200/text/_mapping"
        );

        config.document_type = Some(LEGACY_DOCUMENT_TYPE.to_string());
        let legacy = ElasticsearchStore::new(config);
        assert_eq!(
            legacy.document_url(IndexKind::Text, None),
            "http://localhost:9200/text/column"
        );
        assert_eq!(
            legacy.mapping_url(IndexKind::Profile),
            "http://localhost:9200/profile/_mapping/column"
        );
    }

    #[tokio::test]
    async fn the_one_where_missing_indices_get_created_then_mapped() -> Result<()> {
        let server = MockServer::start().await;
        for (index, mapping) in [
            ("text", crate::mappings::text_mapping()),
            ("profile", crate::mappings::profile_mapping()),
        ] {
            Mock::given(method("HEAD"))
                .and(path(format!("/{}", index)))
                .respond_with(ResponseTemplate::new(404))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .and(path(format!("/{}", index)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .and(path(format!("/{}/_mapping", index)))
                .and(body_json(mapping))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        assert!(store.is_ready());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_losing_the_creation_race_is_still_a_win() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/text"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "resource_already_exists_exception"},
                "status": 400
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        for index in ["text", "profile"] {
            Mock::given(method("PUT"))
                .and(path(format!("/{}/_mapping", index)))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        assert!(store.is_ready());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_rejected_mapping_keeps_the_store_closed() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/text/_mapping"))
            .respond_with(ResponseTemplate::new(400).set_body_string("mapper [text] cannot be changed"))
            .mount(&server)
            .await;

        let mut store = ElasticsearchStore::new(config_for(&server));
        let err = store
            .init_store()
            .await
            .expect_err("💀 a rejected mapping must not be swallowed");
        let chain = format!("{:#}", err);
        assert!(chain.contains("text mapping"), "got: {chain}");
        assert!(chain.contains("cannot be changed"), "got: {chain}");
        assert!(!store.is_ready());

        // 🚧 and since init failed, writes get the defined error, not a network call
        let write_err = store
            .store_document(&sample_profile(1))
            .await
            .expect_err("💀 writing to a half-initialized store must fail");
        assert!(write_err.downcast_ref::<StoreNotReady>().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_writing_before_init_is_a_defined_error() {
        let store = ElasticsearchStore::new(ElasticsearchStoreConfig::default());
        let record = sample_text(1);
        let err = store
            .index_data(record.id, &record.source_name, &record.column_name, &record.values)
            .await
            .expect_err("💀 no init, no writes");
        assert_eq!(
            err.downcast_ref::<StoreNotReady>(),
            Some(&StoreNotReady { operation: "write" })
        );
    }

    #[tokio::test]
    async fn the_one_where_profile_seven_is_put_at_document_seven() -> Result<()> {
        let server = MockServer::start().await;
        mount_happy_schema(&server).await;

        let record = sample_profile(7);
        Mock::given(method("PUT"))
            .and(path("/profile/_doc/7"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "id": 7,
                "sourceName": "employees.csv",
                "columnName": "salary",
                "dataType": "N",
                "totalValues": 1200,
                "uniqueValues": 640,
                "entities": "[PERSON, LOCATION]",
                "minValue": 1.5,
                "maxValue": 250000.0,
                "avgValue": 61234.5,
                "median": 58000,
                "iqr": 21000
            })))
            .respond_with(index_response("profile", "7", "created"))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        let outcome = store.store_document(&record).await?;

        assert_eq!(
            outcome,
            WriteOutcome {
                index: "profile".to_string(),
                document_id: "7".to_string(),
                result: WriteResult::Created,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_text_is_posted_and_the_cluster_picks_the_id() -> Result<()> {
        let server = MockServer::start().await;
        mount_happy_schema(&server).await;
        Mock::given(method("POST"))
            .and(path("/text/_doc"))
            .and(body_json(json!({
                "id": "3",
                "sourceName": "people.csv",
                "columnName": "first_name",
                "text": "a b c "
            })))
            .respond_with(index_response("text", "Zx9-auto", "created"))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        let values = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = store.index_data(3, "people.csv", "first_name", &values).await?;

        assert_eq!(outcome.document_id, "Zx9-auto");
        assert_eq!(outcome.index, "text");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_mappings_land_before_the_first_document() -> Result<()> {
        let server = MockServer::start().await;
        mount_happy_schema(&server).await;
        Mock::given(method("POST"))
            .and(path("/text/_doc"))
            .respond_with(index_response("text", "a1", "created"))
            .mount(&server)
            .await;

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        store.index_data(1, "s", "c", &["x".to_string()]).await?;

        let requests = server
            .received_requests()
            .await
            .expect("💀 request recording is on by default, or so we were promised");
        let position = |needle: &str| {
            requests
                .iter()
                .position(|r| r.url.path() == needle)
                .unwrap_or_else(|| panic!("💀 never saw a request to {needle}"))
        };
        let first_write = position("/text/_doc");
        assert!(position("/text/_mapping") < first_write);
        assert!(position("/profile/_mapping") < first_write);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_failed_write_is_not_a_success() -> Result<()> {
        let server = MockServer::start().await;
        mount_happy_schema(&server).await;
        Mock::given(method("PUT"))
            .and(path("/profile/_doc/7"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string("es_rejected_execution_exception"),
            )
            .mount(&server)
            .await;

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        let err = store
            .store_document(&sample_profile(7))
            .await
            .expect_err("💀 a 429 is not a success, no matter how optimistic we feel");
        let message = err.to_string();
        assert!(message.contains("429"), "got: {message}");
        assert!(message.contains("es_rejected_execution_exception"), "got: {message}");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_api_keys_outrank_passwords() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(header("authorization", "ApiKey c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.api_key = Some("c2VjcmV0".to_string());
        config.username = Some("elastic".to_string());
        config.password = Some("changeme".to_string());

        let mut store = ElasticsearchStore::new(config);
        store.init_store().await?;

        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 4, "two probes and two mappings, all with the api key");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_legacy_types_show_up_in_every_path() -> Result<()> {
        let server = MockServer::start().await;
        for index in ["text", "profile"] {
            Mock::given(method("HEAD"))
                .and(path(format!("/{}", index)))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .and(path(format!("/{}/_mapping/column", index)))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("PUT"))
            .and(path("/profile/column/7"))
            .respond_with(index_response("profile", "7", "updated"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.document_type = Some(LEGACY_DOCUMENT_TYPE.to_string());
        let mut store = ElasticsearchStore::new(config);
        store.init_store().await?;
        let outcome = store.store_document(&sample_profile(7)).await?;
        assert_eq!(outcome.result, WriteResult::Updated);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_teardown_closes_the_door_twice_without_slamming() -> Result<()> {
        let server = MockServer::start().await;
        mount_happy_schema(&server).await;

        let mut store = ElasticsearchStore::new(config_for(&server));
        store.init_store().await?;
        store.tear_down_store().await?;
        store.tear_down_store().await?;
        assert!(!store.is_ready());

        let err = store
            .store_document(&sample_profile(2))
            .await
            .expect_err("💀 the store is closed. come back tomorrow.");
        assert!(err.downcast_ref::<StoreNotReady>().is_some());
        Ok(())
    }
}
