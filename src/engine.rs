//! Query service client.
//!
//! This module provides the runtime for sending statements to a document
//! database's HTTP query endpoint and for writing projected forms into a
//! bucket.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tokio::net::TcpStream;

use crate::coerce::{CoercionMode, ProjectedRecord};
use crate::config::ConnectionConfig;
use crate::envelope::ResultEnvelope;
use crate::error::{FormbaseError, FormbaseResult};
use crate::form::FormValues;
use crate::schema::Schema;
use crate::statement::{Mutation, MutationKind, StatementEnvelope, ToStatement};

/// A handle on one query service and bucket.
///
/// Cheap to clone; the configuration is fixed at construction.
#[derive(Clone)]
pub struct DocDb {
    client: reqwest::Client,
    config: Arc<ConnectionConfig>,
    coercion: CoercionMode,
}

impl DocDb {
    /// Create a handle. No request is made until the first query.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = ConnectionConfig::builder()
    ///     .host("127.0.0.1")
    ///     .credentials("admin", "secret")
    ///     .bucket("users")
    ///     .build();
    /// let db = DocDb::connect(config)?;
    /// db.ping().await?;
    /// ```
    pub fn connect(config: ConnectionConfig) -> FormbaseResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FormbaseError::Connection(e.to_string()))?;

        tracing::info!("Query service at {} (bucket '{}')", config.endpoint(), config.bucket);

        Ok(Self {
            client,
            config: Arc::new(config),
            coercion: CoercionMode::default(),
        })
    }

    /// Use `mode` when coercing submitted forms.
    pub fn with_coercion(mut self, mode: CoercionMode) -> Self {
        self.coercion = mode;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// `Basic <base64(username:password)>`
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.config.username, self.config.password);
        format!("Basic {}", BASE64.encode(credentials))
    }

    /// Check that the query port accepts TCP connections.
    pub async fn ping(&self) -> FormbaseResult<String> {
        let host = self.config.host.as_str();
        let port = self.config.port();
        probe(host, port, self.config.probe_timeout())
            .await
            .map_err(|e| FormbaseError::Connection(format!("{}:{}: {}", host, port, e)))?;
        Ok(format!("Connection successful to {}:{}", host, port))
    }

    /// Execute a statement and return the envelope whatever its status.
    ///
    /// Transport failures, non-2xx responses and undecodable bodies are
    /// still errors.
    pub async fn query_unchecked(&self, statement: &str) -> FormbaseResult<ResultEnvelope> {
        let body = StatementEnvelope::new(statement)
            .pretty(self.config.pretty)
            .to_json()?;
        tracing::debug!("POST {} {}", self.config.endpoint(), body);

        let response = self
            .client
            .post(self.config.endpoint())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.authorization())
            .body(body)
            .send()
            .await
            .map_err(|e| FormbaseError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FormbaseError::Decode(e.to_string()))?;

        if !status.is_success() {
            let errors = ResultEnvelope::from_json(&text)
                .map(|envelope| envelope.errors)
                .unwrap_or_default();
            return Err(FormbaseError::Http {
                status: status.as_u16(),
                body: text,
                errors,
            });
        }

        ResultEnvelope::from_json(&text)
    }

    /// Execute a statement, failing unless the service reports success.
    pub async fn query(&self, statement: &str) -> FormbaseResult<ResultEnvelope> {
        let envelope = self.query_unchecked(statement).await?;
        if !envelope.is_success() {
            tracing::warn!(
                "Statement failed with status '{}': {}",
                envelope.status,
                statement
            );
        }
        envelope.into_success()
    }

    /// Project and coerce a form against `schema`.
    pub fn process(&self, form: &FormValues, schema: &Schema) -> FormbaseResult<ProjectedRecord> {
        ProjectedRecord::from_form(schema, form, self.coercion)
    }

    /// Render the statement that [`DocDb::insert`] or [`DocDb::upsert`] would send.
    ///
    /// The document key is the form value under the configured key field.
    pub fn render(&self, kind: MutationKind, form: &FormValues, schema: &Schema) -> FormbaseResult<String> {
        let key = form.get(&self.config.key_field);
        if key.is_empty() {
            return Err(FormbaseError::MissingKey(self.config.key_field.clone()));
        }
        let record = self.process(form, schema)?;
        Mutation::from_record(kind, self.config.bucket.as_str(), key, &record)?.to_statement()
    }

    /// Insert a form as a new document.
    pub async fn insert(&self, form: &FormValues, schema: &Schema) -> FormbaseResult<ResultEnvelope> {
        let statement = self.render(MutationKind::Insert, form, schema)?;
        self.query(&statement).await
    }

    /// Insert or replace a document from a form.
    pub async fn upsert(&self, form: &FormValues, schema: &Schema) -> FormbaseResult<ResultEnvelope> {
        let statement = self.render(MutationKind::Upsert, form, schema)?;
        self.query(&statement).await
    }

    /// Insert a serializable record under `key`.
    pub async fn insert_record<T: Serialize>(&self, key: &str, record: &T) -> FormbaseResult<ResultEnvelope> {
        self.write_record(MutationKind::Insert, key, record).await
    }

    /// Upsert a serializable record under `key`.
    pub async fn upsert_record<T: Serialize>(&self, key: &str, record: &T) -> FormbaseResult<ResultEnvelope> {
        self.write_record(MutationKind::Upsert, key, record).await
    }

    async fn write_record<T: Serialize>(
        &self,
        kind: MutationKind,
        key: &str,
        record: &T,
    ) -> FormbaseResult<ResultEnvelope> {
        let document = serde_json::to_string(record)?;
        let statement = Mutation::new(kind, self.config.bucket.as_str(), key, document).to_statement()?;
        self.query(&statement).await
    }
}

/// Plain TCP reachability check, no protocol exchange.
pub async fn probe_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    probe(host, port, timeout).await.is_ok()
}

async fn probe(host: &str, port: u16, timeout: Duration) -> std::io::Result<()> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("timed out after {:?}", timeout),
        )),
    }
}
