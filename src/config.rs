//! Client configuration.
//!
//! Loaded from `formbase.toml`:
//!
//! ```toml
//! [connection]
//! host = "127.0.0.1"
//! username = "admin"
//! password = "secret"
//! bucket = "users"
//!
//! [schemas.users]
//! fields = ["aid", "name", "age:int", "nick:string,omitempty", "tags:list"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{FormbaseError, FormbaseResult};
use crate::schema::Schema;

/// Default query service port over plain HTTP.
pub const DEFAULT_PORT: u16 = 8093;
/// Default query service port over HTTPS.
pub const DEFAULT_SECURE_PORT: u16 = 18093;
/// Path of the query endpoint.
pub const QUERY_PATH: &str = "/query/service";
/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "formbase.toml";

/// Connection to one query service and bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    /// Overrides the scheme's default port.
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    /// Target collection for inserts and upserts.
    pub bucket: String,
    /// Use HTTPS.
    pub secure: bool,
    /// Ask the service for pretty-printed results.
    pub pretty: bool,
    /// Form key holding the document key.
    pub key_field: String,
    pub probe_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            username: String::new(),
            password: String::new(),
            bucket: String::new(),
            secure: false,
            pretty: false,
            key_field: "aid".to_string(),
            probe_timeout_ms: 3000,
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration builder
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.secure {
            DEFAULT_SECURE_PORT
        } else {
            DEFAULT_PORT
        })
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// `<scheme>://<host>:<port>/query/service`
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}{}", self.scheme(), self.host, self.port(), QUERY_PATH)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn validate(&self) -> FormbaseResult<()> {
        if self.host.is_empty() {
            return Err(FormbaseError::Config("host must not be empty".to_string()));
        }
        if self.key_field.is_empty() {
            return Err(FormbaseError::Config("key_field must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for ConnectionConfig
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }

    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.config.key_field = field.into();
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

/// A schema declared in the config file as field specs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaConfig {
    pub fields: Vec<String>,
}

/// Contents of `formbase.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormbaseConfig {
    pub connection: ConnectionConfig,
    pub schemas: BTreeMap<String, SchemaConfig>,
}

impl FormbaseConfig {
    pub fn from_toml(content: &str) -> FormbaseResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FormbaseError::Config(e.to_string()))?;
        config.connection.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> FormbaseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, else the first existing default location.
    /// Without any file the defaults are used.
    pub fn discover(path: Option<&Path>) -> FormbaseResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Schema declared under `[schemas.<name>]`.
    pub fn schema(&self, name: &str) -> FormbaseResult<Schema> {
        let declared = self
            .schemas
            .get(name)
            .ok_or_else(|| FormbaseError::Config(format!("no schema named '{}'", name)))?;
        Schema::from_specs(&declared.fields)
    }
}

/// `./formbase.toml`, then `<config dir>/formbase/config.toml`.
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("formbase").join("config.toml"));
    }
    paths
}
