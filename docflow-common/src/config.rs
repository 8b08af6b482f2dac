//! Configuration shared by the docflow services
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, else `docflow.toml` or `data/docflow.toml`)
//! 3. `DOCFLOW_<SECTION>_<KEY>` environment variables
//! 4. Command-line flags, applied by each binary after [`Config::load`]

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::broker::Queue;
use crate::{Error, Result};

/// Files probed when no explicit path is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["docflow.toml", "data/docflow.toml"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub nft: NftConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_bff_port")]
    pub bff_port: u16,
    #[serde(default = "default_storage_port")]
    pub storage_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    #[default]
    Fs,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobStoreConfig {
    #[serde(default)]
    pub backend: BlobBackend,
    /// Root directory of the `fs` backend
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerTransport {
    #[default]
    Http,
    /// Single-process deployment; messages to other services are dropped
    InProcess,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub transport: BrokerTransport,
    #[serde(default)]
    pub queue_prefix: String,
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    #[serde(default = "default_das_url")]
    pub das_url: String,
    #[serde(default = "default_bff_url")]
    pub bff_url: String,
    #[serde(default = "default_broker_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NftBackend {
    #[default]
    Database,
    Blockchain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NftConfig {
    #[serde(default)]
    pub backend: NftBackend,
    /// Base URL of the token service; required by the `blockchain` backend
    #[serde(default)]
    pub token_service_url: Option<String>,
    #[serde(default = "default_owner_address")]
    pub owner_address: String,
    #[serde(default = "default_minter_address")]
    pub minter_address: String,
    #[serde(default = "default_token_address")]
    pub token_address: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_bff_port() -> u16 {
    3000
}

fn default_storage_port() -> u16 {
    3001
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/docflow.db")
}

fn default_blob_root() -> PathBuf {
    PathBuf::from("data/blobs")
}

fn default_storage_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_das_url() -> String {
    "http://127.0.0.1:3002".to_string()
}

fn default_bff_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_broker_timeout() -> u64 {
    30
}

fn default_owner_address() -> String {
    "0x0000000000000000000000000000000000000001".to_string()
}

fn default_minter_address() -> String {
    "0x0000000000000000000000000000000000000002".to_string()
}

fn default_token_address() -> String {
    "0x0000000000000000000000000000000000000003".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            bff_port: default_bff_port(),
            storage_port: default_storage_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            root: default_blob_root(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            transport: BrokerTransport::default(),
            queue_prefix: String::new(),
            storage_url: default_storage_url(),
            das_url: default_das_url(),
            bff_url: default_bff_url(),
            timeout_secs: default_broker_timeout(),
        }
    }
}

impl Default for NftConfig {
    fn default() -> Self {
        Self {
            backend: NftBackend::default(),
            token_service_url: None,
            owner_address: default_owner_address(),
            minter_address: default_minter_address(),
            token_address: default_token_address(),
        }
    }
}

impl BrokerConfig {
    pub fn queue(&self, queue: Queue) -> String {
        queue.name(&self.queue_prefix)
    }

    /// Queue name → base URL map for [`HttpBroker`](crate::broker::HttpBroker)
    pub fn endpoints(&self) -> HashMap<String, String> {
        HashMap::from([
            (self.queue(Queue::StorageService), self.storage_url.clone()),
            (self.queue(Queue::Das), self.das_url.clone()),
            (self.queue(Queue::Bff), self.bff_url.clone()),
        ])
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from file and environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    fn load_from_file(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            let config = Self::from_toml_str(&content)?;
            info!("Loaded configuration from {:?}", path);
            return Ok(config);
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            if Path::new(candidate).exists() {
                let content = std::fs::read_to_string(candidate)?;
                let config = Self::from_toml_str(&content)?;
                info!("Loaded configuration from {}", candidate);
                return Ok(config);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Apply `DOCFLOW_<SECTION>_<KEY>` overrides read through `lookup`
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(val) = lookup("DOCFLOW_SERVER_HOST") {
            self.server.host = val;
        }
        override_parsed(&lookup, "DOCFLOW_SERVER_BFF_PORT", &mut self.server.bff_port);
        override_parsed(&lookup, "DOCFLOW_SERVER_STORAGE_PORT", &mut self.server.storage_port);

        // Database
        if let Some(val) = lookup("DOCFLOW_DATABASE_PATH") {
            self.database.path = PathBuf::from(val);
        }

        // Blob store
        override_enum(&lookup, "DOCFLOW_BLOB_STORE_BACKEND", &mut self.blob_store.backend);
        if let Some(val) = lookup("DOCFLOW_BLOB_STORE_ROOT") {
            self.blob_store.root = PathBuf::from(val);
        }

        // Broker
        override_enum(&lookup, "DOCFLOW_BROKER_TRANSPORT", &mut self.broker.transport);
        if let Some(val) = lookup("DOCFLOW_BROKER_QUEUE_PREFIX") {
            self.broker.queue_prefix = val;
        }
        if let Some(val) = lookup("DOCFLOW_BROKER_STORAGE_URL") {
            self.broker.storage_url = val;
        }
        if let Some(val) = lookup("DOCFLOW_BROKER_DAS_URL") {
            self.broker.das_url = val;
        }
        if let Some(val) = lookup("DOCFLOW_BROKER_BFF_URL") {
            self.broker.bff_url = val;
        }
        override_parsed(&lookup, "DOCFLOW_BROKER_TIMEOUT_SECS", &mut self.broker.timeout_secs);

        // NFT
        override_enum(&lookup, "DOCFLOW_NFT_BACKEND", &mut self.nft.backend);
        if let Some(val) = lookup("DOCFLOW_NFT_TOKEN_SERVICE_URL") {
            self.nft.token_service_url = Some(val).filter(|v| !v.trim().is_empty());
        }
        if let Some(val) = lookup("DOCFLOW_NFT_OWNER_ADDRESS") {
            self.nft.owner_address = val;
        }
        if let Some(val) = lookup("DOCFLOW_NFT_MINTER_ADDRESS") {
            self.nft.minter_address = val;
        }
        if let Some(val) = lookup("DOCFLOW_NFT_TOKEN_ADDRESS") {
            self.nft.token_address = val;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.nft.backend == NftBackend::Blockchain && self.nft.token_service_url.is_none() {
            return Err(Error::Config(
                "nft.backend = \"blockchain\" requires nft.token_service_url".to_string(),
            ));
        }
        if self.broker.timeout_secs == 0 {
            return Err(Error::Config("broker.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!("Ignoring {}={:?}: not a valid value", key, val),
        }
    }
}

/// Enum overrides accept the same lowercase names as the TOML file
fn override_enum<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: DeserializeOwned,
{
    if let Some(val) = lookup(key) {
        match serde_json::from_value(serde_json::Value::String(val.to_lowercase())) {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!("Ignoring {}={:?}: unknown variant", key, val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bff_port, 3000);
        assert_eq!(config.server.storage_port, 3001);
        assert_eq!(config.blob_store.backend, BlobBackend::Fs);
        assert_eq!(config.broker.transport, BrokerTransport::Http);
        assert_eq!(config.nft.backend, NftBackend::Database);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [broker]
            queue_prefix = "dev_"

            [nft]
            backend = "blockchain"
            token_service_url = "http://tokens:8080"
            "#,
        )
        .unwrap();
        assert_eq!(config.broker.queue_prefix, "dev_");
        assert_eq!(config.broker.timeout_secs, 30);
        assert_eq!(config.nft.backend, NftBackend::Blockchain);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml_str("[server\nport = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DOCFLOW_SERVER_BFF_PORT", "8080"),
            ("DOCFLOW_BLOB_STORE_BACKEND", "MEMORY"),
            ("DOCFLOW_BROKER_TRANSPORT", "in_process"),
            ("DOCFLOW_BROKER_QUEUE_PREFIX", "test_"),
            ("DOCFLOW_NFT_TOKEN_SERVICE_URL", "   "),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bff_port, 8080);
        assert_eq!(config.blob_store.backend, BlobBackend::Memory);
        assert_eq!(config.broker.transport, BrokerTransport::InProcess);
        assert_eq!(config.broker.queue(Queue::Das), "test_SKALA_AP4_DAS_QUEUE");
        assert!(config.nft.token_service_url.is_none());
    }

    #[test]
    fn test_bad_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "DOCFLOW_SERVER_STORAGE_PORT" => Some("not-a-port".to_string()),
            "DOCFLOW_NFT_BACKEND" => Some("paper".to_string()),
            _ => None,
        });
        assert_eq!(config.server.storage_port, 3001);
        assert_eq!(config.nft.backend, NftBackend::Database);
    }

    #[test]
    fn test_blockchain_backend_requires_url() {
        let mut config = Config::default();
        config.nft.backend = NftBackend::Blockchain;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_endpoints_are_keyed_by_queue_name() {
        let mut config = Config::default();
        config.broker.queue_prefix = "p_".to_string();
        let endpoints = config.broker.endpoints();
        assert_eq!(endpoints["p_SKALA_AP4_STORAGE_SERVICE_QUEUE"], "http://127.0.0.1:3001");
        assert_eq!(endpoints["p_SKALA_AP4_BFF_QUEUE"], "http://127.0.0.1:3000");
        assert_eq!(endpoints.len(), 3);
    }
}
