//! Configuration loading from files and the process environment
//!
//! Tests that touch `DOCFLOW_*` variables are `#[serial]` so they do not
//! race each other.

use docflow_common::config::{BlobBackend, BrokerTransport, Config, NftBackend};
use docflow_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_explicit_file() {
    let file = write_config(
        r#"
        [server]
        storage_port = 4001

        [blob_store]
        backend = "memory"

        [broker]
        transport = "in_process"
        "#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.server.storage_port, 4001);
    assert_eq!(config.server.bff_port, 3000);
    assert_eq!(config.blob_store.backend, BlobBackend::Memory);
    assert_eq!(config.broker.transport, BrokerTransport::InProcess);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(Config::load(Some(&missing)), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
        [nft]
        backend = "database"
        "#,
    );

    env::set_var("DOCFLOW_NFT_BACKEND", "blockchain");
    env::set_var("DOCFLOW_NFT_TOKEN_SERVICE_URL", "http://tokens:8080");
    let result = Config::load(Some(file.path()));
    env::remove_var("DOCFLOW_NFT_BACKEND");
    env::remove_var("DOCFLOW_NFT_TOKEN_SERVICE_URL");

    let config = result.unwrap();
    assert_eq!(config.nft.backend, NftBackend::Blockchain);
    assert_eq!(config.nft.token_service_url.as_deref(), Some("http://tokens:8080"));
}

#[test]
#[serial]
fn test_env_override_failing_validation() {
    let file = write_config("");

    env::set_var("DOCFLOW_NFT_BACKEND", "blockchain");
    let result = Config::load(Some(file.path()));
    env::remove_var("DOCFLOW_NFT_BACKEND");

    assert!(matches!(result, Err(Error::Config(_))));
}
