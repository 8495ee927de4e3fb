use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_pubchem_fetcher::config::{Config, ConfigLoader, DEFAULT_BATCH_SIZE, Overrides};
use kira_pubchem_fetcher::domain::Cid;
use kira_pubchem_fetcher::error::KiraError;

#[test]
fn file_values_and_cli_overrides() {
    let config = Config {
        schema_version: None,
        batch_size: Some(500),
        start_cid: Some(42),
        output_dir: Some("data".to_string()),
        base_url: Some("http://localhost:8080/rest/pug".to_string()),
        timeout_secs: Some(5),
    };
    let overrides = Overrides {
        batch_size: Some(20),
        start_cid: None,
        output_dir: Some("/tmp/out".to_string()),
    };

    let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
    assert_eq!(resolved.batch_size, 20);
    assert_eq!(resolved.start_cid, Some(Cid::new(42).unwrap()));
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("/tmp/out"));
    assert_eq!(resolved.base_url, "http://localhost:8080/rest/pug");
    assert_eq!(resolved.timeout, Duration::from_secs(5));
}

#[test]
fn rejects_invalid_values() {
    let zero_batch = Config {
        batch_size: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(zero_batch, Overrides::default()),
        Err(KiraError::InvalidConfig(_))
    );

    let zero_start = Config {
        start_cid: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(zero_start, Overrides::default()),
        Err(KiraError::InvalidCid(_))
    );
}

#[test]
fn resolve_reads_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-pc.json");
    fs::write(&path, r#"{ "schema_version": 1, "start_cid": 7 }"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str(), Overrides::default()).unwrap();
    assert_eq!(resolved.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(resolved.start_cid, Some(Cid::new(7).unwrap()));

    fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), Overrides::default()),
        Err(KiraError::ConfigParse(_))
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), Overrides::default()),
        Err(KiraError::MissingConfig(_))
    );
}
