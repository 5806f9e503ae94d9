//! Run configuration: two SAS container URIs loaded from JSON secret files
//! named by environment variables, plus an optional listing page-size hint.
//!
//! The configuration is built exactly once at startup and passed by reference
//! into the worker; nothing here is process-global. Any failure in loading is
//! a [`ConfigError`], which the binary maps to its bad-configuration exit
//! code before a single storage call is made.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Names the JSON secret file holding the source container SAS URI.
pub const SOURCE_SECRET_PATH_ENV: &str = "BLOB_TRANSFER_SOURCE_SAS_SECRET_FILE";
/// Names the JSON secret file holding the destination container SAS URI.
pub const TARGET_SECRET_PATH_ENV: &str = "BLOB_TRANSFER_TARGET_SAS_SECRET_FILE";
/// Optional page-size hint for the segmented source listing.
pub const PAGE_SIZE_ENV: &str = "BLOB_TRANSFER_PAGE_SIZE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnvVar(&'static str),
    #[error("failed to read secret file {path}: {source}")]
    UnreadableSecretFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse secret file {path}: {source}")]
    MalformedSecretFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("secret file {path} has an empty {field} field")]
    EmptySecretField { path: PathBuf, field: &'static str },
    #[error("{PAGE_SIZE_ENV} is not a positive integer: {value}")]
    InvalidPageSize { value: String },
    #[error("{field} is not a valid container URI: {message}")]
    InvalidSasUri {
        field: &'static str,
        message: String,
    },
}

/// Configuration for one transfer run.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// SAS URI of the container that is listed and copied from.
    pub source_container_sas: String,
    /// SAS URI of the container that is copied into.
    pub target_container_sas: String,
    /// Page-size hint for the listing; `None` lets the service decide.
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SourceSecretFile {
    #[serde(rename = "sourceSasUri")]
    source_sas_uri: String,
}

#[derive(Debug, Deserialize)]
struct TargetSecretFile {
    #[serde(rename = "targetSasUri")]
    target_sas_uri: String,
}

/// Loads the run configuration from the environment.
pub fn load_from_env() -> Result<TransferConfig, ConfigError> {
    let source_path = secret_path(SOURCE_SECRET_PATH_ENV)?;
    let target_path = secret_path(TARGET_SECRET_PATH_ENV)?;
    info!(
        source_secret = %source_path.display(),
        target_secret = %target_path.display(),
        "loading transfer configuration"
    );

    let source: SourceSecretFile = read_secret(&source_path)?;
    if source.source_sas_uri.trim().is_empty() {
        return Err(ConfigError::EmptySecretField {
            path: source_path,
            field: "sourceSasUri",
        });
    }

    let target: TargetSecretFile = read_secret(&target_path)?;
    if target.target_sas_uri.trim().is_empty() {
        return Err(ConfigError::EmptySecretField {
            path: target_path,
            field: "targetSasUri",
        });
    }

    let page_size = match env::var(PAGE_SIZE_ENV) {
        Ok(raw) => Some(
            raw.parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidPageSize { value: raw })?,
        ),
        Err(_) => None,
    };

    let config = TransferConfig {
        source_container_sas: source.source_sas_uri,
        target_container_sas: target.target_sas_uri,
        page_size,
    };
    debug!(page_size = ?config.page_size, "configuration loaded");
    Ok(config)
}

fn secret_path(var: &'static str) -> Result<PathBuf, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(ConfigError::MissingEnvVar(var)),
    }
}

fn read_secret<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::UnreadableSecretFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::MalformedSecretFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn secret_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp secret file");
        file.write_all(contents.as_bytes()).expect("write secret");
        file
    }

    fn clear_env() {
        env::remove_var(SOURCE_SECRET_PATH_ENV);
        env::remove_var(TARGET_SECRET_PATH_ENV);
        env::remove_var(PAGE_SIZE_ENV);
    }

    #[test]
    #[serial]
    fn loads_both_sas_uris_from_secret_files() {
        clear_env();
        let source = secret_file(r#"{"sourceSasUri": "https://acct.example/source?sig=s"}"#);
        let target = secret_file(r#"{"targetSasUri": "https://acct.example/target?sig=t"}"#);
        env::set_var(SOURCE_SECRET_PATH_ENV, source.path());
        env::set_var(TARGET_SECRET_PATH_ENV, target.path());

        let config = load_from_env().expect("config should load");
        assert_eq!(
            config.source_container_sas,
            "https://acct.example/source?sig=s"
        );
        assert_eq!(
            config.target_container_sas,
            "https://acct.example/target?sig=t"
        );
        assert_eq!(config.page_size, None);
    }

    #[test]
    #[serial]
    fn missing_env_var_is_rejected() {
        clear_env();
        let err = load_from_env().expect_err("missing env vars should fail");
        assert!(matches!(
            err,
            ConfigError::MissingEnvVar(var) if var == SOURCE_SECRET_PATH_ENV
        ));
    }

    #[test]
    #[serial]
    fn malformed_secret_file_is_rejected() {
        clear_env();
        let source = secret_file("not json at all");
        let target = secret_file(r#"{"targetSasUri": "https://acct.example/target?sig=t"}"#);
        env::set_var(SOURCE_SECRET_PATH_ENV, source.path());
        env::set_var(TARGET_SECRET_PATH_ENV, target.path());

        let err = load_from_env().expect_err("malformed secret should fail");
        assert!(matches!(err, ConfigError::MalformedSecretFile { .. }));
    }

    #[test]
    #[serial]
    fn empty_sas_uri_is_rejected() {
        clear_env();
        let source = secret_file(r#"{"sourceSasUri": ""}"#);
        let target = secret_file(r#"{"targetSasUri": "https://acct.example/target?sig=t"}"#);
        env::set_var(SOURCE_SECRET_PATH_ENV, source.path());
        env::set_var(TARGET_SECRET_PATH_ENV, target.path());

        let err = load_from_env().expect_err("empty field should fail");
        assert!(matches!(
            err,
            ConfigError::EmptySecretField {
                field: "sourceSasUri",
                ..
            }
        ));
    }

    #[test]
    #[serial]
    fn page_size_must_be_a_positive_integer() {
        clear_env();
        let source = secret_file(r#"{"sourceSasUri": "https://acct.example/source?sig=s"}"#);
        let target = secret_file(r#"{"targetSasUri": "https://acct.example/target?sig=t"}"#);
        env::set_var(SOURCE_SECRET_PATH_ENV, source.path());
        env::set_var(TARGET_SECRET_PATH_ENV, target.path());
        env::set_var(PAGE_SIZE_ENV, "zero");

        let err = load_from_env().expect_err("non-numeric page size should fail");
        assert!(matches!(err, ConfigError::InvalidPageSize { .. }));

        env::set_var(PAGE_SIZE_ENV, "500");
        let config = load_from_env().expect("valid page size should load");
        assert_eq!(config.page_size, Some(500));
    }
}
