use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::errors::StoreError;
use crate::driver::{Driver, WriteAcknowledgement};

pub const DEFAULT_CONNECTION_STRING: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "test";

/// Settings for [`DocumentStore::connect_with_config`](crate::DocumentStore::connect_with_config).
///
/// The connection string is opaque to this crate: timeouts, TLS, credentials
/// and pool sizes go in the URI and are interpreted by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub connection_string: String,
    pub database: String,
    pub write_concern: WriteAcknowledgement,
    /// Ping the server while connecting so an unreachable cluster or rejected
    /// credentials fail in `connect` instead of on the first query.
    pub verify_on_connect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_string: DEFAULT_CONNECTION_STRING.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            write_concern: WriteAcknowledgement::Acknowledged,
            verify_on_connect: true,
        }
    }
}

impl ConnectionConfig {
    pub fn new(connection_string: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn write_concern(mut self, write_concern: WriteAcknowledgement) -> Self {
        self.write_concern = write_concern;
        self
    }

    pub fn verify_on_connect(mut self, verify: bool) -> Self {
        self.verify_on_connect = verify;
        self
    }

    /// Defaults overridden by `DOCSTORE_URI`, `DOCSTORE_DATABASE`,
    /// `DOCSTORE_WRITE_CONCERN` and `DOCSTORE_VERIFY_ON_CONNECT`. Empty
    /// variables are ignored.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(uri) = var("DOCSTORE_URI") {
            config.connection_string = uri;
        }
        if let Some(database) = var("DOCSTORE_DATABASE") {
            config.database = database;
        }
        if let Some(write) = var("DOCSTORE_WRITE_CONCERN") {
            config.write_concern = write
                .parse()
                .map_err(|e| StoreError::Config(format!("DOCSTORE_WRITE_CONCERN: {e}")))?;
        }
        if let Some(verify) = var("DOCSTORE_VERIFY_ON_CONNECT") {
            config.verify_on_connect = parse_flag(&verify).ok_or_else(|| {
                StoreError::Config(format!(
                    "DOCSTORE_VERIFY_ON_CONNECT: expected true or false, got '{verify}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_json_file<P>(path: P) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, StoreError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.connection_string.trim().is_empty() {
            return Err(StoreError::Config("connection string is empty".into()));
        }
        if self.database.trim().is_empty() {
            return Err(StoreError::Config("database name is empty".into()));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared handle on a driver. Clones share the same driver and its pool.
#[derive(Clone)]
pub struct Connection {
    driver: Arc<dyn Driver>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver)
            .finish()
    }
}

impl Connection {
    pub fn new<D>(driver: D) -> Self
    where
        D: Driver + 'static,
    {
        Self {
            driver: Arc::new(driver),
        }
    }

    pub fn from_shared(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Check that the server answers.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.driver.ping().map_err(StoreError::Connection)
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ConnectionConfig::from_lookup(lookup_from(&[
            ("DOCSTORE_URI", "mongodb://db.internal:27017"),
            ("DOCSTORE_DATABASE", "orders"),
            ("DOCSTORE_WRITE_CONCERN", "unacknowledged"),
            ("DOCSTORE_VERIFY_ON_CONNECT", "off"),
        ]))
        .unwrap();
        assert_eq!(config.connection_string, "mongodb://db.internal:27017");
        assert_eq!(config.database, "orders");
        assert_eq!(config.write_concern, WriteAcknowledgement::Unacknowledged);
        assert!(!config.verify_on_connect);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config =
            ConnectionConfig::from_lookup(lookup_from(&[("DOCSTORE_DATABASE", "")])).unwrap();
        assert_eq!(config, ConnectionConfig::default());
    }

    #[test]
    fn bad_env_values_are_config_errors() {
        let err = ConnectionConfig::from_lookup(lookup_from(&[("DOCSTORE_WRITE_CONCERN", "w3")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
        let err =
            ConnectionConfig::from_lookup(lookup_from(&[("DOCSTORE_VERIFY_ON_CONNECT", "maybe")]))
                .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn json_file_with_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"database": "inventory", "write_concern": "unacknowledged"}}"#
        )
        .unwrap();

        let config = ConnectionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.connection_string, DEFAULT_CONNECTION_STRING);
        assert_eq!(config.database, "inventory");
        assert_eq!(config.write_concern, WriteAcknowledgement::Unacknowledged);
        assert!(config.verify_on_connect);
    }

    #[test]
    fn json_rejects_unknown_keys_and_empty_names() {
        assert!(ConnectionConfig::from_json_str(r#"{"databse": "x"}"#).is_err());
        assert!(ConnectionConfig::from_json_str(r#"{"database": " "}"#).is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ConnectionConfig::from_json_file(tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn builder_setters() {
        let config = ConnectionConfig::new("mongodb://h", "db")
            .write_concern(WriteAcknowledgement::Unacknowledged)
            .verify_on_connect(false);
        assert_eq!(config.connection_string, "mongodb://h");
        assert_eq!(config.write_concern, WriteAcknowledgement::Unacknowledged);
        assert!(!config.verify_on_connect);
    }
}
