//! Replica configuration
//!
//! Two sources, same result:
//! - environment variables (`ReplicaConfig::from_env`)
//! - a versioned YAML file (`ReplicaConfig::from_yaml`, `version: 1`)
//!
//! A store without a URL is not a startup error; opening it fails later with
//! a connection failure, and only when a use case actually needs it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tournament_storage::schema::DEFAULT_KEYSPACE;

/// Supported YAML schema versions
pub const SUPPORTED_VERSIONS: [u32; 1] = [1];

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// ═══════════════════════════════════════════════════════════════════════════
// Per-store sections
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationalConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WideColumnConfig {
    pub host: String,
    pub port: u16,
    pub keyspace: String,
}

impl Default for WideColumnConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9042,
            keyspace: DEFAULT_KEYSPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DocumentConfig {
    pub uri: Option<String>,
    pub database: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "fifa_db".to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GraphConfig {
    pub uri: Option<String>,
    pub user: String,
    pub password: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: None,
            user: "neo4j".to_string(),
            password: None,
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionConfig {
    pub url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ReplicaConfig
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    pub relational: RelationalConfig,
    pub wide_column: WideColumnConfig,
    pub documents: DocumentConfig,
    pub graph: GraphConfig,
    pub sessions: SessionConfig,
    pub connect_timeout_ms: u64,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            relational: RelationalConfig::default(),
            wide_column: WideColumnConfig::default(),
            documents: DocumentConfig::default(),
            graph: GraphConfig::default(),
            sessions: SessionConfig::default(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// YAML schema v1
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    version: Option<u32>,
    #[serde(default)]
    relational: RelationalConfig,
    #[serde(default)]
    wide_column: WideColumnConfig,
    #[serde(default)]
    documents: DocumentConfig,
    #[serde(default)]
    graph: GraphConfig,
    #[serde(default)]
    sessions: SessionConfig,
    connect_timeout_ms: Option<u64>,
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })
}

impl ReplicaConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("CASSANDRA_PORT") {
            Some(raw) => parse_number::<u16>("CASSANDRA_PORT", raw)?,
            None => defaults.wide_column.port,
        };
        let connect_timeout_ms = match get("REPLICA_CONNECT_TIMEOUT_MS") {
            Some(raw) => parse_number::<u64>("REPLICA_CONNECT_TIMEOUT_MS", raw)?,
            None => defaults.connect_timeout_ms,
        };

        Ok(Self {
            relational: RelationalConfig {
                url: get("DATABASE_URL"),
            },
            wide_column: WideColumnConfig {
                host: get("CASSANDRA_HOST").unwrap_or(defaults.wide_column.host),
                port,
                keyspace: get("CASSANDRA_KEYSPACE").unwrap_or(defaults.wide_column.keyspace),
            },
            documents: DocumentConfig {
                uri: get("MONGODB_URI"),
                database: get("MONGODB_DATABASE").unwrap_or(defaults.documents.database),
            },
            graph: GraphConfig {
                uri: get("NEO4J_URI"),
                user: get("NEO4J_USER").unwrap_or(defaults.graph.user),
                password: get("NEO4J_PASSWORD"),
            },
            sessions: SessionConfig {
                url: get("REDIS_URL").unwrap_or(defaults.sessions.url),
            },
            connect_timeout_ms,
        })
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        Ok(Self {
            relational: file.relational,
            wide_column: file.wide_column,
            documents: file.documents,
            graph: file.graph,
            sessions: file.sessions,
            connect_timeout_ms: file
                .connect_timeout_ms
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ReplicaConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReplicaConfig::default());
        assert_eq!(config.wide_column.keyspace, "fifa_db");
        assert_eq!(config.sessions.url, "redis://127.0.0.1:6379");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert!(config.relational.url.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = ReplicaConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://fifa@db/fifa"),
            ("CASSANDRA_HOST", "cass-1"),
            ("CASSANDRA_PORT", "19042"),
            ("NEO4J_URI", "bolt://graph:7687"),
            ("NEO4J_PASSWORD", "secret"),
            ("MONGODB_URI", "  "),
            ("REPLICA_CONNECT_TIMEOUT_MS", "750"),
        ]))
        .unwrap();

        assert_eq!(config.relational.url.as_deref(), Some("postgres://fifa@db/fifa"));
        assert_eq!(config.wide_column.host, "cass-1");
        assert_eq!(config.wide_column.port, 19042);
        assert_eq!(config.graph.password.as_deref(), Some("secret"));
        assert!(config.documents.uri.is_none());
        assert_eq!(config.connect_timeout_ms, 750);
    }

    #[test]
    fn test_malformed_port_is_rejected() {
        let err = ReplicaConfig::from_lookup(lookup(&[("CASSANDRA_PORT", "ninety")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "CASSANDRA_PORT");
                assert_eq!(value, "ninety");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_graph_password() {
        let mut config = ReplicaConfig::default();
        config.graph.password = Some("hunter2".to_string());
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_yaml_loading() {
        let yaml_content = r#"
version: 1
relational:
  url: postgres://fifa@localhost/fifa
wide_column:
  host: scylla
graph:
  uri: bolt://localhost:7687
  password: pw
connect_timeout_ms: 2000
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = ReplicaConfig::from_yaml(temp_file.path()).unwrap();
        assert_eq!(config.wide_column.host, "scylla");
        assert_eq!(config.wide_column.port, 9042);
        assert_eq!(config.graph.user, "neo4j");
        assert_eq!(config.connect_timeout_ms, 2000);
    }

    #[test]
    fn test_yaml_missing_version() {
        let err = ReplicaConfig::from_yaml_str("relational:\n  url: postgres://x\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVersion));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let err = ReplicaConfig::from_yaml_str("version: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 2, .. }));
        assert!(err.to_string().contains("Supported versions: 1"));
    }

    #[test]
    fn test_yaml_unknown_field_rejected() {
        let err = ReplicaConfig::from_yaml_str("version: 1\nkafka:\n  brokers: x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_yaml_missing_file() {
        let err = ReplicaConfig::from_yaml("/nonexistent/replica.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
