// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-capability storage configuration.
//!
//! Each factory call takes one of these by value. Defaults match a stock
//! single-host deployment: redis db 10 for data, mysql `tarifa` for stor.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Connection parameters shared by every backend family.
///
/// Apart from `marshaler`, every field also accepts a bare number, so
/// `port: 6380` in YAML or `..._CONN__NAME=3` in the environment load the
/// same as their quoted forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    #[serde(deserialize_with = "string_or_number")]
    pub host: String,
    /// Empty means the backend's own default port.
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    /// Database name; the key-value family reads it as a numeric index.
    #[serde(deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user: String,
    #[serde(deserialize_with = "string_or_number")]
    pub pass: String,
    /// Value encoding tag, see [`crate::marshal::Marshaler`].
    pub marshaler: String,
}

impl ConnectionParams {
    /// `host:port`, or `host` alone when no port is configured. A bare IPv6
    /// host is bracketed before the port is added.
    pub fn address(&self) -> String {
        if self.port.is_empty() {
            self.host.clone()
        } else if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Read a string field that config sources may hand over as a scalar.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct Scalar;

    impl Visitor<'_> for Scalar {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(Scalar)
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: String::new(),
            name: String::new(),
            user: String::new(),
            pass: String::new(),
            marshaler: "json".to_string(),
        }
    }
}

/// Size limit of one cache partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePartition {
    /// `None` is unbounded, `Some(0)` disables the partition.
    pub limit: Option<usize>,
}

impl CachePartition {
    pub fn disabled() -> Self {
        Self { limit: Some(0) }
    }

    pub fn is_disabled(&self) -> bool {
        self.limit == Some(0)
    }
}

/// Cache partitions of the primary store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub stat_queue_profiles: CachePartition,
    pub load_history: CachePartition,
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            stat_queue_profiles: CachePartition::disabled(),
            load_history: CachePartition::disabled(),
        }
    }
}

/// Primary-store (`data_db`) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDbConfig {
    /// Backend tag: `redis` or `mongo`.
    pub db_type: String,
    pub conn: ConnectionParams,
    pub cache: CacheConfig,
    /// Number of load instances kept in the load history.
    pub load_history_size: usize,
}

impl Default for DataDbConfig {
    fn default() -> Self {
        Self {
            db_type: "redis".to_string(),
            conn: ConnectionParams {
                port: "6379".to_string(),
                name: "10".to_string(),
                ..ConnectionParams::default()
            },
            cache: CacheConfig::default(),
            load_history_size: 10,
        }
    }
}

/// Connection pool settings of the SQL families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Zero means unlimited.
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    /// Zero means connections are reused forever.
    pub conn_max_lifetime_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_conns: 100,
            max_idle_conns: 10,
            conn_max_lifetime_secs: 0,
        }
    }
}

/// Configuration shared by the generic, bulk-load and CDR stores (`stor_db`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorDbConfig {
    /// Backend tag: `mysql`, `mongo` or `postgres`.
    pub db_type: String,
    pub conn: ConnectionParams,
    pub pool: PoolConfig,
    /// Extra CDR fields to index (document family).
    pub cdrs_indexes: Vec<String>,
}

impl Default for StorDbConfig {
    fn default() -> Self {
        Self {
            db_type: "mysql".to_string(),
            conn: ConnectionParams {
                port: "3306".to_string(),
                name: "tarifa".to_string(),
                user: "tarifa".to_string(),
                ..ConnectionParams::default()
            },
            pool: PoolConfig::default(),
            cdrs_indexes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_with_port() {
        let conn = ConnectionParams {
            host: "db.example.com".to_string(),
            port: "6379".to_string(),
            ..Default::default()
        };
        assert_eq!(conn.address(), "db.example.com:6379");
    }

    #[test]
    fn test_address_without_port() {
        let conn = ConnectionParams {
            host: "db.example.com".to_string(),
            port: String::new(),
            ..Default::default()
        };
        assert_eq!(conn.address(), "db.example.com");
    }

    #[test]
    fn test_address_ipv6_host() {
        let mut conn = ConnectionParams {
            host: "::1".to_string(),
            port: "6380".to_string(),
            ..Default::default()
        };
        assert_eq!(conn.address(), "[::1]:6380");

        conn.host = "[::1]".to_string();
        assert_eq!(conn.address(), "[::1]:6380");

        conn.port = String::new();
        conn.host = "::1".to_string();
        assert_eq!(conn.address(), "::1");
    }

    #[test]
    fn test_defaults() {
        let data = DataDbConfig::default();
        assert_eq!(data.db_type, "redis");
        assert_eq!(data.conn.name, "10");
        assert_eq!(data.load_history_size, 10);
        assert!(!data.cache.stat_queue_profiles.is_disabled());

        let stor = StorDbConfig::default();
        assert_eq!(stor.db_type, "mysql");
        assert_eq!(stor.pool.max_open_conns, 100);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: DataDbConfig =
            serde_json::from_str(r#"{"db_type":"mongo","conn":{"name":"tarifa"}}"#).unwrap();
        assert_eq!(cfg.db_type, "mongo");
        assert_eq!(cfg.conn.host, "127.0.0.1");
        assert_eq!(cfg.conn.marshaler, "json");
        assert_eq!(cfg.load_history_size, 10);
    }

    #[test]
    fn test_numeric_connection_fields() {
        let cfg: DataDbConfig = serde_json::from_str(
            r#"{"conn":{"host":"db.example.com","port":6380,"name":3,"pass":1234}}"#,
        )
        .unwrap();
        assert_eq!(cfg.conn.port, "6380");
        assert_eq!(cfg.conn.name, "3");
        assert_eq!(cfg.conn.pass, "1234");
        assert_eq!(cfg.conn.address(), "db.example.com:6380");
    }

    #[test]
    fn test_non_scalar_connection_field_rejected() {
        let err = serde_json::from_str::<ConnectionParams>(r#"{"port":[6380]}"#).unwrap_err();
        assert!(err.to_string().contains("a string or a number"));
    }
}
