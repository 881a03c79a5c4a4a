//! Configuration for the audit engine

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// Configuration for the audit engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Database connection URL (MySQL/TiDB, or SQLite for tests)
    pub database_url: String,

    /// Maximum database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Database connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Enable SQL query logging
    #[serde(default)]
    pub enable_sql_logging: bool,
}

impl AuditConfig {
    /// Config for the given database URL with default pool settings
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Read the configuration from the AUDIT_DATABASE_URL environment variable
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("AUDIT_DATABASE_URL").map_err(|_| {
            AuditError::InvalidInput("AUDIT_DATABASE_URL not set".to_string())
        })?;
        Ok(Self::new(database_url))
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: default_max_connections(),
            connection_timeout_secs: default_connection_timeout(),
            enable_sql_logging: false,
        }
    }
}

fn default_max_connections() -> u32 {
    50
}

fn default_connection_timeout() -> u64 {
    30
}
