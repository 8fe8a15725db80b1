//! # Application Configuration
//!
//! Defaults plus environment overrides, resolved once at startup.
//!
//! ## Environment Variables
//! ```text
//! TILL_DB_PATH           SQLite file              default: till.db
//! TILL_MAX_CONNECTIONS   pool size                default: 5
//! TILL_STORE_NAME        ticket header            default: Till Store
//! TILL_STORE_ADDRESS     ticket header            default: (empty)
//! TILL_STORE_TAX_ID      ticket header            default: (empty)
//! TILL_STORE_PHONE       ticket header            default: (empty)
//! ```

use std::path::PathBuf;
use till_core::BusinessProfile;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub business: BusinessProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("till.db"),
            max_connections: 5,
            business: BusinessProfile::default(),
        }
    }
}

impl AppConfig {
    /// Loads from the process environment.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads from an arbitrary key lookup. Unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        if let Some(path) = get("TILL_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(raw) = get("TILL_MAX_CONNECTIONS") {
            config.max_connections = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(DbError::InvalidConfig {
                        key: "TILL_MAX_CONNECTIONS".to_string(),
                        message: format!("expected a positive integer, got '{}'", raw),
                    })
                }
            };
        }
        if let Some(name) = get("TILL_STORE_NAME") {
            config.business.name = name;
        }
        if let Some(address) = get("TILL_STORE_ADDRESS") {
            config.business.address = address;
        }
        if let Some(tax_id) = get("TILL_STORE_TAX_ID") {
            config.business.tax_id = tax_id;
        }
        if let Some(phone) = get("TILL_STORE_PHONE") {
            config.business.phone = phone;
        }

        debug!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            store = %config.business.name,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }

    pub fn business(&self) -> &BusinessProfile {
        &self.business
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.db_config().max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TILL_DB_PATH", "/var/lib/till/shop.db"),
            ("TILL_MAX_CONNECTIONS", "2"),
            ("TILL_STORE_NAME", "Almacén Don Pepe"),
            ("TILL_STORE_TAX_ID", " 20-12345678-9 "),
            ("TILL_STORE_PHONE", "   "),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/till/shop.db"));
        assert_eq!(config.db_config().max_connections, 2);
        assert_eq!(config.business().name, "Almacén Don Pepe");
        assert_eq!(config.business().tax_id, "20-12345678-9");
        assert_eq!(config.business().phone, "");
    }

    #[test]
    fn test_bad_pool_size() {
        for raw in ["0", "many", "-3"] {
            let err = AppConfig::from_lookup(lookup(&[("TILL_MAX_CONNECTIONS", raw)])).unwrap_err();
            assert!(matches!(err, DbError::InvalidConfig { ref key, .. } if key == "TILL_MAX_CONNECTIONS"));
        }
    }
}
