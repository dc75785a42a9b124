//! Configuration for SQLite database connections

use serde::{Deserialize, Serialize};

/// Configuration for a [`SqliteDatabase`](crate::SqliteDatabase) connection
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::SqliteDatabaseConfig;
///
/// // Use defaults
/// let config = SqliteDatabaseConfig::default();
///
/// // Customize
/// let config = SqliteDatabaseConfig {
///     busy_timeout_secs: 10,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteDatabaseConfig {
   /// How long a statement waits on a locked database before failing (in
   /// seconds)
   ///
   /// The connection itself is held for the lifetime of the database and is
   /// never reaped while idle, so an open transaction survives any pause.
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         busy_timeout_secs: 5,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_default_busy_timeout() {
      assert_eq!(SqliteDatabaseConfig::default().busy_timeout_secs, 5);
   }

   #[test]
   fn test_deserialize_from_json() {
      let config: SqliteDatabaseConfig =
         serde_json::from_str(r#"{ "busy_timeout_secs": 1 }"#).unwrap();
      assert_eq!(config.busy_timeout_secs, 1);
   }
}
