//! # sqlx-sqlite-conn-mgr
//!
//! A small connection layer over SQLx for SQLite that lets other code hook
//! into every statement a database runs.
//!
//! ## Core Types
//!
//! - **[`Connections`]**: Registry of open databases keyed by alias, with
//!   connection-created notifications
//! - **[`SqliteDatabase`]**: One named connection with an ordered pipeline of execute wrappers
//! - **[`ExecuteWrapper`]**: Interception point invoked around every statement
//! - **[`SqliteDatabaseConfig`]**: Configuration for the connection
//! - **[`Error`]**: Error type for database operations
//!
//! ## Usage
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_conn_mgr::{SqliteDatabase, connections};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_conn_mgr::Result<()> {
//!     // Get notified about every database opened from now on
//!     connections().on_connection_created(
//!         "log-connections",
//!         Arc::new(|db: &Arc<SqliteDatabase>| println!("opened {}", db.alias())),
//!     );
//!
//!     let db = connections().connect("default", "example.db", None).await?;
//!
//!     // Connecting the same alias again returns the same instance
//!     let again = connections().connect("default", "example.db", None).await?;
//!     assert!(Arc::ptr_eq(&db, &again));
//!
//!     db.execute("INSERT INTO users (name) VALUES (?)", vec![json!("Alice")])
//!         .await?;
//!     let rows = db.fetch_all("SELECT * FROM users", vec![]).await?;
//!
//!     connections().close_all().await;
//!     Ok(())
//! }
//! ```
//!
mod config;
mod database;
mod decode;
mod error;
mod registry;
mod wrapper;

// Re-export public types
pub use config::SqliteDatabaseConfig;
pub use database::SqliteDatabase;
pub use decode::bind_value;
pub use error::Error;
pub use registry::{ConnectionCreatedListener, Connections, connections};
pub use wrapper::{
   ConnectionId, ExecuteContext, ExecuteWrapper, JsonRow, Next, Params, QueryOutput,
   StatementKind, WriteQueryResult,
};

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
