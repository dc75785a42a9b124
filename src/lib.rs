//! # sqlx-sqlite-read-only
//!
//! A process-wide read-only switch for SQLite databases opened through
//! [`sqlx_sqlite_conn_mgr`]. While engaged, every statement on every
//! connection is checked before it runs and writes are refused with
//! [`Error::WritesDisabled`]. Reads and transaction control still go through.
//!
//! ## Pieces
//!
//! - **Mode flag** ([`WriteMode`], [`read_only`]): one process-wide switch,
//!   set at startup from `SQLITE_READ_ONLY` and flipped with
//!   [`enable_writes`], [`disable_writes`] and [`temp_writes`]
//! - **Classifier** ([`should_block`]): literal prefix rule deciding what
//!   counts as a write
//! - **Write blocker** ([`WriteBlocker`]): execute wrapper that applies the
//!   rule on each statement
//! - **Installer** ([`Installer`], [`init`]): attaches the blocker exactly once
//!   to every connection, including ones opened later
//!
//! ## Usage
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_conn_mgr::connections;
//! use sqlx_sqlite_read_only::{ReadOnlyConfig, init_with, is_writes_disabled, temp_writes_guard};
//!
//! #[tokio::main]
//! async fn main() -> sqlx_sqlite_conn_mgr::Result<()> {
//!     init_with(ReadOnlyConfig { read_only: true });
//!
//!     let db = connections().connect("default", "example.db", None).await?;
//!
//!     // Reads pass
//!     let rows = db.fetch_all("SELECT * FROM users", vec![]).await?;
//!
//!     // Writes are refused
//!     let err = db
//!         .execute("DELETE FROM users", vec![])
//!         .await
//!         .unwrap_err();
//!     assert!(is_writes_disabled(&err));
//!
//!     // Unless explicitly allowed for a scope
//!     {
//!         let _writes = temp_writes_guard();
//!         db.execute("INSERT INTO users (name) VALUES (?)", vec![json!("Alice")])
//!             .await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! - Classification is literal prefix matching, with no SQL parsing, case
//!   folding or whitespace trimming
//! - Statements that bypass [`SqliteDatabase`](sqlx_sqlite_conn_mgr::SqliteDatabase)
//!   (e.g. raw sqlx calls on another pool) are not checked
//! - The mode is process-wide; scopes from [`temp_writes`] do not nest
//!
mod blocker;
mod classify;
mod config;
mod error;
mod install;
mod mode;

pub use blocker::WriteBlocker;
pub use classify::{ALLOWED_PREFIXES, ALLOWED_STATEMENTS, should_block};
pub use config::{READ_ONLY_ENV_VAR, ReadOnlyConfig};
pub use error::{Error, is_writes_disabled};
pub use install::{DISPATCH_UID, Installer, init, init_with, install, installer};
pub use mode::{
   TempWrites, WriteMode, disable_writes, enable_writes, mode, read_only, temp_writes,
   temp_writes_guard, with_temp_writes,
};
