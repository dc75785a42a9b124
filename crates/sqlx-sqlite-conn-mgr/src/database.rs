//! A single named SQLite connection with an execute-wrapper pipeline

use crate::Result;
use crate::config::SqliteDatabaseConfig;
use crate::error::Error;
use crate::wrapper::{
   ConnectionId, ExecuteContext, ExecuteWrapper, JsonRow, Next, Params, QueryOutput,
   StatementKind, WriteQueryResult,
};
use parking_lot::RwLock;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One open connection to a SQLite database, addressed by an alias.
///
/// Every statement run through [`execute`](Self::execute),
/// [`execute_many`](Self::execute_many) or [`fetch_all`](Self::fetch_all)
/// passes through the database's execute wrappers in order before reaching
/// sqlx.
///
/// The backing pool holds a single connection, so consecutive statements
/// (including `BEGIN`, `COMMIT` and savepoints) share one SQLite session.
///
/// Databases are normally opened through
/// [`Connections::connect`](crate::Connections::connect), which also notifies
/// connection-created listeners.
pub struct SqliteDatabase {
   /// Identity of this connection, fresh on every open
   id: ConnectionId,

   /// Name the database is registered under
   alias: String,

   /// Single read-write connection pool (max_connections=1)
   pool: Pool<Sqlite>,

   /// Ordered outgoing-statement guards, outermost first
   execute_wrappers: RwLock<Vec<Arc<dyn ExecuteWrapper>>>,

   /// Marks database as closed to prevent further operations
   closed: AtomicBool,

   /// Path to database file
   path: PathBuf,
}

impl SqliteDatabase {
   /// Open a connection to the SQLite file at `path`, creating it if missing.
   pub(crate) async fn open(
      alias: &str,
      path: &Path,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Self> {
      let config = custom_config.unwrap_or_default();

      if path.as_os_str().is_empty() {
         return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Database path cannot be empty",
         )));
      }

      let options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(true)
         .read_only(false)
         .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

      // One connection, opened eagerly and never reaped, so transaction
      // control statements keep applying to the same session
      let pool = SqlitePoolOptions::new()
         .max_connections(1)
         .min_connections(1)
         .idle_timeout(None)
         .max_lifetime(None)
         .connect_with(options)
         .await?;

      let id = ConnectionId::new();
      debug!(alias, %id, path = %path.display(), "Opened database");

      Ok(Self {
         id,
         alias: alias.to_string(),
         pool,
         execute_wrappers: RwLock::new(Vec::new()),
         closed: AtomicBool::new(false),
         path: path.to_path_buf(),
      })
   }

   /// Identity of this connection
   pub fn id(&self) -> ConnectionId {
      self.id
   }

   /// Alias this database was connected under
   pub fn alias(&self) -> &str {
      &self.alias
   }

   /// Path to the database file
   pub fn path(&self) -> &Path {
      &self.path
   }

   pub fn is_closed(&self) -> bool {
      self.closed.load(Ordering::SeqCst)
   }

   /// Append a wrapper to the end of this database's pipeline.
   ///
   /// No deduplication happens here; callers that must attach at most once
   /// track that themselves.
   pub fn add_execute_wrapper(&self, wrapper: Arc<dyn ExecuteWrapper>) {
      self.execute_wrappers.write().push(wrapper);
   }

   /// Number of wrappers currently in the pipeline
   pub fn execute_wrapper_count(&self) -> usize {
      self.execute_wrappers.read().len()
   }

   /// Run a statement for its effect (INSERT, UPDATE, DDL, BEGIN, ...).
   ///
   /// # Example
   ///
   /// ```no_run
   /// use serde_json::json;
   /// use sqlx_sqlite_conn_mgr::connections;
   ///
   /// # async fn example() -> sqlx_sqlite_conn_mgr::Result<()> {
   /// let db = connections().connect("default", "app.db", None).await?;
   /// let result = db
   ///    .execute("INSERT INTO users (name) VALUES (?)", vec![json!("Alice")])
   ///    .await?;
   /// println!("Inserted row {}", result.last_insert_id);
   /// # Ok(())
   /// # }
   /// ```
   pub async fn execute(&self, sql: &str, params: Params) -> Result<WriteQueryResult> {
      let output = self
         .run(sql, &[params], false, StatementKind::Execute)
         .await?;
      Ok(written(output))
   }

   /// Run a statement once per parameter set on a single connection.
   ///
   /// `rows_affected` is summed across the batch; `last_insert_id` is the
   /// value after the final execution.
   pub async fn execute_many(
      &self,
      sql: &str,
      param_sets: Vec<Params>,
   ) -> Result<WriteQueryResult> {
      let output = self
         .run(sql, &param_sets, true, StatementKind::Execute)
         .await?;
      Ok(written(output))
   }

   /// Run a query and decode every row to JSON.
   pub async fn fetch_all(&self, sql: &str, params: Params) -> Result<Vec<JsonRow>> {
      match self.run(sql, &[params], false, StatementKind::Fetch).await? {
         QueryOutput::Rows(rows) => Ok(rows),
         QueryOutput::Written(_) => Ok(Vec::new()),
      }
   }

   async fn run(
      &self,
      sql: &str,
      params: &[Params],
      many: bool,
      kind: StatementKind,
   ) -> Result<QueryOutput> {
      if self.is_closed() {
         return Err(Error::DatabaseClosed);
      }

      // Snapshot so the lock is not held while the statement runs
      let wrappers = self.execute_wrappers.read().clone();
      let context = ExecuteContext {
         alias: self.alias.clone(),
         connection_id: self.id,
         kind,
      };

      Next::new(&wrappers, &self.pool)
         .run(sql, params, many, &context)
         .await
   }

   /// Close the connection.
   ///
   /// After calling close, any statement on this database returns
   /// `Error::DatabaseClosed`. Prefer [`Connections::close`](crate::Connections::close),
   /// which also unregisters the alias.
   pub async fn close(&self) -> Result<()> {
      if self.closed.swap(true, Ordering::SeqCst) {
         return Ok(());
      }

      self.pool.close().await;
      debug!(alias = %self.alias, id = %self.id, "Closed database");

      Ok(())
   }
}

// A wrapper may substitute its own output; an execute call that gets rows
// back reports nothing written.
fn written(output: QueryOutput) -> WriteQueryResult {
   match output {
      QueryOutput::Written(result) => result,
      QueryOutput::Rows(_) => WriteQueryResult::default(),
   }
}

impl fmt::Debug for SqliteDatabase {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("SqliteDatabase")
         .field("id", &self.id)
         .field("alias", &self.alias)
         .field("path", &self.path)
         .field("execute_wrappers", &self.execute_wrapper_count())
         .field("closed", &self.is_closed())
         .finish()
   }
}
