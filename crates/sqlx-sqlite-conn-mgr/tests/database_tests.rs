use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::json;
use sqlx_sqlite_conn_mgr::{
   Connections, Error, ExecuteContext, ExecuteWrapper, Next, Params, QueryOutput, Result,
   SqliteDatabase, SqliteDatabaseConfig, StatementKind,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Records every statement it sees under a label, then forwards it
struct Recorder {
   label: &'static str,
   log: Arc<Mutex<Vec<String>>>,
}

impl ExecuteWrapper for Recorder {
   fn call<'a>(
      &'a self,
      execute: Next<'a>,
      sql: &'a str,
      params: &'a [Params],
      many: bool,
      context: &'a ExecuteContext,
   ) -> BoxFuture<'a, Result<QueryOutput>> {
      self.log.lock().push(format!(
         "{}:{}:{}:{:?}",
         self.label,
         sql,
         many,
         context.kind
      ));
      execute.run(sql, params, many, context)
   }
}

#[derive(Debug, thiserror::Error)]
#[error("rejected by test wrapper")]
struct TestRejection;

/// Refuses every statement
struct RejectAll;

impl ExecuteWrapper for RejectAll {
   fn call<'a>(
      &'a self,
      _execute: Next<'a>,
      _sql: &'a str,
      _params: &'a [Params],
      _many: bool,
      _context: &'a ExecuteContext,
   ) -> BoxFuture<'a, Result<QueryOutput>> {
      Box::pin(async { Err(Error::rejected(TestRejection)) })
   }
}

async fn create_test_db(alias: &str) -> (Connections, Arc<SqliteDatabase>, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let connections = Connections::new();
   let db = connections
      .connect(alias, temp_dir.path().join("test.db"), None)
      .await
      .expect("Failed to connect to test database");

   (connections, db, temp_dir)
}

#[tokio::test]
async fn test_execute_and_fetch() {
   let (_connections, db, _temp) = create_test_db("default").await;

   let result = db
      .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", vec![])
      .await
      .unwrap();

   assert_eq!(result.rows_affected, 0);

   let result = db
      .execute("INSERT INTO t (name) VALUES (?)", vec![json!("Alice")])
      .await
      .unwrap();

   assert_eq!((result.rows_affected, result.last_insert_id), (1, 1));

   let rows = db
      .fetch_all("SELECT id, name FROM t WHERE name = ?", vec![json!("Alice")])
      .await
      .unwrap();

   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["id"], json!(1));
   assert_eq!(rows[0]["name"], json!("Alice"));

   // Columns come back in select order
   let columns: Vec<&String> = rows[0].keys().collect();
   assert_eq!(columns, ["id", "name"]);
}

#[tokio::test]
async fn test_execute_many_sums_rows_affected() {
   let (_connections, db, _temp) = create_test_db("default").await;

   db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", vec![])
      .await
      .unwrap();

   let result = db
      .execute_many(
         "INSERT INTO t (name) VALUES (?)",
         vec![vec![json!("a")], vec![json!("b")], vec![json!("c")]],
      )
      .await
      .unwrap();

   assert_eq!((result.rows_affected, result.last_insert_id), (3, 3));

   let result = db.execute_many("DELETE FROM t", vec![]).await.unwrap();
   assert_eq!(result.rows_affected, 0, "Empty batch runs nothing");
}

#[tokio::test]
async fn test_transaction_control_shares_one_session() {
   let (_connections, db, _temp) = create_test_db("default").await;

   db.execute("CREATE TABLE t (id INTEGER)", vec![])
      .await
      .unwrap();

   db.execute("BEGIN", vec![]).await.unwrap();
   db.execute("INSERT INTO t VALUES (1)", vec![]).await.unwrap();
   db.execute("SAVEPOINT sp", vec![]).await.unwrap();
   db.execute("INSERT INTO t VALUES (2)", vec![]).await.unwrap();
   db.execute("ROLLBACK TO SAVEPOINT sp", vec![]).await.unwrap();
   db.execute("RELEASE SAVEPOINT sp", vec![]).await.unwrap();
   db.execute("COMMIT", vec![]).await.unwrap();

   let rows = db.fetch_all("SELECT id FROM t", vec![]).await.unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["id"], json!(1));
}

#[tokio::test]
async fn test_idle_transaction_keeps_its_session() {
   let temp_dir = TempDir::new().unwrap();
   let connections = Connections::new();
   let db = connections
      .connect(
         "default",
         temp_dir.path().join("idle.db"),
         Some(SqliteDatabaseConfig {
            busy_timeout_secs: 1,
         }),
      )
      .await
      .unwrap();

   db.execute("CREATE TABLE t (id INTEGER)", vec![])
      .await
      .unwrap();

   db.execute("BEGIN", vec![]).await.unwrap();
   db.execute("INSERT INTO t VALUES (1)", vec![]).await.unwrap();
   tokio::time::sleep(Duration::from_secs(3)).await;
   db.execute("COMMIT", vec![]).await.unwrap();

   let rows = db
      .fetch_all("SELECT COUNT(*) AS n FROM t", vec![])
      .await
      .unwrap();
   assert_eq!(rows[0]["n"], json!(1));
}

#[tokio::test]
async fn test_wrappers_run_in_order_outermost_first() {
   let (_connections, db, _temp) = create_test_db("ordered").await;
   let log = Arc::new(Mutex::new(Vec::new()));

   db.add_execute_wrapper(Arc::new(Recorder {
      label: "first",
      log: Arc::clone(&log),
   }));
   db.add_execute_wrapper(Arc::new(Recorder {
      label: "second",
      log: Arc::clone(&log),
   }));

   assert_eq!(db.execute_wrapper_count(), 2);

   db.fetch_all("SELECT 1", vec![]).await.unwrap();
   db.execute_many("CREATE TABLE IF NOT EXISTS t (id INTEGER)", vec![vec![]])
      .await
      .unwrap();

   assert_eq!(
      *log.lock(),
      vec![
         "first:SELECT 1:false:Fetch".to_string(),
         "second:SELECT 1:false:Fetch".to_string(),
         "first:CREATE TABLE IF NOT EXISTS t (id INTEGER):true:Execute".to_string(),
         "second:CREATE TABLE IF NOT EXISTS t (id INTEGER):true:Execute".to_string(),
      ]
   );
}

#[tokio::test]
async fn test_rejecting_wrapper_stops_the_chain() {
   let (_connections, db, _temp) = create_test_db("rejecting").await;
   let log = Arc::new(Mutex::new(Vec::new()));

   db.add_execute_wrapper(Arc::new(RejectAll));
   db.add_execute_wrapper(Arc::new(Recorder {
      label: "inner",
      log: Arc::clone(&log),
   }));

   let err = db
      .execute("CREATE TABLE t (id INTEGER)", vec![])
      .await
      .unwrap_err();

   assert!(err.rejection::<TestRejection>().is_some());
   assert!(log.lock().is_empty(), "Inner wrapper must not be reached");
}

#[tokio::test]
async fn test_context_carries_connection_identity() {
   struct Capture(Arc<Mutex<Option<ExecuteContext>>>);

   impl ExecuteWrapper for Capture {
      fn call<'a>(
         &'a self,
         execute: Next<'a>,
         sql: &'a str,
         params: &'a [Params],
         many: bool,
         context: &'a ExecuteContext,
      ) -> BoxFuture<'a, Result<QueryOutput>> {
         *self.0.lock() = Some(context.clone());
         execute.run(sql, params, many, context)
      }
   }

   let (_connections, db, _temp) = create_test_db("reports").await;
   let seen = Arc::new(Mutex::new(None));
   db.add_execute_wrapper(Arc::new(Capture(Arc::clone(&seen))));

   db.execute("CREATE TABLE t (id INTEGER)", vec![])
      .await
      .unwrap();

   let context = seen.lock().clone().unwrap();
   assert_eq!(context.alias, "reports");
   assert_eq!(context.connection_id, db.id());
   assert_eq!(context.kind, StatementKind::Execute);
}

#[tokio::test]
async fn test_database_closed_error() {
   let (connections, db, _temp) = create_test_db("default").await;

   assert!(connections.close("default").await.unwrap());
   assert!(db.is_closed());

   let result = db.fetch_all("SELECT 1", vec![]).await;
   assert!(matches!(result.unwrap_err(), Error::DatabaseClosed));

   // Closing again is a no-op
   assert!(!connections.close("default").await.unwrap());
   db.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_path_rejected() {
   let connections = Connections::new();
   let result = connections.connect("default", "", None).await;

   assert!(matches!(result.unwrap_err(), Error::Io(_)));
   assert!(connections.get("default").is_none());
}

#[tokio::test]
async fn test_custom_config() {
   let temp_dir = TempDir::new().unwrap();
   let connections = Connections::new();

   let db = connections
      .connect(
         "default",
         temp_dir.path().join("custom.db"),
         Some(SqliteDatabaseConfig {
            busy_timeout_secs: 10,
         }),
      )
      .await
      .unwrap();

   db.fetch_all("SELECT 1", vec![]).await.unwrap();
   connections.close_all().await;
   assert!(db.is_closed());
}

#[tokio::test]
async fn test_blob_and_null_decoding() {
   let (_connections, db, _temp) = create_test_db("default").await;

   db.execute("CREATE TABLE b (data BLOB, note TEXT, ratio REAL)", vec![])
      .await
      .unwrap();
   db.execute(
      "INSERT INTO b (data, note, ratio) VALUES (X'68656C6C6F', ?, ?)",
      vec![json!(null), json!(0.5)],
   )
   .await
   .unwrap();

   let rows = db
      .fetch_all("SELECT data, note, ratio FROM b", vec![])
      .await
      .unwrap();

   assert_eq!(rows[0]["data"], json!("aGVsbG8="));
   assert_eq!(rows[0]["note"], json!(null));
   assert_eq!(rows[0]["ratio"], json!(0.5));
}
