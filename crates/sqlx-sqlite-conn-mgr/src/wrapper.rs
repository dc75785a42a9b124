//! Execute wrappers: interception points around every statement a database runs
//!
//! Each [`SqliteDatabase`](crate::SqliteDatabase) owns an ordered sequence of
//! [`ExecuteWrapper`]s. Running a statement builds a [`Next`] over that
//! sequence; the first wrapper is outermost and receives a handle to the rest
//! of the chain. The last link in the chain performs the real sqlx call.
//!
//! ```text
//! execute(sql) ──► wrapper[0] ──► wrapper[1] ──► ... ──► sqlx
//!                      │
//!                      └─► Err(..) (statement never reaches sqlx)
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::Result;
use crate::decode::{bind_value, decode_row};

/// Positional parameters for one execution of a statement
pub type Params = Vec<JsonValue>;

/// A decoded result row, columns in select order
pub type JsonRow = IndexMap<String, JsonValue>;

/// Identity of one opened database connection
///
/// Every call that opens a database produces a fresh id, so an alias that is
/// closed and reconnected is a different connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
   pub(crate) fn new() -> Self {
      Self(Uuid::new_v4())
   }
}

impl fmt::Display for ConnectionId {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      self.0.fmt(f)
   }
}

/// Whether a statement is run for its effect or for its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
   Execute,
   Fetch,
}

/// Where a statement is being executed
#[derive(Debug, Clone)]
pub struct ExecuteContext {
   pub alias: String,
   pub connection_id: ConnectionId,
   pub kind: StatementKind,
}

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only set for INSERT operations on tables with a ROWID.
   pub last_insert_id: i64,
}

/// What the end of the chain produced for a statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
   Written(WriteQueryResult),
   Rows(Vec<JsonRow>),
}

/// One interception point in a database's outgoing-statement pipeline.
///
/// An implementation either returns an error without calling `execute`, or
/// forwards by calling [`Next::run`] and returns its result.
///
/// # Example
///
/// ```
/// use futures::future::BoxFuture;
/// use sqlx_sqlite_conn_mgr::{ExecuteContext, ExecuteWrapper, Next, Params, QueryOutput, Result};
///
/// struct Passthrough;
///
/// impl ExecuteWrapper for Passthrough {
///    fn call<'a>(
///       &'a self,
///       execute: Next<'a>,
///       sql: &'a str,
///       params: &'a [Params],
///       many: bool,
///       context: &'a ExecuteContext,
///    ) -> BoxFuture<'a, Result<QueryOutput>> {
///       execute.run(sql, params, many, context)
///    }
/// }
/// ```
pub trait ExecuteWrapper: Send + Sync {
   fn call<'a>(
      &'a self,
      execute: Next<'a>,
      sql: &'a str,
      params: &'a [Params],
      many: bool,
      context: &'a ExecuteContext,
   ) -> BoxFuture<'a, Result<QueryOutput>>;
}

/// The remainder of a wrapper chain
#[derive(Clone, Copy)]
pub struct Next<'a> {
   wrappers: &'a [Arc<dyn ExecuteWrapper>],
   pool: &'a Pool<Sqlite>,
}

impl<'a> Next<'a> {
   pub(crate) fn new(wrappers: &'a [Arc<dyn ExecuteWrapper>], pool: &'a Pool<Sqlite>) -> Self {
      Self { wrappers, pool }
   }

   /// Forward the statement to the next wrapper, or to sqlx if none remain
   pub fn run(
      self,
      sql: &'a str,
      params: &'a [Params],
      many: bool,
      context: &'a ExecuteContext,
   ) -> BoxFuture<'a, Result<QueryOutput>> {
      match self.wrappers.split_first() {
         Some((wrapper, rest)) => wrapper.call(
            Next {
               wrappers: rest,
               pool: self.pool,
            },
            sql,
            params,
            many,
            context,
         ),
         None => Box::pin(run_statement(self.pool, sql, params, many, context.kind)),
      }
   }
}

impl fmt::Debug for Next<'_> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Next")
         .field("remaining_wrappers", &self.wrappers.len())
         .finish()
   }
}

async fn run_statement(
   pool: &Pool<Sqlite>,
   sql: &str,
   params: &[Params],
   many: bool,
   kind: StatementKind,
) -> Result<QueryOutput> {
   match kind {
      StatementKind::Fetch => {
         let mut query = sqlx::query(sql);
         for value in params.first().cloned().unwrap_or_default() {
            query = bind_value(query, value);
         }

         let rows = query.fetch_all(pool).await?;
         let decoded = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
         Ok(QueryOutput::Rows(decoded))
      }
      StatementKind::Execute if many => {
         // One connection for the whole batch
         let mut conn = pool.acquire().await?;
         let mut total = WriteQueryResult::default();

         for values in params {
            let mut query = sqlx::query(sql);
            for value in values.iter().cloned() {
               query = bind_value(query, value);
            }

            let result = query.execute(&mut *conn).await?;
            total.rows_affected += result.rows_affected();
            total.last_insert_id = result.last_insert_rowid();
         }

         Ok(QueryOutput::Written(total))
      }
      StatementKind::Execute => {
         let mut query = sqlx::query(sql);
         for value in params.first().cloned().unwrap_or_default() {
            query = bind_value(query, value);
         }

         let result = query.execute(pool).await?;
         Ok(QueryOutput::Written(WriteQueryResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_rowid(),
         }))
      }
   }
}
