//! The execute wrapper that refuses writes while read-only mode is engaged

use futures::future::BoxFuture;
use sqlx_sqlite_conn_mgr::{ExecuteContext, ExecuteWrapper, Next, Params, QueryOutput};

use crate::classify::should_block;
use crate::error::Error;
use crate::mode::WriteMode;

/// Rejects a statement when its mode is read-only and [`should_block`]
/// classifies the statement as a write; forwards it unchanged otherwise.
#[derive(Debug)]
pub struct WriteBlocker {
   mode: &'static WriteMode,
}

impl WriteBlocker {
   pub fn new(mode: &'static WriteMode) -> Self {
      Self { mode }
   }

   /// The mode flag this blocker consults
   pub fn mode(&self) -> &'static WriteMode {
      self.mode
   }
}

impl ExecuteWrapper for WriteBlocker {
   fn call<'a>(
      &'a self,
      execute: Next<'a>,
      sql: &'a str,
      params: &'a [Params],
      many: bool,
      context: &'a ExecuteContext,
   ) -> BoxFuture<'a, sqlx_sqlite_conn_mgr::Result<QueryOutput>> {
      if self.mode.is_read_only() && should_block(sql) {
         return Box::pin(async {
            Err(sqlx_sqlite_conn_mgr::Error::from(Error::WritesDisabled))
         });
      }
      execute.run(sql, params, many, context)
   }
}
