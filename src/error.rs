/// The error raised for a statement refused by the write blocker.
///
/// It reaches callers wrapped in
/// [`sqlx_sqlite_conn_mgr::Error::Rejected`]; use
/// [`is_writes_disabled`] to recognise it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
   /// A write statement was attempted while writes are disabled.
   #[error("Write queries are currently disabled")]
   WritesDisabled,
}

impl Error {
   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::WritesDisabled => "WRITES_DISABLED".to_string(),
      }
   }
}

impl From<Error> for sqlx_sqlite_conn_mgr::Error {
   fn from(err: Error) -> Self {
      sqlx_sqlite_conn_mgr::Error::rejected(err)
   }
}

/// Returns `true` if a database error is the write blocker's refusal.
pub fn is_writes_disabled(err: &sqlx_sqlite_conn_mgr::Error) -> bool {
   matches!(err.rejection::<Error>(), Some(Error::WritesDisabled))
}
