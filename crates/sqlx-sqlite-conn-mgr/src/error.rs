//! Error types for sqlx-sqlite-conn-mgr

use std::error::Error as StdError;

use thiserror::Error;

/// Errors that may occur when working with sqlx-sqlite-conn-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// SQLite type that cannot be mapped to JSON
   #[error("Unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// An execute wrapper refused to run the statement. The wrapper's own error
   /// is carried unchanged.
   #[error("{0}")]
   Rejected(Box<dyn StdError + Send + Sync>),
}

impl Error {
   /// Wrap an error raised by an execute wrapper
   pub fn rejected(err: impl StdError + Send + Sync + 'static) -> Self {
      Error::Rejected(Box::new(err))
   }

   /// Returns the wrapper error if this is a rejection of type `E`
   pub fn rejection<E: StdError + 'static>(&self) -> Option<&E> {
      match self {
         Error::Rejected(inner) => inner.downcast_ref::<E>(),
         _ => None,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[derive(Debug, thiserror::Error)]
   #[error("nope")]
   struct Nope;

   #[test]
   fn test_rejection_downcast() {
      let err = Error::rejected(Nope);
      assert!(err.rejection::<Nope>().is_some());
      assert!(err.rejection::<std::io::Error>().is_none());
      assert_eq!(err.to_string(), "nope");
   }

   #[test]
   fn test_rejection_on_other_variants() {
      assert!(Error::DatabaseClosed.rejection::<Nope>().is_none());
   }
}
