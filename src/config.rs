//! Startup configuration for the read-only mode

use std::ffi::OsStr;

use serde::{Deserialize, Serialize};

/// Environment variable that engages read-only mode at startup.
///
/// Any non-empty value engages it, including `0` and `false`.
pub const READ_ONLY_ENV_VAR: &str = "SQLITE_READ_ONLY";

/// Startup configuration read once by [`init`](crate::init).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOnlyConfig {
   /// Whether writes start out blocked.
   ///
   /// Default: false
   pub read_only: bool,
}

impl ReadOnlyConfig {
   /// Read the configuration from [`READ_ONLY_ENV_VAR`].
   pub fn from_env() -> Self {
      Self::from_env_value(std::env::var_os(READ_ONLY_ENV_VAR).as_deref())
   }

   /// Build the configuration from a raw environment value.
   ///
   /// Present and non-empty engages read-only mode; absent or empty does not.
   pub fn from_env_value(value: Option<&OsStr>) -> Self {
      Self {
         read_only: value.is_some_and(|v| !v.is_empty()),
      }
   }
}
