//! Statement classification: which SQL may run while writes are disabled

/// Statement prefixes that are let through while writes are disabled.
///
/// Matching is literal and case-sensitive. No whitespace or case
/// normalization happens, so `select 1` or ` SELECT 1` are blocked.
pub const ALLOWED_PREFIXES: [&str; 6] = [
   "PRAGMA ",
   "ROLLBACK TO SAVEPOINT ",
   "RELEASE SAVEPOINT ",
   "SAVEPOINT ",
   "SELECT ",
   "SET ",
];

/// Whole statements that are let through while writes are disabled.
pub const ALLOWED_STATEMENTS: [&str; 2] = ["BEGIN", "COMMIT"];

/// Returns `true` if `sql` must be rejected while writes are disabled.
///
/// Everything is blocked except statements starting with one of
/// [`ALLOWED_PREFIXES`] or equal to one of [`ALLOWED_STATEMENTS`].
///
/// # Example
///
/// ```
/// use sqlx_sqlite_read_only::should_block;
///
/// assert!(!should_block("SELECT * FROM users"));
/// assert!(!should_block("BEGIN"));
/// assert!(should_block("INSERT INTO users (name) VALUES ('Alice')"));
/// ```
pub fn should_block(sql: &str) -> bool {
   !ALLOWED_PREFIXES
      .iter()
      .any(|prefix| sql.starts_with(prefix))
      && !ALLOWED_STATEMENTS.iter().any(|statement| *statement == sql)
}
