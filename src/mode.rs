//! The read-only mode flag and the toggles that flip it
//!
//! The flag is one process-wide value, shared by every thread and task. A
//! toggle on one thread is visible to all others immediately; there is no
//! per-task scoping.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Whether write statements are currently blocked.
#[derive(Debug)]
pub struct WriteMode {
   read_only: AtomicBool,
}

impl WriteMode {
   pub const fn new(read_only: bool) -> Self {
      Self {
         read_only: AtomicBool::new(read_only),
      }
   }

   pub fn is_read_only(&self) -> bool {
      self.read_only.load(Ordering::SeqCst)
   }

   pub fn set_read_only(&self, read_only: bool) {
      let previous = self.read_only.swap(read_only, Ordering::SeqCst);
      if previous != read_only {
         debug!(read_only, "Write mode changed");
      }
   }

   /// Let write statements through.
   pub fn enable_writes(&self) {
      self.set_read_only(false);
   }

   /// Block write statements.
   pub fn disable_writes(&self) {
      self.set_read_only(true);
   }

   /// Enable writes until the returned guard is dropped, then disable them.
   ///
   /// Scopes do not stack: dropping any guard disables writes, even if an
   /// enclosing scope still expects them enabled.
   pub fn temp_writes(&self) -> TempWrites<'_> {
      self.enable_writes();
      TempWrites { mode: self }
   }
}

impl Default for WriteMode {
   fn default() -> Self {
      Self::new(false)
   }
}

/// RAII guard returned by [`WriteMode::temp_writes`].
///
/// Disables writes when dropped, including during unwinding.
#[must_use = "writes are disabled again as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TempWrites<'a> {
   mode: &'a WriteMode,
}

impl Drop for TempWrites<'_> {
   fn drop(&mut self) {
      self.mode.disable_writes();
   }
}

static MODE: WriteMode = WriteMode::new(false);

/// The process-wide mode flag consulted by the default write blocker.
pub fn mode() -> &'static WriteMode {
   &MODE
}

/// Whether writes are currently blocked process-wide.
pub fn read_only() -> bool {
   MODE.is_read_only()
}

/// Let write statements through process-wide.
pub fn enable_writes() {
   MODE.enable_writes();
}

/// Block write statements process-wide.
pub fn disable_writes() {
   MODE.disable_writes();
}

/// Run `f` with writes enabled, then disable writes however `f` exits.
///
/// Writes end up disabled afterwards even if they were enabled before the
/// call.
///
/// # Example
///
/// ```
/// use sqlx_sqlite_read_only::{disable_writes, read_only, temp_writes};
///
/// disable_writes();
/// temp_writes(|| assert!(!read_only()));
/// assert!(read_only());
/// ```
pub fn temp_writes<T>(f: impl FnOnce() -> T) -> T {
   let _writes = MODE.temp_writes();
   f()
}

/// Enable writes process-wide until the returned guard is dropped.
///
/// Use this form to keep writes enabled across `.await` points.
pub fn temp_writes_guard() -> TempWrites<'static> {
   MODE.temp_writes()
}

/// Await `future` with writes enabled, then disable writes.
///
/// Writes are also disabled if the future is dropped before completing.
pub async fn with_temp_writes<F: Future>(future: F) -> F::Output {
   let _writes = MODE.temp_writes();
   future.await
}
