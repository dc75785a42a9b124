//! Attaching the write blocker to every database connection

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;
use sqlx_sqlite_conn_mgr::{ConnectionId, Connections, SqliteDatabase, connections};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::blocker::WriteBlocker;
use crate::config::ReadOnlyConfig;
use crate::mode::{WriteMode, mode};

/// Dispatch uid of the process-wide installer's connection-created listener
pub const DISPATCH_UID: &str = "sqlx-sqlite-read-only";

static INSTALLER: LazyLock<Arc<Installer>> =
   LazyLock::new(|| Installer::with_dispatch_uid(mode(), DISPATCH_UID));

/// The installer backing [`init`] and [`install`].
pub fn installer() -> &'static Arc<Installer> {
   &INSTALLER
}

/// Attaches one [`WriteBlocker`] to database connections, at most once each.
///
/// The installer remembers the open connections it has attached to, keyed by
/// [`ConnectionId`]. Entries for connections that have since closed or been
/// dropped are pruned. Attaching appends to the end of the connection's
/// wrapper sequence and never touches wrappers already there.
pub struct Installer {
   dispatch_uid: String,
   blocker: Arc<WriteBlocker>,
   installed: Mutex<HashMap<ConnectionId, Weak<SqliteDatabase>>>,
}

impl Installer {
   /// Create a shareable installer whose blocker consults `mode`.
   pub fn shared(mode: &'static WriteMode) -> Arc<Self> {
      Self::with_dispatch_uid(mode, format!("{DISPATCH_UID}-{}", Uuid::new_v4()))
   }

   fn with_dispatch_uid(mode: &'static WriteMode, dispatch_uid: impl Into<String>) -> Arc<Self> {
      Arc::new(Self {
         dispatch_uid: dispatch_uid.into(),
         blocker: Arc::new(WriteBlocker::new(mode)),
         installed: Mutex::new(HashMap::new()),
      })
   }

   /// The blocker this installer attaches
   pub fn blocker(&self) -> &Arc<WriteBlocker> {
      &self.blocker
   }

   /// Uid under which this installer listens for new connections
   pub fn dispatch_uid(&self) -> &str {
      &self.dispatch_uid
   }

   /// Ensure the blocker is attached to `db`.
   ///
   /// Returns `true` if it was attached by this call, `false` if it already
   /// was or `db` is closed.
   pub fn install(&self, db: &Arc<SqliteDatabase>) -> bool {
      // Held across the append so concurrent installs of one connection
      // cannot both attach
      let mut installed = self.installed.lock();
      prune(&mut installed);

      if db.is_closed() {
         trace!(alias = db.alias(), id = %db.id(), "Skipping closed database");
         return false;
      }

      if installed.contains_key(&db.id()) {
         trace!(alias = db.alias(), id = %db.id(), "Write blocker already installed");
         return false;
      }

      installed.insert(db.id(), Arc::downgrade(db));
      db.add_execute_wrapper(self.blocker.clone());
      debug!(alias = db.alias(), id = %db.id(), "Installed write blocker");
      true
   }

   /// Whether this installer has attached its blocker to `db`
   pub fn is_installed(&self, db: &SqliteDatabase) -> bool {
      self.installed.lock().contains_key(&db.id())
   }

   /// Number of open connections this installer is tracking
   pub fn installed_count(&self) -> usize {
      let mut installed = self.installed.lock();
      prune(&mut installed);
      installed.len()
   }

   /// Attach the blocker to every database in `connections`, now and as they
   /// are created.
   ///
   /// Safe to call repeatedly: each connection is attached once and the
   /// listener is registered once.
   pub fn install_all(self: &Arc<Self>, connections: &Connections) {
      let installer = Arc::clone(self);
      connections.observe(
         self.dispatch_uid.clone(),
         Arc::new(move |db: &Arc<SqliteDatabase>| {
            installer.install(db);
         }),
      );
   }
}

impl std::fmt::Debug for Installer {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Installer")
         .field("dispatch_uid", &self.dispatch_uid)
         .field("installed", &self.installed.lock().len())
         .finish()
   }
}

fn prune(installed: &mut HashMap<ConnectionId, Weak<SqliteDatabase>>) {
   installed.retain(|_, db| db.upgrade().is_some_and(|db| !db.is_closed()));
}

/// Attach the process-wide write blocker to `db`.
///
/// Returns `true` if it was attached by this call.
pub fn install(db: &Arc<SqliteDatabase>) -> bool {
   INSTALLER.install(db)
}

/// Set the mode from the environment and guard every connection in the
/// process-wide registry, present and future.
///
/// Reads [`READ_ONLY_ENV_VAR`](crate::READ_ONLY_ENV_VAR) once per call. Safe
/// to call more than once.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use sqlx_sqlite_conn_mgr::connections;
/// use sqlx_sqlite_read_only::{init, is_writes_disabled};
///
/// # async fn example() -> sqlx_sqlite_conn_mgr::Result<()> {
/// // SQLITE_READ_ONLY=1 in the environment
/// init();
///
/// let db = connections().connect("default", "app.db", None).await?;
/// let err = db
///    .execute("INSERT INTO users (name) VALUES (?)", vec![json!("Alice")])
///    .await
///    .unwrap_err();
/// assert!(is_writes_disabled(&err));
/// # Ok(())
/// # }
/// ```
pub fn init() {
   init_with(ReadOnlyConfig::from_env());
}

/// Like [`init`], with explicit configuration instead of the environment.
pub fn init_with(config: ReadOnlyConfig) {
   info!(read_only = config.read_only, "Initializing read-only mode");
   mode().set_read_only(config.read_only);
   INSTALLER.install_all(connections());
}
