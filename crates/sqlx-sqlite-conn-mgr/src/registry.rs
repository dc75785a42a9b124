//! Registry of open databases and connection-created listeners

use std::path::Path;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::Result;
use crate::config::SqliteDatabaseConfig;
use crate::database::SqliteDatabase;

/// Callback invoked with every newly opened database
pub type ConnectionCreatedListener = Arc<dyn Fn(&Arc<SqliteDatabase>) + Send + Sync>;

static CONNECTIONS: LazyLock<Connections> = LazyLock::new(Connections::new);

/// The process-wide connection registry
pub fn connections() -> &'static Connections {
   &CONNECTIONS
}

#[derive(Default)]
struct Inner {
   databases: IndexMap<String, Arc<SqliteDatabase>>,
   listeners: IndexMap<String, ConnectionCreatedListener>,
}

/// Open databases keyed by alias, plus the listeners notified whenever a new
/// one is opened.
///
/// Listeners run synchronously while the registry lock is held, before
/// [`connect`](Self::connect) hands the database to anyone. A listener must
/// not call back into the registry.
#[derive(Default)]
pub struct Connections {
   inner: Mutex<Inner>,
}

impl Connections {
   pub fn new() -> Self {
      Self::default()
   }

   /// Connect to the database registered as `alias`, opening `path` if the
   /// alias is not connected yet.
   ///
   /// If the alias is already connected, the existing database is returned
   /// and `path` is ignored. A newly opened database is passed to every
   /// connection-created listener before this returns.
   ///
   /// # Example
   ///
   /// ```no_run
   /// use sqlx_sqlite_conn_mgr::connections;
   ///
   /// # async fn example() -> sqlx_sqlite_conn_mgr::Result<()> {
   /// let db = connections().connect("default", "app.db", None).await?;
   /// let rows = db.fetch_all("SELECT * FROM users", vec![]).await?;
   /// # Ok(())
   /// # }
   /// ```
   pub async fn connect(
      &self,
      alias: &str,
      path: impl AsRef<Path>,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Arc<SqliteDatabase>> {
      if let Some(existing) = self.get(alias) {
         return Ok(existing);
      }

      let opened = Arc::new(SqliteDatabase::open(alias, path.as_ref(), custom_config).await?);

      let mut inner = self.inner.lock();

      // Another task may have connected the alias while we were opening
      if let Some(existing) = inner.databases.get(alias) {
         trace!(alias, "Alias connected concurrently, discarding new connection");
         return Ok(Arc::clone(existing));
      }

      inner
         .databases
         .insert(alias.to_string(), Arc::clone(&opened));

      for (uid, listener) in &inner.listeners {
         trace!(alias, listener = %uid, "Dispatching connection created");
         listener(&opened);
      }

      Ok(opened)
   }

   /// The database connected under `alias`, if any
   pub fn get(&self, alias: &str) -> Option<Arc<SqliteDatabase>> {
      self.inner.lock().databases.get(alias).cloned()
   }

   /// Every open database, in the order they were connected
   pub fn all(&self) -> Vec<Arc<SqliteDatabase>> {
      self.inner.lock().databases.values().cloned().collect()
   }

   pub fn aliases(&self) -> Vec<String> {
      self.inner.lock().databases.keys().cloned().collect()
   }

   /// Register a permanent connection-created listener.
   ///
   /// Registration is keyed by `dispatch_uid`; registering again under the
   /// same uid keeps the first listener and returns `false`.
   pub fn on_connection_created(
      &self,
      dispatch_uid: impl Into<String>,
      listener: ConnectionCreatedListener,
   ) -> bool {
      let dispatch_uid = dispatch_uid.into();
      let mut inner = self.inner.lock();

      if inner.listeners.contains_key(&dispatch_uid) {
         trace!(listener = %dispatch_uid, "Listener already registered");
         return false;
      }

      debug!(listener = %dispatch_uid, "Registered connection created listener");
      inner.listeners.insert(dispatch_uid, listener);
      true
   }

   /// Register a listener and run it on every database that is already open,
   /// as one step.
   ///
   /// No database can be opened between the sweep and the registration, so
   /// the listener sees every database exactly once per call: either here or
   /// when it is created. The sweep runs even when the uid was already
   /// registered. Returns whether the listener was newly registered.
   pub fn observe(
      &self,
      dispatch_uid: impl Into<String>,
      listener: ConnectionCreatedListener,
   ) -> bool {
      let dispatch_uid = dispatch_uid.into();
      let mut inner = self.inner.lock();

      for db in inner.databases.values() {
         listener(db);
      }

      if inner.listeners.contains_key(&dispatch_uid) {
         trace!(listener = %dispatch_uid, "Listener already registered");
         return false;
      }

      debug!(
         listener = %dispatch_uid,
         swept = inner.databases.len(),
         "Observing connections"
      );
      inner.listeners.insert(dispatch_uid, listener);
      true
   }

   /// Number of registered connection-created listeners
   pub fn listener_count(&self) -> usize {
      self.inner.lock().listeners.len()
   }

   /// Unregister and close the database connected under `alias`.
   ///
   /// Returns `false` if the alias was not connected.
   pub async fn close(&self, alias: &str) -> Result<bool> {
      let removed = self.inner.lock().databases.shift_remove(alias);

      match removed {
         Some(db) => {
            db.close().await?;
            Ok(true)
         }
         None => Ok(false),
      }
   }

   /// Unregister and close every database
   pub async fn close_all(&self) {
      let databases: Vec<_> = self.inner.lock().databases.drain(..).collect();

      for (alias, db) in databases {
         if let Err(e) = db.close().await {
            error!(alias = %alias, "Failed to close database: {}", e);
         }
      }
   }
}

impl std::fmt::Debug for Connections {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      let inner = self.inner.lock();
      f.debug_struct("Connections")
         .field("aliases", &inner.databases.keys().collect::<Vec<_>>())
         .field("listeners", &inner.listeners.keys().collect::<Vec<_>>())
         .finish()
   }
}
