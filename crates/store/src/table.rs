use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rocksdb::{Options, WriteBatch, WriteOptions, DB};
use wikigraph_codec::Codec;

use crate::config::StoreConfig;
use crate::cursor::{ReaderGuard, TableCursor};
use crate::error::{Result, StoreError};

/// How a table is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Serve an existing table; fails with `TableMissing` if absent
    ReadOnly,
    /// Drop whatever is on disk and start an empty writable table
    CreateOrTruncate,
}

/// Where reads are served from once connected
enum Backing<V> {
    OnDisk,
    Cached(HashMap<Vec<u8>, Arc<V>>),
}

enum TableState<V> {
    Unopened,
    Connected {
        db: Arc<DB>,
        writable: bool,
        backing: Backing<V>,
    },
    Closed,
}

impl<V> TableState<V> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Connected {
                backing: Backing::Cached(_),
                ..
            } => "cached",
            Self::Connected { .. } => "connected",
            Self::Closed => "closed",
        }
    }
}

/// A named key/value table with fixed key and value codecs.
///
/// The handle is shared across threads; point reads and cursors take a read
/// lock, state transitions (open, cache, close) take the write lock.
pub struct Table<KC: Codec, VC: Codec> {
    name: String,
    path: PathBuf,
    config: Arc<StoreConfig>,
    keys: Arc<KC>,
    values: Arc<VC>,
    state: RwLock<TableState<VC::Value>>,
    readers: Arc<AtomicUsize>,
}

impl<KC: Codec, VC: Codec> Table<KC, VC> {
    pub(crate) fn new(
        name: impl Into<String>,
        path: PathBuf,
        config: Arc<StoreConfig>,
        keys: KC,
        values: VC,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            config,
            keys: Arc::new(keys),
            values: Arc::new(values),
            state: RwLock::new(TableState::Unopened),
            readers: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state: unopened, connected, cached or closed
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.read_state().name()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.read_state(), TableState::Connected { .. })
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(
            *self.read_state(),
            TableState::Connected {
                backing: Backing::Cached(_),
                ..
            }
        )
    }

    /// Number of cursors currently reading this table
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    pub fn open(&self, mode: OpenMode) -> Result<()> {
        let mut state = self.write_state();
        match mode {
            OpenMode::ReadOnly => {
                if !self.path.join("CURRENT").exists() {
                    return Err(StoreError::TableMissing {
                        table: self.name.clone(),
                        path: self.path.clone(),
                    });
                }
                let db = DB::open_for_read_only(&self.db_options(false), &self.path, false)
                    .map_err(|err| StoreError::backend(&self.name, err))?;
                *state = TableState::Connected {
                    db: Arc::new(db),
                    writable: false,
                    backing: Backing::OnDisk,
                };
                log::info!("Opened table '{}' read-only", self.name);
            }
            OpenMode::CreateOrTruncate => {
                let readers = self.active_readers();
                if readers > 0 {
                    return Err(StoreError::Busy {
                        table: self.name.clone(),
                        readers,
                    });
                }
                // Release the old handle before touching its files.
                *state = TableState::Unopened;
                if self.path.exists() {
                    log::info!("Truncating table '{}' at {}", self.name, self.path.display());
                    std::fs::remove_dir_all(&self.path)?;
                }
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let db = DB::open(&self.db_options(true), &self.path)
                    .map_err(|err| StoreError::backend(&self.name, err))?;
                *state = TableState::Connected {
                    db: Arc::new(db),
                    writable: true,
                    backing: Backing::OnDisk,
                };
                log::info!("Created table '{}'", self.name);
            }
        }
        Ok(())
    }

    /// Flush pending writes and release the backend handle
    pub fn close(&self) -> Result<()> {
        let mut state = self.write_state();
        if let TableState::Connected { db, writable, .. } = &*state {
            if *writable {
                db.flush().map_err(|err| StoreError::backend(&self.name, err))?;
            }
            log::info!("Closed table '{}'", self.name);
        }
        *state = TableState::Closed;
        Ok(())
    }

    /// Close the table and delete it from disk
    pub fn destroy(&self) -> Result<()> {
        let readers = self.active_readers();
        if readers > 0 {
            return Err(StoreError::Busy {
                table: self.name.clone(),
                readers,
            });
        }
        let mut state = self.write_state();
        *state = TableState::Closed;
        if self.path.exists() {
            std::fs::remove_dir_all(&self.path)?;
        }
        log::info!("Removed table '{}'", self.name);
        Ok(())
    }

    /// Point lookup; absence is `Ok(None)`
    pub fn get(&self, key: &KC::Value) -> Result<Option<Arc<VC::Value>>> {
        let key = self.encode_key(key)?;
        let state = self.read_state();
        match &*state {
            TableState::Connected {
                backing: Backing::Cached(map),
                ..
            } => Ok(map.get(&key).cloned()),
            TableState::Connected { db, .. } => {
                let Some(bytes) = db
                    .get(&key)
                    .map_err(|err| StoreError::backend(&self.name, err))?
                else {
                    return Ok(None);
                };
                let value = self
                    .values
                    .decode(&bytes)
                    .map_err(|err| StoreError::decode(&self.name, err))?;
                Ok(Some(Arc::new(value)))
            }
            other => Err(self.closed(other)),
        }
    }

    pub fn contains(&self, key: &KC::Value) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Single synchronous write. A cached table keeps serving the new value
    /// from memory.
    pub fn put(&self, key: &KC::Value, value: VC::Value) -> Result<()> {
        let key_bytes = self.encode_key(key)?;
        let value_bytes = self
            .values
            .encode(&value)
            .map_err(|err| StoreError::encode(&self.name, err))?;

        let mut state = self.write_state();
        let name = state.name();
        match &mut *state {
            TableState::Connected {
                writable: false, ..
            } => Err(StoreError::ReadOnly {
                table: self.name.clone(),
            }),
            TableState::Connected { db, backing, .. } => {
                db.put_opt(&key_bytes, &value_bytes, &self.write_options())
                    .map_err(|err| StoreError::backend(&self.name, err))?;
                if let Backing::Cached(map) = backing {
                    map.insert(key_bytes, Arc::new(value));
                }
                Ok(())
            }
            _ => Err(StoreError::Closed {
                table: self.name.clone(),
                state: name,
            }),
        }
    }

    /// Load rows in bounded chunks; see [`Table::bulk_put_with_progress`]
    pub fn bulk_put<I>(&self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = (KC::Value, VC::Value)>,
    {
        self.bulk_put_with_progress(rows, |_| {})
    }

    /// Write rows in batches of `commit_chunk_rows`. Every batch is committed
    /// and the memtable flushed before the next one starts, so memory stays
    /// bounded however large the input. The whole key range is compacted once
    /// at the end when `compact_after_load` is set.
    pub fn bulk_put_with_progress<I, P>(&self, rows: I, mut progress: P) -> Result<usize>
    where
        I: IntoIterator<Item = (KC::Value, VC::Value)>,
        P: FnMut(usize),
    {
        let db = self.writable_db()?;
        let chunk_rows = self.config.commit_chunk_rows.max(1);
        let options = self.write_options();

        let mut batch = WriteBatch::default();
        let mut in_batch = 0usize;
        let mut written = 0usize;

        for (key, value) in rows {
            let key = self.encode_key(&key)?;
            let value = self
                .values
                .encode(&value)
                .map_err(|err| StoreError::encode(&self.name, err))?;
            batch.put(key, value);
            in_batch += 1;

            if in_batch == chunk_rows {
                self.commit_chunk(&db, std::mem::take(&mut batch), &options)?;
                written += in_batch;
                in_batch = 0;
                log::info!("Table '{}': committed {} rows", self.name, written);
                progress(written);
            }
        }

        if in_batch > 0 {
            self.commit_chunk(&db, batch, &options)?;
            written += in_batch;
            progress(written);
        }

        if self.config.compact_after_load {
            db.compact_range(None::<&[u8]>, None::<&[u8]>);
        }
        log::info!("Table '{}': bulk load finished, {} rows", self.name, written);
        Ok(written)
    }

    /// Ordered cursor over all rows on disk
    pub fn iterate(&self) -> Result<TableCursor<KC, VC>> {
        let state = self.read_state();
        match &*state {
            TableState::Connected { db, .. } => Ok(TableCursor::new(
                self.name.clone(),
                Arc::clone(db),
                Arc::clone(&self.keys),
                Arc::clone(&self.values),
                self.config.cursor_page_rows,
                ReaderGuard::register(&self.readers),
            )),
            other => Err(self.closed(other)),
        }
    }

    /// Materialize the table in memory, keeping only what `filter` returns.
    ///
    /// The filter sees each decoded row and returns the value to keep
    /// (possibly trimmed) or `None` to leave the row out. Afterwards every
    /// read is answered from memory; rows left out read as absent even though
    /// they remain on disk.
    pub fn cache<F>(&self, mut filter: F) -> Result<usize>
    where
        F: FnMut(&KC::Value, VC::Value) -> Option<VC::Value>,
    {
        let db = match &*self.read_state() {
            TableState::Connected { db, .. } => Arc::clone(db),
            other => return Err(self.closed(other)),
        };

        log::info!("Caching table '{}'", self.name);
        let mut map = HashMap::new();
        let mut scanned = 0usize;
        for row in self.iterate()? {
            let (key, value) = row?;
            scanned += 1;
            if let Some(kept) = filter(&key, value) {
                map.insert(self.encode_key(&key)?, Arc::new(kept));
            }
        }

        let mut state = self.write_state();
        let name = state.name();
        match &mut *state {
            TableState::Connected {
                db: current,
                backing,
                ..
            } if Arc::ptr_eq(current, &db) => {
                let kept = map.len();
                *backing = Backing::Cached(map);
                log::info!(
                    "Cached table '{}': kept {} of {} rows",
                    self.name,
                    kept,
                    scanned
                );
                Ok(kept)
            }
            // Reopened or closed while scanning.
            _ => Err(StoreError::Closed {
                table: self.name.clone(),
                state: name,
            }),
        }
    }

    /// Cache every row unchanged
    pub fn cache_all(&self) -> Result<usize> {
        self.cache(|_, value| Some(value))
    }

    /// Drop the in-memory copy and serve reads from disk again
    pub fn uncache(&self) {
        if let TableState::Connected { backing, .. } = &mut *self.write_state() {
            *backing = Backing::OnDisk;
        }
    }

    /// Rows held in memory, if the table is cached
    #[must_use]
    pub fn cached_len(&self) -> Option<usize> {
        match &*self.read_state() {
            TableState::Connected {
                backing: Backing::Cached(map),
                ..
            } => Some(map.len()),
            _ => None,
        }
    }

    /// Backend estimate of the number of rows
    pub fn len_estimate(&self) -> Result<u64> {
        match &*self.read_state() {
            TableState::Connected { db, .. } => Ok(db
                .property_int_value("rocksdb.estimate-num-keys")
                .map_err(|err| StoreError::backend(&self.name, err))?
                .unwrap_or(0)),
            other => Err(self.closed(other)),
        }
    }

    fn commit_chunk(&self, db: &DB, batch: WriteBatch, options: &WriteOptions) -> Result<()> {
        db.write_opt(batch, options)
            .map_err(|err| StoreError::backend(&self.name, err))?;
        db.flush()
            .map_err(|err| StoreError::backend(&self.name, err))
    }

    fn writable_db(&self) -> Result<Arc<DB>> {
        match &*self.read_state() {
            TableState::Connected {
                db, writable: true, ..
            } => Ok(Arc::clone(db)),
            TableState::Connected { .. } => Err(StoreError::ReadOnly {
                table: self.name.clone(),
            }),
            other => Err(self.closed(other)),
        }
    }

    fn encode_key(&self, key: &KC::Value) -> Result<Vec<u8>> {
        self.keys
            .encode(key)
            .map_err(|err| StoreError::encode(&self.name, err))
    }

    fn db_options(&self, create: bool) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(create);
        opts.set_max_open_files(self.config.max_open_files);
        opts
    }

    fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::default();
        options.set_sync(self.config.sync_on_commit);
        options
    }

    fn closed(&self, state: &TableState<VC::Value>) -> StoreError {
        StoreError::Closed {
            table: self.name.clone(),
            state: state.name(),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TableState<VC::Value>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TableState<VC::Value>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<KC: Codec, VC: Codec> std::fmt::Debug for Table<KC, VC> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("state", &self.state_name())
            .finish()
    }
}
