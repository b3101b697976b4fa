//! # Wikigraph Store
//!
//! Named, typed key/value tables on top of RocksDB.
//!
//! ## Architecture
//!
//! ```text
//! StoreDir (one directory)
//!     │
//!     ├──> <table>/         one RocksDB instance per table
//!     │
//!     └──> Table<KeyCodec, ValueCodec>
//!            ├─> Unopened ─open─> Connected(OnDisk) ─cache─> Connected(Cached)
//!            │                         │                          │
//!            │                         └──────────close───────────┴─> Closed
//!            ├─> get / put / bulk_put (chunked commits)
//!            └─> iterate ──> TableCursor (paged, counted as a reader)
//! ```
//!
//! Tables are written once by a single loader and then opened read-only.
//! `cache` materializes a filtered subset in memory; from then on reads never
//! touch disk and rows the filter dropped read as absent.

mod config;
mod cursor;
mod dir;
mod error;
mod table;

pub use config::StoreConfig;
pub use cursor::TableCursor;
pub use dir::{StoreDir, WriterLock};
pub use error::{Result, StoreError};
pub use table::{OpenMode, Table};
