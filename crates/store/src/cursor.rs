use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rocksdb::{Direction, IteratorMode, DB};
use wikigraph_codec::Codec;

use crate::error::{Result, StoreError};

/// Registers an active reader for as long as it lives
#[derive(Debug)]
pub(crate) struct ReaderGuard {
    readers: Arc<AtomicUsize>,
}

impl ReaderGuard {
    pub(crate) fn register(readers: &Arc<AtomicUsize>) -> Self {
        readers.fetch_add(1, Ordering::AcqRel);
        Self {
            readers: Arc::clone(readers),
        }
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.readers.fetch_sub(1, Ordering::AcqRel);
    }
}

type RawRow = (Box<[u8]>, Box<[u8]>);

/// Ordered cursor over every row of a table.
///
/// Rows are pulled from the backend a page at a time; each page opens a
/// fresh iterator positioned after the last key seen, so no backend iterator
/// outlives a single page. The table counts the cursor as an active reader
/// until it is dropped.
pub struct TableCursor<KC: Codec, VC: Codec> {
    table: String,
    db: Arc<DB>,
    keys: Arc<KC>,
    values: Arc<VC>,
    page: VecDeque<RawRow>,
    page_rows: usize,
    resume_after: Option<Box<[u8]>>,
    exhausted: bool,
    _reader: ReaderGuard,
}

impl<KC: Codec, VC: Codec> TableCursor<KC, VC> {
    pub(crate) fn new(
        table: String,
        db: Arc<DB>,
        keys: Arc<KC>,
        values: Arc<VC>,
        page_rows: usize,
        reader: ReaderGuard,
    ) -> Self {
        Self {
            table,
            db,
            keys,
            values,
            page: VecDeque::new(),
            page_rows: page_rows.max(1),
            resume_after: None,
            exhausted: false,
            _reader: reader,
        }
    }

    /// Release the cursor before reaching the end
    pub fn close(self) {}

    fn fill_page(&mut self) -> Result<()> {
        let resume = self.resume_after.clone();
        let mode = match resume.as_deref() {
            Some(key) => IteratorMode::From(key, Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut fetched = 0usize;
        for item in self.db.iterator(mode) {
            let (key, value) = item.map_err(|err| StoreError::backend(&self.table, err))?;
            if resume.as_deref() == Some(&*key) {
                continue;
            }
            self.page.push_back((key, value));
            fetched += 1;
            if fetched == self.page_rows {
                break;
            }
        }

        if fetched < self.page_rows {
            self.exhausted = true;
        }
        if let Some((key, _)) = self.page.back() {
            self.resume_after = Some(key.clone());
        }
        Ok(())
    }

    fn decode_row(&self, (key, value): RawRow) -> Result<(KC::Value, VC::Value)> {
        let key = self
            .keys
            .decode(&key)
            .map_err(|err| StoreError::decode(&self.table, err))?;
        let value = self
            .values
            .decode(&value)
            .map_err(|err| StoreError::decode(&self.table, err))?;
        Ok((key, value))
    }
}

impl<KC: Codec, VC: Codec> Iterator for TableCursor<KC, VC> {
    type Item = Result<(KC::Value, VC::Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            if let Err(err) = self.fill_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        let row = self.page.pop_front()?;
        Some(self.decode_row(row))
    }
}
