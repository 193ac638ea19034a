//! Name index storage implementation using RocksDB.

use crate::{cf, meta_keys, Error, Result};
use alias_primitives::{FeeWindow, NameHistory, NameIndexRecord};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, WriteOptions, DB};
use std::path::Path;

fn synced() -> WriteOptions {
    let mut write_opts = WriteOptions::default();
    write_opts.set_sync(true);
    write_opts
}

fn display_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Durable mapping from name to its confirmation history.
pub struct NameIndex {
    db: DB,
}

impl NameIndex {
    /// Open or create the name index at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        db_opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(cf::NAMES, Options::default()),
            ColumnFamilyDescriptor::new(cf::META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened name index at {}", path.display());

        Ok(Self { db })
    }

    /// Create a throwaway index for testing, living as long as the returned directory.
    #[cfg(test)]
    pub fn open_temp() -> Result<(tempfile::TempDir, Self)> {
        let temp_dir = tempfile::tempdir().map_err(Error::Io)?;
        let index = Self::open(temp_dir.path())?;
        Ok((temp_dir, index))
    }

    fn names_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(cf::NAMES).ok_or(Error::NotInitialized)
    }

    fn meta_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(cf::META).ok_or(Error::NotInitialized)
    }

    /// Whether `name` has at least one confirmed record.
    pub fn exists(&self, name: &[u8]) -> Result<bool> {
        Ok(self.db.get_cf(self.names_cf()?, name)?.is_some())
    }

    /// Read the history of `name`, failing with [`Error::NameNotFound`] if absent.
    pub fn read(&self, name: &[u8]) -> Result<NameHistory> {
        self.try_read(name)?
            .ok_or_else(|| Error::NameNotFound(display_name(name)))
    }

    pub fn try_read(&self, name: &[u8]) -> Result<Option<NameHistory>> {
        self.db
            .get_cf(self.names_cf()?, name)?
            .map(|bytes| bincode::deserialize(&bytes).map_err(Error::from))
            .transpose()
    }

    /// Current state of `name`.
    pub fn latest(&self, name: &[u8]) -> Result<Option<NameIndexRecord>> {
        Ok(self
            .try_read(name)?
            .and_then(|history| history.latest().cloned()))
    }

    /// Height of the latest confirmation of `name`.
    pub fn name_height(&self, name: &[u8]) -> Result<Option<u32>> {
        Ok(self.latest(name)?.map(|record| record.height))
    }

    /// Overwrite the history of `name`.
    pub fn write(&self, name: &[u8], history: &NameHistory) -> Result<()> {
        let value = bincode::serialize(history)?;
        self.db
            .put_cf_opt(self.names_cf()?, name, value, &synced())?;

        tracing::debug!(
            "Wrote {} records for name {}",
            history.len(),
            display_name(name)
        );

        Ok(())
    }

    /// Load the persisted fee sample window, empty if none was written yet.
    pub fn read_fee_window(&self) -> Result<FeeWindow> {
        match self.db.get_cf(self.meta_cf()?, meta_keys::FEE_WINDOW)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(FeeWindow::default()),
        }
    }

    pub fn write_fee_window(&self, window: &FeeWindow) -> Result<()> {
        let value = bincode::serialize(window)?;
        self.db
            .put_cf_opt(self.meta_cf()?, meta_keys::FEE_WINDOW, value, &synced())?;
        Ok(())
    }

    /// Atomically write several histories and optionally the fee window.
    pub fn commit_batch<'a>(
        &self,
        histories: impl IntoIterator<Item = (&'a [u8], &'a NameHistory)>,
        fee_window: Option<&FeeWindow>,
    ) -> Result<()> {
        let cf_names = self.names_cf()?;
        let cf_meta = self.meta_cf()?;

        let mut batch = WriteBatch::default();
        let mut names = 0usize;

        for (name, history) in histories {
            batch.put_cf(cf_names, name, bincode::serialize(history)?);
            names += 1;
        }

        if let Some(window) = fee_window {
            batch.put_cf(cf_meta, meta_keys::FEE_WINDOW, bincode::serialize(window)?);
        }

        self.db.write_opt(batch, &synced())?;

        tracing::debug!("Committed {names} name histories");

        Ok(())
    }

    /// Atomically replace every history and the fee window.
    ///
    /// Names absent from `histories` are removed in the same batch.
    pub fn replace_all<'a>(
        &self,
        histories: impl IntoIterator<Item = (&'a [u8], &'a NameHistory)>,
        fee_window: &FeeWindow,
    ) -> Result<()> {
        let cf_names = self.names_cf()?;
        let cf_meta = self.meta_cf()?;

        let mut batch = WriteBatch::default();

        let mut iter = self.db.raw_iterator_cf(cf_names);
        iter.seek_to_first();
        while iter.valid() {
            if let Some(key) = iter.key() {
                batch.delete_cf(cf_names, key);
            }
            iter.next();
        }
        iter.status()?;

        let mut names = 0usize;
        for (name, history) in histories {
            batch.put_cf(cf_names, name, bincode::serialize(history)?);
            names += 1;
        }

        batch.put_cf(cf_meta, meta_keys::FEE_WINDOW, bincode::serialize(fee_window)?);

        self.db.write_opt(batch, &synced())?;

        tracing::debug!("Replaced name index with {names} name histories");

        Ok(())
    }

    /// Iterate over all names and their histories, in key order.
    pub fn iter_names(&self) -> Result<NameIterator<'_>> {
        let mut iter = self.db.raw_iterator_cf(self.names_cf()?);
        iter.seek_to_first();
        Ok(NameIterator { iter, done: false })
    }

    /// Raw stored `(name, encoded history)` pairs, in key order.
    pub fn raw_entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut iter = self.db.raw_iterator_cf(self.names_cf()?);
        iter.seek_to_first();

        let mut entries = Vec::new();
        while iter.valid() {
            if let (Some(key), Some(value)) = (iter.key(), iter.value()) {
                entries.push((key.to_vec(), value.to_vec()));
            }
            iter.next();
        }
        iter.status()?;

        Ok(entries)
    }

    /// Remove every history and the fee window.
    pub fn clear(&self) -> Result<()> {
        let cf_names = self.names_cf()?;
        let cf_meta = self.meta_cf()?;

        let mut batch = WriteBatch::default();

        let mut iter = self.db.raw_iterator_cf(cf_names);
        iter.seek_to_first();
        while iter.valid() {
            if let Some(key) = iter.key() {
                batch.delete_cf(cf_names, key);
            }
            iter.next();
        }
        iter.status()?;

        batch.delete_cf(cf_meta, meta_keys::FEE_WINDOW);

        self.db.write_opt(batch, &synced())?;

        tracing::info!("Cleared name index");

        Ok(())
    }

    /// Flush memtables to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush_cf(self.names_cf()?)?;
        self.db.flush_cf(self.meta_cf()?)?;
        Ok(())
    }
}

/// Iterator over all name histories in the index.
///
/// Yields `(name, history)` pairs in lexicographic order by name.
pub struct NameIterator<'a> {
    iter: rocksdb::DBRawIterator<'a>,
    done: bool,
}

impl Iterator for NameIterator<'_> {
    type Item = Result<(Vec<u8>, NameHistory)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if !self.iter.valid() {
            self.done = true;
            return self.iter.status().err().map(|err| Err(err.into()));
        }

        let item = match (self.iter.key(), self.iter.value()) {
            (Some(key), Some(value)) => bincode::deserialize(value)
                .map(|history| (key.to_vec(), history))
                .map_err(Error::from),
            _ => Err(Error::NotInitialized),
        };
        self.iter.next();

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::{Amount, OutPoint, Txid};

    fn record(height: u32, value: &[u8]) -> NameIndexRecord {
        NameIndexRecord {
            height,
            value: value.to_vec(),
            txid: Txid::from_byte_array([height as u8; 32]),
            output_index: 1,
            prev_out: OutPoint::null(),
        }
    }

    #[test]
    fn test_write_and_read_history() {
        let (_dir, index) = NameIndex::open_temp().unwrap();

        assert!(!index.exists(b"alice").unwrap());
        assert!(matches!(index.read(b"alice"), Err(Error::NameNotFound(name)) if name == "alice"));
        assert!(index.try_read(b"alice").unwrap().is_none());

        let mut history = NameHistory::new();
        history.insert(record(10, b"v1"));
        history.insert(record(25, b"v2"));
        index.write(b"alice", &history).unwrap();

        assert!(index.exists(b"alice").unwrap());
        assert_eq!(index.read(b"alice").unwrap(), history);
        assert_eq!(index.latest(b"alice").unwrap().unwrap().value, b"v2");
        assert_eq!(index.name_height(b"alice").unwrap(), Some(25));
        assert_eq!(index.name_height(b"bob").unwrap(), None);
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut history = NameHistory::new();
        history.insert(record(7, b"persisted"));

        let mut window = FeeWindow::new();
        window.insert(Txid::from_byte_array([9; 32]), 1_000, 7, Amount::from_sat(42));

        {
            let index = NameIndex::open(dir.path()).unwrap();
            index.write(b"carol", &history).unwrap();
            index.write_fee_window(&window).unwrap();
        }

        let index = NameIndex::open(dir.path()).unwrap();
        assert_eq!(index.read(b"carol").unwrap(), history);
        assert_eq!(index.read_fee_window().unwrap(), window);
    }

    #[test]
    fn test_commit_batch_and_iterate() {
        let (_dir, index) = NameIndex::open_temp().unwrap();

        let mut a = NameHistory::new();
        a.insert(record(1, b"a"));
        let mut b = NameHistory::new();
        b.insert(record(2, b"b"));

        let mut window = FeeWindow::new();
        window.insert(Txid::from_byte_array([1; 32]), 100, 2, Amount::from_sat(5));

        index
            .commit_batch(
                [(&b"bob"[..], &b), (&b"alice"[..], &a)],
                Some(&window),
            )
            .unwrap();

        let names = index
            .iter_names()
            .unwrap()
            .map(|item| item.map(|(name, history)| (name, history.len())))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(names, vec![(b"alice".to_vec(), 1), (b"bob".to_vec(), 1)]);
        assert_eq!(index.read_fee_window().unwrap(), window);
        assert_eq!(index.raw_entries().unwrap().len(), 2);
    }

    #[test]
    fn test_clear() {
        let (_dir, index) = NameIndex::open_temp().unwrap();

        let mut history = NameHistory::new();
        history.insert(record(3, b"x"));
        index.write(b"dave", &history).unwrap();

        let mut window = FeeWindow::new();
        window.insert(Txid::from_byte_array([3; 32]), 100, 3, Amount::from_sat(5));
        index.write_fee_window(&window).unwrap();

        index.clear().unwrap();

        assert!(!index.exists(b"dave").unwrap());
        assert!(index.read_fee_window().unwrap().is_empty());
        assert!(index.raw_entries().unwrap().is_empty());
    }
}
