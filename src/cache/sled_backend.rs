//! sled-backed [`RawStore`](super::RawStore): an embedded ordered-key-value
//! log with bulk iteration for dump/clear.

use std::path::Path;

use super::RawStore;
use crate::error::Result;

pub struct SledCache {
    db: sled::Db,
}

impl SledCache {
    /// open (or create) the cache directory, sibling to `.git/`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::Config::default()
            .path(path.as_ref())
            .mode(sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db })
    }
}

impl RawStore for SledCache {
    fn raw_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn raw_put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }

    fn raw_drop(&self) -> Result<()> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    fn raw_iter(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.db
            .iter()
            .map(|entry| {
                let (k, v) = entry?;
                Ok((k.to_vec(), v.to_vec()))
            })
            .collect()
    }
}
