//! OID/CID Cache: a durable, ordered, byte-keyed key-value store with
//! monotonic, additive semantics.
//!
//! The trait is backend-agnostic; the
//! concrete backend lives in [`sled_backend`].

pub mod sled_backend;

use crate::cid::Cid;
use crate::error::{Error, Result};
use crate::oid::Oid;

pub use sled_backend::SledCache;

const OID_TO_CID_PREFIX: &[u8] = b"o:";
const MODES_PREFIX: &[u8] = b"m:";
const CID_TO_OID_PREFIX: &[u8] = b"c:";

fn oid_key(prefix: &[u8], oid: Oid) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 40);
    key.extend_from_slice(prefix);
    key.extend_from_slice(oid.to_string().as_bytes());
    key
}

fn cid_key(cid: &Cid) -> Vec<u8> {
    let mut key = Vec::with_capacity(CID_TO_OID_PREFIX.len() + cid.as_str().len());
    key.extend_from_slice(CID_TO_OID_PREFIX);
    key.extend_from_slice(cid.as_str().as_bytes());
    key
}

/// raw byte-keyed, byte-valued store backing the cache.
pub trait RawStore: Send + Sync {
    fn raw_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn raw_put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn raw_drop(&self) -> Result<()>;
    fn raw_iter(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// the OID/CID cache, typed over the four key families.
pub struct Cache<S> {
    store: S,
}

impl<S: RawStore> Cache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `get(key) -> value | absent`
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.raw_get(key)
    }

    /// `put(key, value) -> ok`, monotonic and additive:
    /// - absent key: write it
    /// - present key, same value: no-op
    /// - present key, different value: CacheInconsistent (fatal, P6)
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.store.raw_get(key)? {
            None => self.store.raw_put(key, value),
            Some(existing) if existing == value => Ok(()),
            Some(_) => Err(Error::CacheInconsistent {
                key: String::from_utf8_lossy(key).into_owned(),
            }),
        }
    }

    /// `drop() -> ok`: empties the store (`hash-cache:clear`)
    pub fn clear(&self) -> Result<()> {
        self.store.raw_drop()
    }

    /// `iterate() -> lazy sequence of (key, value)` (`hash-cache:dump`)
    pub fn dump(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.store.raw_iter()
    }

    pub fn get_cid_for_oid(&self, oid: Oid) -> Result<Option<Cid>> {
        let key = oid_key(OID_TO_CID_PREFIX, oid);
        self.get(&key)?
            .map(|v| parse_cid(&v))
            .transpose()
    }

    pub fn put_cid_for_oid(&self, oid: Oid, cid: &Cid) -> Result<()> {
        let key = oid_key(OID_TO_CID_PREFIX, oid);
        self.put(&key, cid.as_str().as_bytes())
    }

    pub fn get_modes_cid(&self, oid: Oid) -> Result<Option<Cid>> {
        let key = oid_key(MODES_PREFIX, oid);
        self.get(&key)?.map(|v| parse_cid(&v)).transpose()
    }

    pub fn put_modes_cid(&self, oid: Oid, cid: &Cid) -> Result<()> {
        let key = oid_key(MODES_PREFIX, oid);
        self.put(&key, cid.as_str().as_bytes())
    }

    pub fn get_oid_for_cid(&self, cid: &Cid) -> Result<Option<Oid>> {
        let key = cid_key(cid);
        self.get(&key)?
            .map(|v| parse_oid(&v))
            .transpose()
    }

    pub fn put_oid_for_cid(&self, cid: &Cid, oid: Oid) -> Result<()> {
        let key = cid_key(cid);
        self.put(&key, oid.to_string().as_bytes())
    }
}

fn parse_cid(bytes: &[u8]) -> Result<Cid> {
    std::str::from_utf8(bytes)
        .map_err(|_| Error::InvalidCid("non-utf8 cache value".into()))?
        .parse()
}

fn parse_oid(bytes: &[u8]) -> Result<Oid> {
    std::str::from_utf8(bytes)
        .map_err(|_| Error::InvalidOidHex("non-utf8 cache value".into()))?
        .parse()
}
