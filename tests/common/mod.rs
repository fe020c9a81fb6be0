//! In-memory `GitOdb`/`IpfsClient` doubles shared by the integration tests,
//! following the same content-addressed double used by the crate's own unit
//! tests, rebuilt here against the public API since integration tests link
//! against the compiled crate rather than its `#[cfg(test)]` internals.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use gitipfs::cache::RawStore;
use gitipfs::cid::Cid;
use gitipfs::error::{Error, Result};
use gitipfs::gitio::{CommitData, EntryMode, GitOdb, Signature, TagData, TreeEntry};
use gitipfs::ipfs::{IpfsClient, LsEntry};
use gitipfs::oid::Oid;

/// in-memory [`RawStore`] backing the cache under test.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<std::collections::BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl RawStore for MemStore {
    fn raw_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().unwrap().get(key).cloned())
    }

    fn raw_put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.lock().unwrap().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn raw_drop(&self) -> Result<()> {
        self.inner.lock().unwrap().clear();
        Ok(())
    }

    fn raw_iter(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

fn content_oid(parts: &[&[u8]]) -> Oid {
    let mut out = [0u8; 20];
    for (i, chunk) in out.chunks_mut(8).enumerate() {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        i.hash(&mut hasher);
        for part in parts {
            part.hash(&mut hasher);
        }
        let digest = hasher.finish().to_be_bytes();
        chunk.copy_from_slice(&digest[..chunk.len()]);
    }
    Oid::from_bytes(out)
}

fn encode_signature(buf: &mut Vec<u8>, sig: &Signature) {
    buf.extend_from_slice(sig.name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(sig.email.as_bytes());
    buf.push(0);
    buf.extend_from_slice(&sig.time.to_be_bytes());
    buf.extend_from_slice(&sig.offset.to_be_bytes());
}

#[derive(Default)]
struct OdbState {
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, Vec<TreeEntry>>,
    commits: HashMap<Oid, CommitData>,
    tags: HashMap<Oid, (String, TagData)>,
    refs: HashMap<String, Oid>,
    head: Option<String>,
}

#[derive(Default)]
pub struct FakeOdb {
    state: Mutex<OdbState>,
}

impl FakeOdb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GitOdb for FakeOdb {
    fn read_blob(&self, oid: Oid) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .blobs
            .get(&oid)
            .cloned()
            .ok_or(Error::GitObjectNotFound(oid))
    }

    fn write_blob(&self, data: &[u8]) -> Result<Oid> {
        let oid = content_oid(&[b"blob", data]);
        self.state.lock().unwrap().blobs.insert(oid, data.to_vec());
        Ok(oid)
    }

    fn read_tree(&self, oid: Oid) -> Result<Vec<TreeEntry>> {
        self.state
            .lock()
            .unwrap()
            .trees
            .get(&oid)
            .cloned()
            .ok_or(Error::GitObjectNotFound(oid))
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<Oid> {
        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        let mut buf = Vec::new();
        for entry in &sorted {
            buf.extend_from_slice(entry.name.as_bytes());
            buf.push(0);
            buf.extend_from_slice(&entry.mode.as_octal().to_be_bytes());
            buf.extend_from_slice(entry.oid.as_bytes());
        }
        let oid = content_oid(&[b"tree", &buf]);
        self.state.lock().unwrap().trees.insert(oid, sorted);
        Ok(oid)
    }

    fn read_commit(&self, oid: Oid) -> Result<CommitData> {
        self.state
            .lock()
            .unwrap()
            .commits
            .get(&oid)
            .cloned()
            .ok_or(Error::GitObjectNotFound(oid))
    }

    fn write_commit(&self, data: &CommitData) -> Result<Oid> {
        let mut buf = Vec::new();
        buf.extend_from_slice(data.tree.as_bytes());
        for parent in &data.parents {
            buf.extend_from_slice(parent.as_bytes());
        }
        encode_signature(&mut buf, &data.author);
        encode_signature(&mut buf, &data.committer);
        if let Some(encoding) = &data.encoding {
            buf.extend_from_slice(encoding.as_bytes());
        }
        buf.extend_from_slice(data.message.as_bytes());
        if let Some(sig) = &data.gpgsig {
            buf.extend_from_slice(sig.as_bytes());
        }
        let oid = content_oid(&[b"commit", &buf]);
        self.state.lock().unwrap().commits.insert(oid, data.clone());
        Ok(oid)
    }

    fn read_tag(&self, oid: Oid) -> Result<Option<(String, TagData)>> {
        Ok(self.state.lock().unwrap().tags.get(&oid).cloned())
    }

    fn write_lightweight_tag(&self, name: &str, target: Oid) -> Result<()> {
        self.write_ref(&format!("refs/tags/{name}"), target)
    }

    fn write_annotated_tag(&self, name: &str, data: &TagData) -> Result<Oid> {
        let TagData::Annotated {
            target,
            tagger,
            message,
            signature,
        } = data
        else {
            return Err(Error::Git(
                "write_annotated_tag called with lightweight data".into(),
            ));
        };
        let mut buf = Vec::new();
        buf.extend_from_slice(target.as_bytes());
        encode_signature(&mut buf, tagger);
        buf.extend_from_slice(message.as_bytes());
        if let Some(sig) = signature {
            buf.extend_from_slice(sig.as_bytes());
        }
        let oid = content_oid(&[b"tag", &buf]);
        self.state
            .lock()
            .unwrap()
            .tags
            .insert(oid, (name.to_owned(), data.clone()));
        self.write_ref(&format!("refs/tags/{name}"), oid)?;
        Ok(oid)
    }

    fn contains(&self, oid: Oid) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.blobs.contains_key(&oid)
            || state.trees.contains_key(&oid)
            || state.commits.contains_key(&oid)
            || state.tags.contains_key(&oid))
    }

    fn read_ref(&self, name: &str) -> Result<Option<Oid>> {
        Ok(self.state.lock().unwrap().refs.get(name).copied())
    }

    fn write_ref(&self, name: &str, oid: Oid) -> Result<()> {
        self.state.lock().unwrap().refs.insert(name.to_owned(), oid);
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Oid)>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, oid)| (name.clone(), *oid))
            .collect())
    }

    fn read_head(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().head.clone())
    }

    fn write_head(&self, ref_name: &str) -> Result<()> {
        self.state.lock().unwrap().head = Some(ref_name.to_owned());
        Ok(())
    }
}

fn content_cid(tag: &[u8], bytes: &[u8]) -> Cid {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    tag.hash(&mut hasher);
    bytes.hash(&mut hasher);
    Cid::new(format!("fake-{:016x}-{}", hasher.finish(), bytes.len()))
}

#[derive(Default)]
struct IpfsState {
    dag: HashMap<Cid, Vec<u8>>,
    files: HashMap<Cid, Vec<u8>>,
    dirs: HashMap<Cid, Vec<(String, Cid)>>,
}

#[derive(Default)]
pub struct FakeIpfs {
    state: Mutex<IpfsState>,
}

impl FakeIpfs {
    pub fn new() -> Self {
        let state = IpfsState {
            dirs: HashMap::from([(Cid::empty_dir(), Vec::new())]),
            ..IpfsState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl IpfsClient for FakeIpfs {
    async fn dag_get<T: DeserializeOwned>(&self, cid: &Cid) -> Result<T> {
        let bytes = self
            .state
            .lock()
            .unwrap()
            .dag
            .get(cid)
            .cloned()
            .ok_or_else(|| Error::IpfsUnavailable(format!("no dag node at {cid}")))?;
        ciborium::de::from_reader(bytes.as_slice()).map_err(Error::CborDecode)
    }

    async fn dag_put<T: Serialize + Sync>(&self, value: &T) -> Result<Cid> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(value, &mut bytes).map_err(Error::CborEncode)?;
        let cid = content_cid(b"dag", &bytes);
        self.state.lock().unwrap().dag.insert(cid.clone(), bytes);
        Ok(cid)
    }

    async fn ls(&self, cid: &Cid) -> Result<Vec<LsEntry>> {
        let state = self.state.lock().unwrap();
        let links = state
            .dirs
            .get(cid)
            .cloned()
            .ok_or_else(|| Error::IpfsUnavailable(format!("no directory at {cid}")))?;
        Ok(links
            .into_iter()
            .map(|(name, child)| {
                let is_dir = state.dirs.contains_key(&child);
                LsEntry {
                    name,
                    cid: child,
                    is_dir,
                }
            })
            .collect())
    }

    async fn cat(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(cid)
            .cloned()
            .ok_or_else(|| Error::IpfsUnavailable(format!("no file at {cid}")))
    }

    async fn add(&self, data: &[u8]) -> Result<Cid> {
        let cid = content_cid(b"file", data);
        self.state.lock().unwrap().files.insert(cid.clone(), data.to_vec());
        Ok(cid)
    }

    async fn patch_add_link(&self, base: &Cid, name: &str, target: &Cid) -> Result<Cid> {
        let mut state = self.state.lock().unwrap();
        let mut links = state.dirs.get(base).cloned().unwrap_or_default();
        links.retain(|(n, _)| n != name);
        links.push((name.to_owned(), target.clone()));
        links.sort_by(|a, b| a.0.cmp(&b.0));
        let mut buf = Vec::new();
        for (n, c) in &links {
            buf.extend_from_slice(n.as_bytes());
            buf.push(0);
            buf.extend_from_slice(c.as_str().as_bytes());
        }
        let new_cid = content_cid(b"dir", &buf);
        state.dirs.insert(new_cid.clone(), links);
        Ok(new_cid)
    }

    async fn pin_add(&self, _cid: &Cid) -> Result<()> {
        Ok(())
    }
}

pub fn blob_entry(name: &str, mode: EntryMode, oid: Oid) -> TreeEntry {
    TreeEntry {
        name: name.to_owned(),
        mode,
        oid,
    }
}

pub fn sig(name: &str, time: i64) -> Signature {
    Signature {
        name: name.to_owned(),
        email: format!("{name}@example.com"),
        time,
        offset: 0,
    }
}
