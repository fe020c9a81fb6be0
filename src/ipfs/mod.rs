//! IPFS collaborator: the trait boundary between the core and a
//! running Kubo node, so the rest of the crate never imports `reqwest`
//! directly. Grounded on the same trait-isolation idiom as [`crate::gitio`],
//! applied to an HTTP content store the way `bobisme-maw/crates/maw-lfs`
//! isolates a batch HTTP content-store client behind its own API.

pub mod kubo;

pub use kubo::KuboClient;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cid::Cid;
use crate::error::Result;

/// one entry of a UnixFS directory listing (`ls`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LsEntry {
    pub name: String,
    pub cid: Cid,
    /// true if the entry is itself a directory
    pub is_dir: bool,
}

/// the seven HTTP operations the core needs from an IPFS node.
///
/// dag methods are generic over the CBOR payload type rather than raw bytes:
/// every caller in this crate already knows the shape it is reading or
/// writing (commit node, tag node, modes map, VFS root), so pushing
/// (de)serialization into the trait keeps call sites free of
/// `ciborium`/`serde_json` plumbing.
#[async_trait]
pub trait IpfsClient: Send + Sync {
    /// `dag.get`: fetch and decode a dag-cbor node.
    async fn dag_get<T: DeserializeOwned>(&self, cid: &Cid) -> Result<T>;

    /// `dag.put`: encode and pin a dag-cbor node, returning its CID.
    async fn dag_put<T: Serialize + Sync>(&self, value: &T) -> Result<Cid>;

    /// `ls`: list the immediate children of a UnixFS directory.
    async fn ls(&self, cid: &Cid) -> Result<Vec<LsEntry>>;

    /// `cat`: read the full contents of a UnixFS file.
    async fn cat(&self, cid: &Cid) -> Result<Vec<u8>>;

    /// `add`: write bytes as a new UnixFS file, pinned.
    async fn add(&self, data: &[u8]) -> Result<Cid>;

    /// `object.patch.addLink`: append or replace a named link on a dag-pb
    /// directory, creating the directory if `base` does not already have
    /// one (`create` semantics).
    async fn patch_add_link(&self, base: &Cid, name: &str, target: &Cid) -> Result<Cid>;

    /// `pin.add`: pin an existing CID so it survives garbage collection.
    async fn pin_add(&self, cid: &Cid) -> Result<()>;
}
