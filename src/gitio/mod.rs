//! Git collaborator: the trait boundary between the core and a real
//! Git object database, so the rest of the crate never imports `gix`
//! directly. Grounded on `maw-git::GitRepo` in the retrieved pack — the same
//! isolation technique applied to the same underlying library for the same
//! reason (keep a large, fast-moving backend crate out of the domain code).

pub mod gix_backend;

pub use gix_backend::GixOdb;

use crate::error::Result;
use crate::oid::Oid;

/// a git filemode, restricted to the five standard values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryMode {
    /// `100644`
    Blob,
    /// `100755`
    BlobExecutable,
    /// `040000`
    Tree,
    /// `120000`
    Link,
    /// `160000`, a submodule gitlink — never representable
    Commit,
}

impl EntryMode {
    /// the integer git filemode, as stored in the `modes` CBOR-DAG.
    pub fn as_octal(self) -> u32 {
        match self {
            EntryMode::Blob => 0o100644,
            EntryMode::BlobExecutable => 0o100755,
            EntryMode::Tree => 0o040000,
            EntryMode::Link => 0o120000,
            EntryMode::Commit => 0o160000,
        }
    }

    pub fn from_octal(mode: u32) -> Option<Self> {
        match mode {
            0o100644 => Some(EntryMode::Blob),
            0o100755 => Some(EntryMode::BlobExecutable),
            0o040000 => Some(EntryMode::Tree),
            0o120000 => Some(EntryMode::Link),
            0o160000 => Some(EntryMode::Commit),
            _ => None,
        }
    }

    /// blobs are the modes that "begin with octal digit 1".
    pub fn is_blob(self) -> bool {
        matches!(self, EntryMode::Blob | EntryMode::BlobExecutable | EntryMode::Link)
    }

    pub fn is_tree(self) -> bool {
        matches!(self, EntryMode::Tree)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: EntryMode,
    pub oid: Oid,
}

/// `{name, email, time, offset}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// unix seconds
    pub time: i64,
    /// seconds east of UTC
    pub offset: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitData {
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub author: Signature,
    pub committer: Signature,
    pub encoding: Option<String>,
    pub message: String,
    /// the `gpgsig` header, if present
    pub gpgsig: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagData {
    Lightweight { target: Oid },
    Annotated {
        target: Oid,
        tagger: Signature,
        message: String,
        /// trailing PGP block split out of the tag message
        signature: Option<String>,
    },
}

/// the trait boundary through which the core reads and writes the local Git
/// object database.
///
/// methods are synchronous: local ODB access is fast enough that the
/// single-threaded scheduler treats it as a brief, non-yielding
/// suspension point rather than a fan-out point, unlike IPFS calls.
pub trait GitOdb: Send + Sync {
    fn read_blob(&self, oid: Oid) -> Result<Vec<u8>>;
    fn write_blob(&self, data: &[u8]) -> Result<Oid>;

    fn read_tree(&self, oid: Oid) -> Result<Vec<TreeEntry>>;
    fn write_tree(&self, entries: &[TreeEntry]) -> Result<Oid>;

    fn read_commit(&self, oid: Oid) -> Result<CommitData>;
    /// create a commit object; `gpgsig`, if set, is written as a raw header
    /// so the resulting OID matches a commit originally carrying that header.
    fn write_commit(&self, data: &CommitData) -> Result<Oid>;

    /// `Tag.lookup`: `Ok(None)` means the OID is not a tag object at all,
    /// not an error.
    fn read_tag(&self, oid: Oid) -> Result<Option<(String, TagData)>>;
    fn write_lightweight_tag(&self, name: &str, target: Oid) -> Result<()>;
    fn write_annotated_tag(&self, name: &str, data: &TagData) -> Result<Oid>;

    /// existence check used to decide whether a cached OID must be
    /// re-materialized.
    fn contains(&self, oid: Oid) -> Result<bool>;

    fn read_ref(&self, name: &str) -> Result<Option<Oid>>;
    /// create or overwrite a branch ref; never errors on an existing branch.
    fn write_ref(&self, name: &str, oid: Oid) -> Result<()>;
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Oid)>>;

    fn read_head(&self) -> Result<Option<String>>;
    fn write_head(&self, ref_name: &str) -> Result<()>;
}
