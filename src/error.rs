use std::path::PathBuf;

use crate::cid::Cid;
use crate::oid::Oid;

/// error type for git-remote-ipfs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// transport or node error on any IPFS call; surfaced after one attempt,
    /// no automatic retries at this layer
    #[error("ipfs unavailable: {0}")]
    IpfsUnavailable(String),

    /// a cache `put` would overwrite an existing key with a differing value
    #[error("cache inconsistent: key {key} already maps to a different value")]
    CacheInconsistent { key: String },

    /// a tree entry is neither blob nor tree (e.g. a submodule gitlink);
    /// warned to stderr and omitted from both artifacts, never fatal
    #[error("unrepresentable tree entry '{name}': mode {mode:o}")]
    UnrepresentableEntry { name: String, mode: u32 },

    /// after fetch, the reconstructed commit OID disagrees with the `oid`
    /// field recorded in the commit node
    #[error("signature mismatch: expected {expected}, reconstructed {actual}")]
    SignatureMismatch { expected: Oid, actual: Oid },

    /// a CBOR node is missing a required field
    #[error("malformed node at {cid}: missing field '{field}'")]
    MalformedNode { cid: Cid, field: &'static str },

    /// the root push or fetch operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// a ref path did not parse as `refs/{heads,tags}/<name>` or `HEAD`
    #[error("invalid ref path: {0}")]
    InvalidRef(String),

    /// the remote URL was neither `ipfs://<name>` nor a bare CID
    #[error("invalid remote url: {0}")]
    InvalidRemoteUrl(String),

    /// a required local Git object was not found by OID
    #[error("git object not found: {0}")]
    GitObjectNotFound(Oid),

    /// git library error, opaque to the core beyond its message
    #[error("git error: {0}")]
    Git(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cbor serialization error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("cbor deserialization error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid oid hex: {0}")]
    InvalidOidHex(String),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("cache backend error: {0}")]
    CacheBackend(#[from] sled::Error),

    /// a nested translation failed while coalesced behind the resolver;
    /// carries the shared error every waiter observed.
    #[error(transparent)]
    Nested(#[from] std::sync::Arc<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
