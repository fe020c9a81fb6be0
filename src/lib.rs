//! git-remote-ipfs - a Git remote helper backed by a content-addressed IPFS DAG
//!
//! maps a local Git repository onto IPFS: every commit, tree, blob, tag and
//! signature is preserved as dag-cbor, while the last-pushed branch is also
//! materialized as a browsable UnixFS directory tree. a durable OID/CID cache
//! makes repeated pushes and fetches of already-seen objects instant, and a
//! coalescing resolver collapses concurrent requests for the same object into
//! a single translation.
//!
//! # Core concepts
//!
//! - **Oid**: a Git object id (SHA-1, 40 hex chars)
//! - **Cid**: an IPFS content id (multihash + codec)
//! - **GitOdb**: the boundary to the local Git object database
//! - **IpfsClient**: the boundary to a Kubo IPFS node
//! - **Cache**: the durable, monotonic OID/CID translation table
//! - **CoalescingResolver**: single-flight registry over in-flight translations
//!
//! # Example usage
//!
//! ```no_run
//! use gitipfs::cache::{Cache, sled_backend::SledCache};
//! use gitipfs::gitio::GixOdb;
//!
//! let cache = Cache::new(SledCache::open(".git/remote-igis/cache").unwrap());
//! let odb = GixOdb::open(".").unwrap();
//! ```

pub mod cache;
pub mod cid;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gitio;
pub mod ipfs;
pub mod oid;
pub mod protocol;
pub mod push;
pub mod refpack;
pub mod resolver;

pub use cid::Cid;
pub use config::Config;
pub use error::{Error, Result};
pub use oid::Oid;
