//! The core translation engine: Tree/Commit/Tag serializer and
//! deserializer pairs, wired through the OID/CID cache and the coalescing
//! resolver. Each pair follows the same recursive
//! walk-and-write-if-absent / read-and-materialize-if-absent shape,
//! generalized from a content-hash store to OID/CID translation.

pub mod commit;
pub mod tag;
pub mod tree;

use crate::cache::Cache;
use crate::resolver::{FetchResolver, PushResolver};

/// everything a push-direction codec function needs, bundled so recursive
/// calls don't thread four parameters by hand. Plain references: `Copy`
/// regardless of `G`/`I`/`S`.
pub struct PushCtx<'a, G, I, S> {
    pub odb: &'a G,
    pub ipfs: &'a I,
    pub cache: &'a Cache<S>,
    pub resolver: &'a PushResolver,
}

impl<'a, G, I, S> Clone for PushCtx<'a, G, I, S> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, G, I, S> Copy for PushCtx<'a, G, I, S> {}

pub struct FetchCtx<'a, G, I, S> {
    pub odb: &'a G,
    pub ipfs: &'a I,
    pub cache: &'a Cache<S>,
    pub resolver: &'a FetchResolver,
}

impl<'a, G, I, S> Clone for FetchCtx<'a, G, I, S> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, G, I, S> Copy for FetchCtx<'a, G, I, S> {}

pub use commit::{push_commit, fetch_commit, CommitNode, SignatureNode};
pub use tag::{push_tag, fetch_tag, TagNode, TagType};
pub use tree::{push_tree, fetch_tree, ModeEntry, ModesMap};
