//! VFS Root type and Ref Pack Builder: composes pushed commit/tag
//! CIDs into the virtual `.git/refs/*` hierarchy, records `HEAD` and a
//! stable `uuid`, and emits the final root CID. Follows the same
//! hierarchical ref storage idiom as a files-on-disk ref store, adapted to
//! a nested dag-cbor map.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::cid::Cid;
use crate::codec::{CommitNode, TagNode};
use crate::error::{Error, Result};
use crate::ipfs::IpfsClient;

/// `.git/`: name, stable uuid, HEAD ref path, and the
/// `refs/{heads,tags}` hierarchy.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VfsRoot {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub uuid: Option<String>,
    #[serde(rename = "HEAD", skip_serializing_if = "Option::is_none", default)]
    pub head: Option<String>,
    #[serde(default)]
    pub refs: RefsNode,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RefsNode {
    #[serde(default)]
    pub heads: BTreeMap<String, Cid>,
    #[serde(default)]
    pub tags: BTreeMap<String, Cid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefKind {
    Branch,
    Tag,
}

/// one successfully pushed ref, ready to be folded into the VFS.
#[derive(Clone, Debug)]
pub struct PushOutcome {
    /// full ref path, e.g. `refs/heads/master` or `refs/tags/v1`
    pub dst_ref: String,
    /// the commit CID (branch) or tag CID (tag)
    pub cid: Cid,
    pub kind: RefKind,
}

fn strip_ref_prefix<'a>(dst_ref: &'a str, prefix: &str) -> Result<&'a str> {
    dst_ref
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| Error::InvalidRef(dst_ref.to_owned()))
}

/// mint a UUIDv1. Node-id bytes are
/// random with the multicast bit set, per RFC 4122's guidance for
/// implementations with no real MAC address to draw from.
fn mint_uuid_v1() -> String {
    let mut node_id = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut node_id);
    node_id[0] |= 0x01;
    uuid::Uuid::now_v1(&node_id).to_string()
}

/// `object.patch.addLink`'s starting point for a fresh working tree when a
/// push batch's first successful result is a tag: dereference `.commit`
/// first to reach the commit's `tree` field.
async fn working_tree_base<I: IpfsClient>(ipfs: &I, outcome: &PushOutcome) -> Result<Cid> {
    match outcome.kind {
        RefKind::Branch => {
            let node: CommitNode = ipfs.dag_get(&outcome.cid).await?;
            Ok(node.tree)
        }
        RefKind::Tag => {
            let tag: TagNode = ipfs.dag_get(&outcome.cid).await?;
            let node: CommitNode = ipfs.dag_get(&tag.commit).await?;
            Ok(node.tree)
        }
    }
}

/// fold a batch of push outcomes into `vfs` and emit the new root CID.
/// `vfs` should already reflect any continuation preload before this call;
/// `HEAD` is always recomputed for this batch.
pub async fn build_ref_pack<I: IpfsClient>(
    ipfs: &I,
    mut vfs: VfsRoot,
    outcomes: &[PushOutcome],
) -> Result<(Cid, VfsRoot)> {
    let Some(first) = outcomes.first() else {
        return Err(Error::InvalidRef("push batch had no successful refs".into()));
    };

    vfs.head = None;
    for outcome in outcomes {
        match outcome.kind {
            RefKind::Branch => {
                let name = strip_ref_prefix(&outcome.dst_ref, "refs/heads/")?;
                vfs.refs.heads.insert(name.to_owned(), outcome.cid.clone());
            }
            RefKind::Tag => {
                let name = strip_ref_prefix(&outcome.dst_ref, "refs/tags/")?;
                vfs.refs.tags.insert(name.to_owned(), outcome.cid.clone());
            }
        }
        if vfs.head.is_none() {
            vfs.head = Some(outcome.dst_ref.clone());
        }
    }

    if vfs.uuid.is_none() {
        vfs.uuid = Some(mint_uuid_v1());
    }

    let working_tree = working_tree_base(ipfs, first).await?;
    let vfs_cid = ipfs.dag_put(&vfs).await?;
    let root = ipfs.patch_add_link(&working_tree, ".git", &vfs_cid).await?;
    ipfs.pin_add(&root).await?;
    Ok((root, vfs))
}

/// preload a VFS from an existing remote root for a continuation push
///: `<CID>/.git/`, shallow-merged with
/// caller-provided fields winning. Here the caller provides nothing ahead
/// of time, so this is a straight load.
pub async fn load_vfs<I: IpfsClient>(ipfs: &I, root_cid: &Cid) -> Result<VfsRoot> {
    let listing = ipfs.ls(root_cid).await?;
    let git_link = listing
        .into_iter()
        .find(|e| e.name == ".git")
        .ok_or_else(|| Error::MalformedNode {
            cid: root_cid.clone(),
            field: ".git",
        })?;
    ipfs.dag_get(&git_link.cid).await
}
