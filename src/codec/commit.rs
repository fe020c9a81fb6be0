//! Commit Serializer/Deserializer.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::tree;
use super::{FetchCtx, PushCtx};
use crate::cache::RawStore;
use crate::cid::Cid;
use crate::error::{Error, Result};
use crate::gitio::{CommitData, GitOdb, Signature};
use crate::ipfs::IpfsClient;
use crate::oid::Oid;
use crate::resolver::SharedError;

/// `{name, email, time, offset}`, the on-wire shape of a signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureNode {
    pub name: String,
    pub email: String,
    pub time: i64,
    pub offset: i32,
}

impl From<&Signature> for SignatureNode {
    fn from(sig: &Signature) -> Self {
        Self {
            name: sig.name.clone(),
            email: sig.email.clone(),
            time: sig.time,
            offset: sig.offset,
        }
    }
}

impl From<SignatureNode> for Signature {
    fn from(node: SignatureNode) -> Self {
        Self {
            name: node.name,
            email: node.email,
            time: node.time,
            offset: node.offset,
        }
    }
}

/// the commit dag-cbor node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitNode {
    pub oid: String,
    #[serde(rename = "authorSig")]
    pub author_sig: SignatureNode,
    #[serde(rename = "committerSig")]
    pub committer_sig: SignatureNode,
    pub encoding: Option<String>,
    pub message: String,
    pub tree: Cid,
    pub modes: Cid,
    pub parents: Vec<Cid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
}

/// `pushCommit(oid) -> CID`, cached and coalesced by commit OID.
pub async fn push_commit<G, I, S>(
    ctx: PushCtx<'_, G, I, S>,
    oid: Oid,
) -> std::result::Result<Cid, SharedError>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if let Some(cid) = ctx.cache.get_cid_for_oid(oid).map_err(Arc::new)? {
        return Ok(cid);
    }
    ctx.resolver
        .resolve(oid, || push_commit_uncached(ctx, oid))
        .await
}

async fn push_commit_uncached<G, I, S>(ctx: PushCtx<'_, G, I, S>, oid: Oid) -> Result<Cid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let commit = ctx.odb.read_commit(oid)?;
    let (tree_cid, modes_cid) = tree::push_tree(ctx, commit.tree)
        .await
        .map_err(Error::Nested)?;

    let parent_cids = try_join_all(commit.parents.iter().map(|&parent| push_commit(ctx, parent)))
        .await
        .map_err(Error::Nested)?;

    let node = CommitNode {
        oid: oid.to_string(),
        author_sig: (&commit.author).into(),
        committer_sig: (&commit.committer).into(),
        encoding: commit.encoding.clone(),
        message: commit.message.clone(),
        tree: tree_cid,
        modes: modes_cid,
        parents: parent_cids,
        signature: commit.gpgsig.clone(),
    };
    let cid = ctx.ipfs.dag_put(&node).await?;
    ctx.cache.put_cid_for_oid(oid, &cid)?;
    ctx.cache.put_oid_for_cid(&cid, oid)?;
    Ok(cid)
}

/// `fetchCommit(cid) -> CommitOID`, cached and coalesced by CID.
/// Always verifies the reconstructed OID matches the node's recorded `oid`.
pub async fn fetch_commit<G, I, S>(
    ctx: FetchCtx<'_, G, I, S>,
    cid: Cid,
) -> std::result::Result<Oid, SharedError>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if let Some(oid) = ctx.cache.get_oid_for_cid(&cid).map_err(Arc::new)? {
        if ctx.odb.contains(oid).map_err(Arc::new)? {
            return Ok(oid);
        }
    }
    let key = cid.clone();
    ctx.resolver
        .resolve(key, || fetch_commit_uncached(ctx, cid))
        .await
}

async fn fetch_commit_uncached<G, I, S>(ctx: FetchCtx<'_, G, I, S>, cid: Cid) -> Result<Oid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let node: CommitNode = ctx.ipfs.dag_get(&cid).await?;
    let tree_oid = tree::fetch_tree(ctx, node.tree.clone(), node.modes.clone())
        .await
        .map_err(Error::Nested)?;

    let parent_oids = try_join_all(
        node.parents
            .iter()
            .cloned()
            .map(|parent_cid| fetch_commit(ctx, parent_cid)),
    )
    .await
    .map_err(Error::Nested)?;

    let commit_data = CommitData {
        tree: tree_oid,
        parents: parent_oids,
        author: node.author_sig.clone().into(),
        committer: node.committer_sig.clone().into(),
        encoding: node.encoding.clone(),
        message: node.message.clone(),
        gpgsig: node.signature.clone(),
    };
    let written_oid = ctx.odb.write_commit(&commit_data)?;

    let expected: Oid = node
        .oid
        .parse()
        .map_err(|_| Error::MalformedNode {
            cid: cid.clone(),
            field: "oid",
        })?;
    if written_oid != expected {
        return Err(Error::SignatureMismatch {
            expected,
            actual: written_oid,
        });
    }

    ctx.cache.put_oid_for_cid(&cid, written_oid)?;
    ctx.cache.put_cid_for_oid(written_oid, &cid)?;
    Ok(written_oid)
}
