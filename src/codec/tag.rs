//! Tag Serializer/Deserializer: lightweight and annotated tags,
//! optionally PGP-signed, wired through the same cache and resolvers as
//! commits.

use serde::{Deserialize, Serialize};

use super::commit::{self, SignatureNode};
use super::{FetchCtx, PushCtx};
use crate::cache::RawStore;
use crate::cid::Cid;
use crate::error::{Error, Result};
use crate::gitio::{GitOdb, TagData};
use crate::ipfs::IpfsClient;
use crate::oid::Oid;
use crate::resolver::SharedError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Annotated,
    Lightweight,
}

/// the tag dag-cbor node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagNode {
    pub oid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TagType,
    pub commit: Cid,
    #[serde(rename = "taggerSig", skip_serializing_if = "Option::is_none", default)]
    pub tagger_sig: Option<SignatureNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
}

/// push the tag object (or lightweight target commit) at `oid`, under ref
/// name `ref_name` (the caller strips `refs/tags/` before calling). Not
/// cached by tag OID — a given tag OID is visited exactly once per push,
/// unlike commits which are reachable from many parent edges — but the
/// target commit it references is still routed through the commit codec's
/// own cache and resolver.
pub async fn push_tag<G, I, S>(
    ctx: PushCtx<'_, G, I, S>,
    ref_name: &str,
    oid: Oid,
) -> std::result::Result<Cid, SharedError>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    push_tag_inner(ctx, ref_name, oid)
        .await
        .map_err(std::sync::Arc::new)
}

async fn push_tag_inner<G, I, S>(
    ctx: PushCtx<'_, G, I, S>,
    ref_name: &str,
    oid: Oid,
) -> Result<Cid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let node = match ctx.odb.read_tag(oid)? {
        Some((_, TagData::Annotated {
            target,
            tagger,
            message,
            signature,
        })) => {
            let commit_cid = commit::push_commit(ctx, target)
                .await
                .map_err(Error::Nested)?;
            TagNode {
                oid: oid.to_string(),
                name: ref_name.to_owned(),
                kind: TagType::Annotated,
                commit: commit_cid,
                tagger_sig: Some((&tagger).into()),
                message: Some(message),
                signature,
            }
        }
        Some((_, TagData::Lightweight { target })) => {
            let commit_cid = commit::push_commit(ctx, target)
                .await
                .map_err(Error::Nested)?;
            TagNode {
                oid: oid.to_string(),
                name: ref_name.to_owned(),
                kind: TagType::Lightweight,
                commit: commit_cid,
                tagger_sig: None,
                message: None,
                signature: None,
            }
        }
        // not a tag object at all: oid is a commit directly
        None => {
            let commit_cid = commit::push_commit(ctx, oid).await.map_err(Error::Nested)?;
            TagNode {
                oid: oid.to_string(),
                name: ref_name.to_owned(),
                kind: TagType::Lightweight,
                commit: commit_cid,
                tagger_sig: None,
                message: None,
                signature: None,
            }
        }
    };
    ctx.ipfs.dag_put(&node).await
}

/// fetch the tag node at `cid` and materialize it in the local ODB.
pub async fn fetch_tag<G, I, S>(ctx: FetchCtx<'_, G, I, S>, cid: Cid) -> Result<Oid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let node: TagNode = ctx.ipfs.dag_get(&cid).await?;
    let commit_oid = commit::fetch_commit(ctx, node.commit.clone())
        .await
        .map_err(Error::Nested)?;

    match node.kind {
        TagType::Lightweight => {
            ctx.odb.write_lightweight_tag(&node.name, commit_oid)?;
            Ok(commit_oid)
        }
        TagType::Annotated => {
            let tagger = node.tagger_sig.clone().ok_or_else(|| Error::MalformedNode {
                cid: cid.clone(),
                field: "taggerSig",
            })?;
            let message = node.message.clone().ok_or_else(|| Error::MalformedNode {
                cid: cid.clone(),
                field: "message",
            })?;
            let data = TagData::Annotated {
                target: commit_oid,
                tagger: tagger.into(),
                message,
                signature: node.signature.clone(),
            };
            let tag_oid = ctx.odb.write_annotated_tag(&node.name, &data)?;

            let expected: Oid = node.oid.parse().map_err(|_| Error::MalformedNode {
                cid: cid.clone(),
                field: "oid",
            })?;
            if tag_oid != expected {
                return Err(Error::SignatureMismatch {
                    expected,
                    actual: tag_oid,
                });
            }
            Ok(tag_oid)
        }
    }
}
