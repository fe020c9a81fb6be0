//! Push orchestration: resolve each requested ref's OID, dispatch it to the
//! tag or commit codec, and fold every successful push into the remote's
//! VFS. A failing ref is logged and skipped rather than aborting the rest of
//! the batch.

use std::io::Write;

use crate::cache::{Cache, RawStore};
use crate::cid::Cid;
use crate::codec::{self, PushCtx};
use crate::error::{Error, Result};
use crate::gitio::GitOdb;
use crate::ipfs::IpfsClient;
use crate::refpack::{self, PushOutcome, RefKind, VfsRoot};
use crate::resolver::PushResolver;

/// one `src:dst` pair from a `push` line, e.g. `refs/heads/master` pushed to
/// `refs/heads/master` on the remote.
pub struct PushRequest {
    pub src: String,
    pub dst: String,
}

/// push every request, folding successes into `vfs`, writing `ok <dst>` to
/// `ok_out` as each one lands, and returning the new root CID alongside the
/// updated VFS.
pub async fn do_push<G, I, S>(
    odb: &G,
    ipfs: &I,
    cache: &Cache<S>,
    vfs: VfsRoot,
    reqs: &[PushRequest],
    mut ok_out: impl Write,
) -> Result<(Cid, VfsRoot)>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let resolver = PushResolver::new();
    let ctx = PushCtx {
        odb,
        ipfs,
        cache,
        resolver: &resolver,
    };

    let mut outcomes = Vec::new();
    for req in reqs {
        match push_one(ctx, &req.src).await {
            Ok((cid, kind)) => {
                writeln!(ok_out, "ok {}", req.dst).map_err(|e| Error::Io {
                    path: "<stdout>".into(),
                    source: e,
                })?;
                outcomes.push(PushOutcome {
                    dst_ref: req.dst.clone(),
                    cid,
                    kind,
                });
            }
            Err(err) => {
                tracing::warn!(src = %req.src, dst = %req.dst, error = %err, "push failed, skipping ref");
            }
        }
    }

    if outcomes.is_empty() {
        return Err(Error::InvalidRef("no ref in this push batch succeeded".into()));
    }

    let (root, vfs) = refpack::build_ref_pack(ipfs, vfs, &outcomes).await?;
    tracing::info!(%root, "push batch complete, new root CID");
    Ok((root, vfs))
}

/// resolve `src`'s OID and push it: tag refs go through the tag codec (which
/// itself falls through to the commit path for a lightweight tag), branch
/// refs go straight through the commit codec.
async fn push_one<G, I, S>(ctx: PushCtx<'_, G, I, S>, src: &str) -> Result<(Cid, RefKind)>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let oid = ctx
        .odb
        .read_ref(src)?
        .ok_or_else(|| Error::InvalidRef(src.to_owned()))?;

    if let Some(tag_name) = src.strip_prefix("refs/tags/") {
        let cid = codec::push_tag(ctx, tag_name, oid)
            .await
            .map_err(Error::Nested)?;
        Ok((cid, RefKind::Tag))
    } else {
        let cid = codec::push_commit(ctx, oid).await.map_err(Error::Nested)?;
        Ok((cid, RefKind::Branch))
    }
}
