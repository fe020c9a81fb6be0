//! Fetch orchestration: resolve each requested ref against the remote's VFS,
//! materialize it into the local ODB through the commit or tag codec, and
//! restore `HEAD`. A failing ref is logged and skipped, not fatal to the
//! batch.

use crate::cache::{Cache, RawStore};
use crate::codec::{self, FetchCtx};
use crate::error::{Error, Result};
use crate::gitio::GitOdb;
use crate::ipfs::IpfsClient;
use crate::refpack::VfsRoot;
use crate::resolver::FetchResolver;

/// one `fetch <sha1> <name>` line; `oid` is the hash Git already knows from
/// `list` output and is not otherwise consulted here (the reconstructed
/// commit/tag OID is independently verified against the CBOR node's own
/// `oid` field inside the codec).
pub struct FetchRequest {
    pub oid: String,
    pub ref_name: String,
}

/// fetch every request against `vfs`, writing local refs as each lands, then
/// restore `HEAD` from `vfs.head` if present.
pub async fn do_fetch<G, I, S>(
    odb: &G,
    ipfs: &I,
    cache: &Cache<S>,
    vfs: &VfsRoot,
    reqs: &[FetchRequest],
) -> Result<()>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let resolver = FetchResolver::new();
    let ctx = FetchCtx {
        odb,
        ipfs,
        cache,
        resolver: &resolver,
    };

    for req in reqs {
        if let Err(err) = fetch_one(ctx, vfs, req).await {
            tracing::warn!(ref_name = %req.ref_name, requested_oid = %req.oid, error = %err, "fetch failed, skipping ref");
        }
    }

    if let Some(head_ref) = &vfs.head {
        odb.write_head(head_ref)?;
    }
    Ok(())
}

async fn fetch_one<G, I, S>(
    ctx: FetchCtx<'_, G, I, S>,
    vfs: &VfsRoot,
    req: &FetchRequest,
) -> Result<()>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if let Some(name) = req.ref_name.strip_prefix("refs/heads/") {
        let cid = vfs
            .refs
            .heads
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidRef(req.ref_name.clone()))?;
        let oid = codec::fetch_commit(ctx, cid).await.map_err(Error::Nested)?;
        ctx.odb.write_ref(&req.ref_name, oid)?;
    } else if let Some(name) = req.ref_name.strip_prefix("refs/tags/") {
        let cid = vfs
            .refs
            .tags
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidRef(req.ref_name.clone()))?;
        codec::fetch_tag(ctx, cid).await?;
    } else {
        return Err(Error::InvalidRef(req.ref_name.clone()));
    }
    Ok(())
}
