//! Tree Serializer/Deserializer.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::{FetchCtx, PushCtx};
use crate::cache::RawStore;
use crate::cid::Cid;
use crate::error::{Error, Result};
use crate::gitio::{EntryMode, GitOdb, TreeEntry};
use crate::ipfs::{IpfsClient, LsEntry};
use crate::oid::Oid;
use crate::resolver::SharedError;

/// one value of the `modes` dag-cbor map: a leaf stores the git filemode
/// integer, a subtree stores the CID of that subtree's own modes map.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeEntry {
    Leaf(u32),
    Tree(Cid),
}

pub type ModesMap = BTreeMap<String, ModeEntry>;

/// `pushTree(tree) -> (fsCID, modesCID)`, cached and coalesced by
/// tree OID through the push resolver.
pub async fn push_tree<G, I, S>(
    ctx: PushCtx<'_, G, I, S>,
    oid: Oid,
) -> std::result::Result<(Cid, Cid), SharedError>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if let Some(fs) = ctx.cache.get_cid_for_oid(oid).map_err(Arc::new)? {
        if let Some(modes) = ctx.cache.get_modes_cid(oid).map_err(Arc::new)? {
            return Ok((fs, modes));
        }
    }
    let fs = ctx
        .resolver
        .resolve(oid, || push_tree_uncached(ctx, oid))
        .await?;
    let modes = ctx
        .cache
        .get_modes_cid(oid)
        .map_err(Arc::new)?
        .ok_or_else(|| {
            Arc::new(Error::MalformedNode {
                cid: fs.clone(),
                field: "modes",
            })
        })?;
    Ok((fs, modes))
}

struct TranslatedEntry {
    name: String,
    cid: Cid,
    mode_entry: ModeEntry,
}

async fn push_tree_uncached<G, I, S>(ctx: PushCtx<'_, G, I, S>, oid: Oid) -> Result<Cid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let entries = ctx.odb.read_tree(oid)?;

    let translated =
        try_join_all(entries.iter().map(|entry| push_entry(ctx, entry))).await?;

    let mut base = Cid::empty_dir();
    let mut modes = ModesMap::new();
    for item in translated.into_iter().flatten() {
        base = ctx.ipfs.patch_add_link(&base, &item.name, &item.cid).await?;
        modes.insert(item.name, item.mode_entry);
    }

    let modes_cid = ctx.ipfs.dag_put(&modes).await?;
    ctx.cache.put_modes_cid(oid, &modes_cid)?;
    ctx.cache.put_cid_for_oid(oid, &base)?;
    ctx.cache.put_oid_for_cid(&base, oid)?;
    Ok(base)
}

async fn push_entry<G, I, S>(
    ctx: PushCtx<'_, G, I, S>,
    entry: &TreeEntry,
) -> Result<Option<TranslatedEntry>>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if entry.mode.is_tree() {
        let (fs, modes) = push_tree(ctx, entry.oid).await.map_err(Error::Nested)?;
        return Ok(Some(TranslatedEntry {
            name: entry.name.clone(),
            cid: fs,
            mode_entry: ModeEntry::Tree(modes),
        }));
    }
    if entry.mode.is_blob() {
        let cid = push_blob(ctx, entry.oid).await.map_err(Error::Nested)?;
        return Ok(Some(TranslatedEntry {
            name: entry.name.clone(),
            cid,
            mode_entry: ModeEntry::Leaf(entry.mode.as_octal()),
        }));
    }
    tracing::warn!(
        name = %entry.name,
        mode = format!("{:o}", entry.mode.as_octal()),
        "unrepresentable tree entry, skipping"
    );
    Ok(None)
}

async fn push_blob<G, I, S>(
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
    ctx.resolver.resolve(oid, || push_blob_uncached(ctx, oid)).await
}

async fn push_blob_uncached<G, I, S>(ctx: PushCtx<'_, G, I, S>, oid: Oid) -> Result<Cid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let data = ctx.odb.read_blob(oid)?;
    let cid = ctx.ipfs.add(&data).await?;
    ctx.cache.put_cid_for_oid(oid, &cid)?;
    ctx.cache.put_oid_for_cid(&cid, oid)?;
    Ok(cid)
}

/// `fetchTree(fsCID, modesCID) -> OID`, cached and coalesced by
/// `fsCID` through the fetch resolver.
pub async fn fetch_tree<G, I, S>(
    ctx: FetchCtx<'_, G, I, S>,
    fs_cid: Cid,
    modes_cid: Cid,
) -> std::result::Result<Oid, SharedError>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if let Some(oid) = ctx.cache.get_oid_for_cid(&fs_cid).map_err(Arc::new)? {
        if ctx.odb.contains(oid).map_err(Arc::new)? {
            return Ok(oid);
        }
    }
    let key = fs_cid.clone();
    ctx.resolver
        .resolve(key, || fetch_tree_uncached(ctx, fs_cid, modes_cid))
        .await
}

async fn fetch_tree_uncached<G, I, S>(
    ctx: FetchCtx<'_, G, I, S>,
    fs_cid: Cid,
    modes_cid: Cid,
) -> Result<Oid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let listing = ctx.ipfs.ls(&fs_cid).await?;
    let modes: ModesMap = ctx.ipfs.dag_get(&modes_cid).await?;

    let translated =
        try_join_all(listing.iter().map(|entry| fetch_entry(ctx, entry, &modes))).await?;

    let tree_entries: Vec<TreeEntry> = translated
        .into_iter()
        .map(|(name, oid, mode)| TreeEntry { name, mode, oid })
        .collect();
    let tree_oid = ctx.odb.write_tree(&tree_entries)?;

    ctx.cache.put_cid_for_oid(tree_oid, &fs_cid)?;
    ctx.cache.put_oid_for_cid(&fs_cid, tree_oid)?;
    ctx.cache.put_modes_cid(tree_oid, &modes_cid)?;
    Ok(tree_oid)
}

async fn fetch_entry<G, I, S>(
    ctx: FetchCtx<'_, G, I, S>,
    entry: &LsEntry,
    modes: &ModesMap,
) -> Result<(String, Oid, EntryMode)>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    if entry.is_dir {
        let child_modes_cid = match modes.get(&entry.name) {
            Some(ModeEntry::Tree(cid)) => cid.clone(),
            _ => {
                return Err(Error::MalformedNode {
                    cid: entry.cid.clone(),
                    field: "modes",
                })
            }
        };
        let oid = fetch_tree(ctx, entry.cid.clone(), child_modes_cid)
            .await
            .map_err(Error::Nested)?;
        Ok((entry.name.clone(), oid, EntryMode::Tree))
    } else {
        let mode = match modes.get(&entry.name) {
            Some(ModeEntry::Leaf(m)) => EntryMode::from_octal(*m).ok_or_else(|| {
                Error::UnrepresentableEntry {
                    name: entry.name.clone(),
                    mode: *m,
                }
            })?,
            _ => {
                return Err(Error::MalformedNode {
                    cid: entry.cid.clone(),
                    field: "modes",
                })
            }
        };
        let oid = fetch_blob(ctx, entry.cid.clone()).await.map_err(Error::Nested)?;
        Ok((entry.name.clone(), oid, mode))
    }
}

async fn fetch_blob<G, I, S>(
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
    ctx.resolver.resolve(key, || fetch_blob_uncached(ctx, cid)).await
}

async fn fetch_blob_uncached<G, I, S>(ctx: FetchCtx<'_, G, I, S>, cid: Cid) -> Result<Oid>
where
    G: GitOdb,
    I: IpfsClient,
    S: RawStore,
{
    let data = ctx.ipfs.cat(&cid).await?;
    let oid = ctx.odb.write_blob(&data)?;
    ctx.cache.put_oid_for_cid(&cid, oid)?;
    ctx.cache.put_cid_for_oid(oid, &cid)?;
    Ok(oid)
}
