//! Wire-facing helpers for the remote-helper driver: turning a VFS root into
//! `list` output lines, and parsing the two remote URL forms Git hands the
//! helper (`ipfs://<name>` for a brand-new remote, a bare CID for a
//! continuation push or a fetch).

use crate::cid::Cid;
use crate::codec::{CommitNode, TagNode};
use crate::error::{Error, Result};
use crate::ipfs::IpfsClient;
use crate::refpack::VfsRoot;

/// where a `git-remote-ipfs <remote> <url>` invocation is rooted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteLocator {
    /// `ipfs://<name>`: nothing exists yet, a fresh `uuid` will be minted.
    Fresh { name: String },
    /// a bare CID: an existing remote root to push onto or fetch from.
    Existing { root: Cid },
}

pub fn parse_remote_url(url: &str) -> Result<RemoteLocator> {
    if let Some(name) = url.strip_prefix("ipfs://") {
        if name.is_empty() {
            return Err(Error::InvalidRemoteUrl(url.to_owned()));
        }
        return Ok(RemoteLocator::Fresh {
            name: name.to_owned(),
        });
    }
    let root: Cid = url
        .parse()
        .map_err(|_| Error::InvalidRemoteUrl(url.to_owned()))?;
    Ok(RemoteLocator::Existing { root })
}

/// `serializeRefs`: one `<oid> <ref-path>` line per ref, plus a symref line
/// for `HEAD` when the VFS records one, answering Git's `list` command.
pub async fn serialize_refs<I: IpfsClient>(ipfs: &I, vfs: &VfsRoot) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    for (name, cid) in &vfs.refs.heads {
        let node: CommitNode = ipfs.dag_get(cid).await?;
        lines.push(format!("{} refs/heads/{}", node.oid, name));
    }
    for (name, cid) in &vfs.refs.tags {
        let node: TagNode = ipfs.dag_get(cid).await?;
        lines.push(format!("{} refs/tags/{}", node.oid, name));
    }
    if let Some(head) = &vfs.head {
        lines.push(format!("@{head} HEAD"));
    }

    Ok(lines)
}
