//! gix-backed [`GitOdb`]. Conversion helpers and the read/write pairing
//! style are grounded on `maw-git/src/objects_impl.rs` (`to_gix_oid`,
//! `from_gix_oid`, `read_blob`/`write_blob`, `read_tree`/`write_tree`,
//! `read_commit`/`create_commit`) from the same corpus, adapted from
//! `maw-git`'s own `GitOid`/`TreeEntry` vocabulary to this crate's.

use std::path::Path;

use gix::bstr::ByteSlice;
use gix::objs::tree::EntryKind;

use super::{CommitData, EntryMode, GitOdb, Signature, TagData, TreeEntry};
use crate::error::{Error, Result};
use crate::oid::Oid;

pub struct GixOdb {
    repo: gix::Repository,
}

impl GixOdb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = gix::open(path.as_ref()).map_err(|e| Error::Git(e.to_string()))?;
        Ok(Self { repo })
    }
}

fn to_gix_oid(oid: Oid) -> gix::ObjectId {
    oid.into()
}

fn from_gix_oid(id: gix::ObjectId) -> Oid {
    id.into()
}

fn from_entry_kind(kind: EntryKind) -> Option<EntryMode> {
    match kind {
        EntryKind::Blob => Some(EntryMode::Blob),
        EntryKind::BlobExecutable => Some(EntryMode::BlobExecutable),
        EntryKind::Tree => Some(EntryMode::Tree),
        EntryKind::Link => Some(EntryMode::Link),
        EntryKind::Commit => Some(EntryMode::Commit),
    }
}

fn to_entry_kind(mode: EntryMode) -> EntryKind {
    match mode {
        EntryMode::Blob => EntryKind::Blob,
        EntryMode::BlobExecutable => EntryKind::BlobExecutable,
        EntryMode::Tree => EntryKind::Tree,
        EntryMode::Link => EntryKind::Link,
        EntryMode::Commit => EntryKind::Commit,
    }
}

fn to_gix_signature(sig: &Signature) -> gix::actor::Signature {
    gix::actor::Signature {
        name: sig.name.as_str().into(),
        email: sig.email.as_str().into(),
        time: gix::date::Time::new(sig.time, sig.offset),
    }
}

fn from_gix_signature(sig: gix::actor::SignatureRef<'_>) -> Signature {
    Signature {
        name: sig.name.to_str_lossy().into_owned(),
        email: sig.email.to_str_lossy().into_owned(),
        time: sig.time().seconds,
        offset: sig.time().offset,
    }
}

const GPGSIG: &[u8] = b"gpgsig";

impl GitOdb for GixOdb {
    fn read_blob(&self, oid: Oid) -> Result<Vec<u8>> {
        let gid = to_gix_oid(oid);
        let mut blob = self
            .repo
            .find_blob(gid)
            .map_err(|e| Error::Git(format!("blob {oid}: {e}")))?;
        Ok(blob.take_data())
    }

    fn write_blob(&self, data: &[u8]) -> Result<Oid> {
        let id = self
            .repo
            .write_blob(data)
            .map_err(|e| Error::Git(format!("write blob: {e}")))?;
        Ok(from_gix_oid(id.detach()))
    }

    fn read_tree(&self, oid: Oid) -> Result<Vec<TreeEntry>> {
        let gid = to_gix_oid(oid);
        let tree = self
            .repo
            .find_tree(gid)
            .map_err(|e| Error::Git(format!("tree {oid}: {e}")))?;

        let mut entries = Vec::new();
        for result in tree.iter() {
            let entry = result.map_err(|e| Error::Git(format!("decode tree entry: {e}")))?;
            let name = entry.inner.filename.to_str_lossy().into_owned();
            let oid = from_gix_oid(entry.inner.oid.into());
            match from_entry_kind(entry.inner.mode.kind()) {
                Some(mode) => entries.push(TreeEntry { name, mode, oid }),
                None => continue,
            }
        }
        Ok(entries)
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<Oid> {
        let tree = gix::objs::Tree {
            entries: entries
                .iter()
                .map(|e| gix::objs::tree::Entry {
                    mode: to_entry_kind(e.mode).into(),
                    filename: e.name.as_str().into(),
                    oid: to_gix_oid(e.oid),
                })
                .collect(),
        };
        let id = self
            .repo
            .write_object(&tree)
            .map_err(|e| Error::Git(format!("write tree: {e}")))?;
        Ok(from_gix_oid(id.detach()))
    }

    fn read_commit(&self, oid: Oid) -> Result<CommitData> {
        let gid = to_gix_oid(oid);
        let commit = self
            .repo
            .find_commit(gid)
            .map_err(|e| Error::Git(format!("commit {oid}: {e}")))?;
        let decoded = commit
            .decode()
            .map_err(|e| Error::Git(format!("decode commit {oid}: {e}")))?;

        let gpgsig = decoded
            .extra_headers()
            .find(|(key, _)| *key == GPGSIG)
            .map(|(_, value)| value.to_str_lossy().into_owned());

        Ok(CommitData {
            tree: from_gix_oid(decoded.tree()),
            parents: decoded.parents().map(from_gix_oid).collect(),
            author: from_gix_signature(decoded.author()),
            committer: from_gix_signature(decoded.committer()),
            encoding: decoded.encoding.map(|e| e.to_str_lossy().into_owned()),
            message: decoded.message.to_str_lossy().into_owned(),
            gpgsig,
        })
    }

    fn write_commit(&self, data: &CommitData) -> Result<Oid> {
        let mut extra_headers = Vec::new();
        if let Some(sig) = &data.gpgsig {
            extra_headers.push((GPGSIG.into(), sig.as_bytes().into()));
        }
        let commit = gix::objs::Commit {
            tree: to_gix_oid(data.tree),
            parents: data.parents.iter().map(|p| to_gix_oid(*p)).collect(),
            author: to_gix_signature(&data.author),
            committer: to_gix_signature(&data.committer),
            encoding: data.encoding.as_ref().map(|e| e.as_str().into()),
            message: data.message.as_str().into(),
            extra_headers,
        };
        let id = self
            .repo
            .write_object(&commit)
            .map_err(|e| Error::Git(format!("write commit: {e}")))?;
        Ok(from_gix_oid(id.detach()))
    }

    fn read_tag(&self, oid: Oid) -> Result<Option<(String, TagData)>> {
        let gid = to_gix_oid(oid);
        let object = self
            .repo
            .try_find_object(gid)
            .map_err(|e| Error::Git(format!("find tag {oid}: {e}")))?;
        let Some(object) = object else {
            return Ok(None);
        };
        if object.kind != gix::object::Kind::Tag {
            return Ok(None);
        }
        let tag = object.into_tag();
        let decoded = tag
            .decode()
            .map_err(|e| Error::Git(format!("decode tag {oid}: {e}")))?;

        let name = decoded.name.to_str_lossy().into_owned();
        let target = from_gix_oid(decoded.target());
        let message = decoded.message.to_str_lossy().into_owned();
        let (message, signature) = split_pgp_block(&message);
        let tagger = decoded
            .tagger
            .map(from_gix_signature)
            .unwrap_or(Signature {
                name: String::new(),
                email: String::new(),
                time: 0,
                offset: 0,
            });

        Ok(Some((
            name,
            TagData::Annotated {
                target,
                tagger,
                message,
                signature,
            },
        )))
    }

    fn write_lightweight_tag(&self, name: &str, target: Oid) -> Result<()> {
        self.write_ref(&format!("refs/tags/{name}"), target)
    }

    fn write_annotated_tag(&self, name: &str, data: &TagData) -> Result<Oid> {
        let TagData::Annotated {
            target,
            tagger,
            message,
            signature,
        } = data
        else {
            return Err(Error::Git("write_annotated_tag called with lightweight data".into()));
        };
        let mut full_message = message.clone();
        if let Some(sig) = signature {
            full_message.push_str(sig);
        }
        let tag = gix::objs::Tag {
            target: to_gix_oid(*target),
            target_kind: gix::object::Kind::Commit,
            name: name.into(),
            tagger: Some(to_gix_signature(tagger)),
            message: full_message.into(),
            pgp_signature: None,
        };
        let id = self
            .repo
            .write_object(&tag)
            .map_err(|e| Error::Git(format!("write tag: {e}")))?;
        let tag_oid = from_gix_oid(id.detach());
        self.write_ref(&format!("refs/tags/{name}"), tag_oid)?;
        Ok(tag_oid)
    }

    fn contains(&self, oid: Oid) -> Result<bool> {
        Ok(self.repo.find_object(to_gix_oid(oid)).is_ok())
    }

    fn read_ref(&self, name: &str) -> Result<Option<Oid>> {
        match self.repo.find_reference(name) {
            Ok(mut reference) => {
                let id = reference
                    .peel_to_id_in_place()
                    .map_err(|e| Error::Git(format!("peel {name}: {e}")))?;
                Ok(Some(from_gix_oid(id.detach())))
            }
            Err(_) => Ok(None),
        }
    }

    fn write_ref(&self, name: &str, oid: Oid) -> Result<()> {
        self.repo
            .reference(
                name,
                to_gix_oid(oid),
                gix::refs::transaction::PreviousValue::Any,
                "git-remote-ipfs: fetch",
            )
            .map_err(|e| Error::Git(format!("write ref {name}: {e}")))?;
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Oid)>> {
        let platform = self
            .repo
            .references()
            .map_err(|e| Error::Git(format!("list refs: {e}")))?;
        let mut out = Vec::new();
        let iter = platform
            .prefixed(prefix)
            .map_err(|e| Error::Git(format!("list refs under {prefix}: {e}")))?;
        for reference in iter {
            let mut reference = reference.map_err(|e| Error::Git(format!("iterate refs: {e}")))?;
            let name = reference.name().as_bstr().to_str_lossy().into_owned();
            let id = reference
                .peel_to_id_in_place()
                .map_err(|e| Error::Git(format!("peel {name}: {e}")))?;
            out.push((name, from_gix_oid(id.detach())));
        }
        Ok(out)
    }

    fn read_head(&self) -> Result<Option<String>> {
        let head = self
            .repo
            .head()
            .map_err(|e| Error::Git(format!("read HEAD: {e}")))?;
        Ok(head
            .referent_name()
            .map(|name| name.as_bstr().to_str_lossy().into_owned()))
    }

    fn write_head(&self, ref_name: &str) -> Result<()> {
        self.repo
            .edit_reference(gix::refs::transaction::RefEdit {
                change: gix::refs::transaction::Change::Update {
                    log: Default::default(),
                    expected: gix::refs::transaction::PreviousValue::Any,
                    new: gix::refs::Target::Symbolic(ref_name.try_into().map_err(|_| {
                        Error::InvalidRef(ref_name.to_owned())
                    })?),
                },
                name: "HEAD".try_into().expect("HEAD is a valid ref name"),
                deref: false,
            })
            .map_err(|e| Error::Git(format!("write HEAD: {e}")))?;
        Ok(())
    }
}

/// split a tag message at the first line equal to the PGP signature banner
///: everything before is `message`, the banner and everything after
/// is `signature`.
fn split_pgp_block(message: &str) -> (String, Option<String>) {
    const BANNER: &str = "-----BEGIN PGP SIGNATURE-----";
    if let Some(idx) = message.find(BANNER) {
        (message[..idx].to_owned(), Some(message[idx..].to_owned()))
    } else {
        (message.to_owned(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_pgp_block_without_signature() {
        let (msg, sig) = split_pgp_block("hello world\n");
        assert_eq!(msg, "hello world\n");
        assert!(sig.is_none());
    }

    #[test]
    fn split_pgp_block_with_signature() {
        let full = "release notes\n-----BEGIN PGP SIGNATURE-----\nabc\n-----END PGP SIGNATURE-----\n";
        let (msg, sig) = split_pgp_block(full);
        assert_eq!(msg, "release notes\n");
        assert_eq!(sig.unwrap(), "-----BEGIN PGP SIGNATURE-----\nabc\n-----END PGP SIGNATURE-----\n");
    }
}
