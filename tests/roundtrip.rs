//! End-to-end push/fetch scenarios against in-memory doubles: no real Git
//! repository or IPFS daemon is needed to exercise the translation engine's
//! own logic.

mod common;

use gitipfs::cache::Cache;
use gitipfs::gitio::{CommitData, EntryMode, GitOdb, TagData, TreeEntry};
use gitipfs::push::{do_push, PushRequest};
use gitipfs::fetch::{do_fetch, FetchRequest};
use gitipfs::refpack::VfsRoot;

use common::{blob_entry, sig, FakeIpfs, FakeOdb, MemStore};

fn commit(
    odb: &FakeOdb,
    tree: gitipfs::oid::Oid,
    parents: Vec<gitipfs::oid::Oid>,
    message: &str,
) -> gitipfs::oid::Oid {
    odb.write_commit(&CommitData {
        tree,
        parents,
        author: sig("alice", 1000),
        committer: sig("alice", 1000),
        encoding: None,
        message: message.to_owned(),
        gpgsig: None,
    })
    .unwrap()
}

#[tokio::test]
async fn scenario_signed_commit_gpgsig_round_trips() {
    let odb = FakeOdb::new();
    let blob = odb.write_blob(b"hi\n").unwrap();
    let tree = odb
        .write_tree(&[blob_entry("README", EntryMode::Blob, blob)])
        .unwrap();
    let signature = "-----BEGIN PGP SIGNATURE-----\nsignedcommit\n-----END PGP SIGNATURE-----\n";
    let head = odb
        .write_commit(&CommitData {
            tree,
            parents: vec![],
            author: sig("alice", 1000),
            committer: sig("alice", 1000),
            encoding: None,
            message: "signed\n".into(),
            gpgsig: Some(signature.to_owned()),
        })
        .unwrap();
    odb.write_ref("refs/heads/master", head).unwrap();

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());
    let mut ok = Vec::new();
    let (_, vfs) = do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[PushRequest {
            src: "refs/heads/master".into(),
            dst: "refs/heads/master".into(),
        }],
        &mut ok,
    )
    .await
    .unwrap();

    let fresh = FakeOdb::new();
    do_fetch(
        &fresh,
        &ipfs,
        &cache,
        &vfs,
        &[FetchRequest {
            oid: head.to_string(),
            ref_name: "refs/heads/master".into(),
        }],
    )
    .await
    .unwrap();

    let fetched = fresh.read_ref("refs/heads/master").unwrap().unwrap();
    assert_eq!(fetched, head, "P2: gpgsig must not change the verified OID");
    let data = fresh.read_commit(fetched).unwrap();
    assert_eq!(data.gpgsig.as_deref(), Some(signature));
}

#[tokio::test]
async fn scenario_1_single_commit_single_file() {
    let odb = FakeOdb::new();
    let blob = odb.write_blob(b"hi\n").unwrap();
    let tree = odb
        .write_tree(&[blob_entry("README", EntryMode::Blob, blob)])
        .unwrap();
    let head = commit(&odb, tree, vec![], "init\n");
    odb.write_ref("refs/heads/master", head).unwrap();

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());

    let mut ok = Vec::new();
    let (_, vfs) = do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[PushRequest {
            src: "refs/heads/master".into(),
            dst: "refs/heads/master".into(),
        }],
        &mut ok,
    )
    .await
    .unwrap();
    assert_eq!(String::from_utf8(ok).unwrap(), "ok refs/heads/master\n");
    assert_eq!(vfs.head.as_deref(), Some("refs/heads/master"));

    let fresh = FakeOdb::new();
    do_fetch(
        &fresh,
        &ipfs,
        &cache,
        &vfs,
        &[FetchRequest {
            oid: head.to_string(),
            ref_name: "refs/heads/master".into(),
        }],
    )
    .await
    .unwrap();

    let fetched = fresh.read_ref("refs/heads/master").unwrap().unwrap();
    assert_eq!(fetched, head, "P1: fetched OID must equal the pushed OID");
    assert_eq!(fresh.read_head().unwrap().as_deref(), Some("refs/heads/master"));

    let fetched_commit = fresh.read_commit(fetched).unwrap();
    let fetched_tree = fresh.read_tree(fetched_commit.tree).unwrap();
    assert_eq!(fetched_tree.len(), 1);
    assert_eq!(fresh.read_blob(fetched_tree[0].oid).unwrap(), b"hi\n");
}

#[tokio::test]
async fn scenario_2_executable_and_symlink_modes_preserved() {
    let odb = FakeOdb::new();
    let run_blob = odb.write_blob(b"#!/bin/sh\n").unwrap();
    let link_blob = odb.write_blob(b"bin/run").unwrap();
    let bin_tree = odb
        .write_tree(&[blob_entry("run", EntryMode::BlobExecutable, run_blob)])
        .unwrap();
    let root_tree = odb
        .write_tree(&[
            blob_entry("bin", EntryMode::Tree, bin_tree),
            blob_entry("link", EntryMode::Link, link_blob),
        ])
        .unwrap();
    let head = commit(&odb, root_tree, vec![], "modes\n");
    odb.write_ref("refs/heads/master", head).unwrap();

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());
    let mut ok = Vec::new();
    let (_, vfs) = do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[PushRequest {
            src: "refs/heads/master".into(),
            dst: "refs/heads/master".into(),
        }],
        &mut ok,
    )
    .await
    .unwrap();

    let fresh = FakeOdb::new();
    do_fetch(
        &fresh,
        &ipfs,
        &cache,
        &vfs,
        &[FetchRequest {
            oid: head.to_string(),
            ref_name: "refs/heads/master".into(),
        }],
    )
    .await
    .unwrap();

    let fetched = fresh.read_ref("refs/heads/master").unwrap().unwrap();
    assert_eq!(fetched, head);
    let top = fresh.read_tree(fresh.read_commit(fetched).unwrap().tree).unwrap();
    let link_entry = top.iter().find(|e| e.name == "link").unwrap();
    assert_eq!(link_entry.mode, EntryMode::Link);
    let bin_entry = top.iter().find(|e| e.name == "bin").unwrap();
    assert_eq!(bin_entry.mode, EntryMode::Tree);
    let bin = fresh.read_tree(bin_entry.oid).unwrap();
    assert_eq!(bin[0].mode, EntryMode::BlobExecutable);
}

#[tokio::test]
async fn scenario_3_merge_commit_shares_ancestor() {
    let odb = FakeOdb::new();
    let ancestor_blob = odb.write_blob(b"base\n").unwrap();
    let ancestor_tree = odb
        .write_tree(&[blob_entry("f", EntryMode::Blob, ancestor_blob)])
        .unwrap();
    let ancestor = commit(&odb, ancestor_tree, vec![], "base\n");

    let p1_blob = odb.write_blob(b"p1\n").unwrap();
    let p1_tree = odb
        .write_tree(&[blob_entry("f", EntryMode::Blob, p1_blob)])
        .unwrap();
    let p1 = commit(&odb, p1_tree, vec![ancestor], "p1\n");

    let p2_blob = odb.write_blob(b"p2\n").unwrap();
    let p2_tree = odb
        .write_tree(&[blob_entry("f", EntryMode::Blob, p2_blob)])
        .unwrap();
    let p2 = commit(&odb, p2_tree, vec![ancestor], "p2\n");

    let merge_blob = odb.write_blob(b"merged\n").unwrap();
    let merge_tree = odb
        .write_tree(&[blob_entry("f", EntryMode::Blob, merge_blob)])
        .unwrap();
    let merge = commit(&odb, merge_tree, vec![p1, p2], "merge\n");
    odb.write_ref("refs/heads/master", merge).unwrap();

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());
    let mut ok = Vec::new();
    let (_, vfs) = do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[PushRequest {
            src: "refs/heads/master".into(),
            dst: "refs/heads/master".into(),
        }],
        &mut ok,
    )
    .await
    .unwrap();

    let fresh = FakeOdb::new();
    do_fetch(
        &fresh,
        &ipfs,
        &cache,
        &vfs,
        &[FetchRequest {
            oid: merge.to_string(),
            ref_name: "refs/heads/master".into(),
        }],
    )
    .await
    .unwrap();

    let fetched_merge = fresh.read_ref("refs/heads/master").unwrap().unwrap();
    assert_eq!(fetched_merge, merge);
    let data = fresh.read_commit(fetched_merge).unwrap();
    assert_eq!(data.parents, vec![p1, p2], "P8: parent order preserved");
    assert!(fresh.contains(ancestor).unwrap());
}

#[tokio::test]
async fn scenario_4_annotated_signed_tag() {
    let odb = FakeOdb::new();
    let blob = odb.write_blob(b"hi\n").unwrap();
    let tree = odb
        .write_tree(&[blob_entry("README", EntryMode::Blob, blob)])
        .unwrap();
    let target = commit(&odb, tree, vec![], "release\n");
    odb.write_ref("refs/heads/master", target).unwrap();

    let signature = "-----BEGIN PGP SIGNATURE-----\nfakefake\n-----END PGP SIGNATURE-----\n";
    let tag = odb
        .write_annotated_tag(
            "v1",
            &TagData::Annotated {
                target,
                tagger: sig("alice", 2000),
                message: "v1\n".into(),
                signature: Some(signature.to_owned()),
            },
        )
        .unwrap();
    assert_eq!(odb.read_ref("refs/tags/v1").unwrap(), Some(tag));

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());
    let mut ok = Vec::new();
    let (_, vfs) = do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[
            PushRequest {
                src: "refs/heads/master".into(),
                dst: "refs/heads/master".into(),
            },
            PushRequest {
                src: "refs/tags/v1".into(),
                dst: "refs/tags/v1".into(),
            },
        ],
        &mut ok,
    )
    .await
    .unwrap();

    let fresh = FakeOdb::new();
    do_fetch(
        &fresh,
        &ipfs,
        &cache,
        &vfs,
        &[FetchRequest {
            oid: tag.to_string(),
            ref_name: "refs/tags/v1".into(),
        }],
    )
    .await
    .unwrap();

    let fetched_tag_target = fresh.read_ref("refs/tags/v1").unwrap().unwrap();
    let (_, data) = fresh.read_tag(fetched_tag_target).unwrap().unwrap();
    match data {
        TagData::Annotated {
            target: fetched_target,
            signature: fetched_sig,
            ..
        } => {
            assert_eq!(fetched_target, target);
            assert_eq!(fetched_sig.as_deref(), Some(signature));
        }
        TagData::Lightweight { .. } => panic!("expected an annotated tag"),
    }
}

#[tokio::test]
async fn scenario_5_continuation_push_preserves_uuid_and_master() {
    let odb = FakeOdb::new();
    let blob = odb.write_blob(b"hi\n").unwrap();
    let tree = odb
        .write_tree(&[blob_entry("README", EntryMode::Blob, blob)])
        .unwrap();
    let head = commit(&odb, tree, vec![], "init\n");
    odb.write_ref("refs/heads/master", head).unwrap();

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());
    let mut ok = Vec::new();
    let (_root1, vfs1) = do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[PushRequest {
            src: "refs/heads/master".into(),
            dst: "refs/heads/master".into(),
        }],
        &mut ok,
    )
    .await
    .unwrap();
    let uuid1 = vfs1.uuid.clone().unwrap();
    let master_cid1 = vfs1.refs.heads.get("master").cloned().unwrap();

    let dev_blob = odb.write_blob(b"dev\n").unwrap();
    let dev_tree = odb
        .write_tree(&[blob_entry("DEV", EntryMode::Blob, dev_blob)])
        .unwrap();
    let dev_head = commit(&odb, dev_tree, vec![], "dev\n");
    odb.write_ref("refs/heads/dev", dev_head).unwrap();

    let mut ok2 = Vec::new();
    let (_root2, vfs2) = do_push(
        &odb,
        &ipfs,
        &cache,
        vfs1,
        &[PushRequest {
            src: "refs/heads/dev".into(),
            dst: "refs/heads/dev".into(),
        }],
        &mut ok2,
    )
    .await
    .unwrap();

    assert_eq!(vfs2.uuid.as_deref(), Some(uuid1.as_str()), "P7: uuid stable across continuation");
    assert_eq!(vfs2.refs.heads.get("master").cloned(), Some(master_cid1));
    assert!(vfs2.refs.heads.contains_key("dev"));
}

#[tokio::test]
async fn scenario_6_hash_cache_dump_after_push() {
    let odb = FakeOdb::new();
    let blob = odb.write_blob(b"hi\n").unwrap();
    let tree = odb
        .write_tree(&[blob_entry("README", EntryMode::Blob, blob)])
        .unwrap();
    let head = commit(&odb, tree, vec![], "init\n");
    odb.write_ref("refs/heads/master", head).unwrap();

    let ipfs = FakeIpfs::new();
    let cache = Cache::new(MemStore::default());
    let mut ok = Vec::new();
    do_push(
        &odb,
        &ipfs,
        &cache,
        VfsRoot::default(),
        &[PushRequest {
            src: "refs/heads/master".into(),
            dst: "refs/heads/master".into(),
        }],
        &mut ok,
    )
    .await
    .unwrap();

    let dump = cache.dump().unwrap();
    let has_commit_entry = dump
        .iter()
        .any(|(k, _)| k.starts_with(b"o:") && k.ends_with(head.to_string().as_bytes()));
    let has_modes_entry = dump
        .iter()
        .any(|(k, _)| k.starts_with(b"m:") && k.ends_with(tree.to_string().as_bytes()));
    assert!(has_commit_entry, "expected o:<HEAD oid> entry in the cache dump");
    assert!(has_modes_entry, "expected m:<top tree oid> entry in the cache dump");
}
