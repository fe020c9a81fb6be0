//! `git-remote-ipfs`: the stdio driver Git invokes as
//! `git-remote-ipfs <remote> <url>`. Speaks the standard remote-helper
//! line protocol and wires the cache, resolvers, codecs, `GitOdb` and
//! `IpfsClient` together for one invocation, in the usual
//! `fn main() -> ExitCode` / `run` split with errors surfacing on stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use gitipfs::cache::sled_backend::SledCache;
use gitipfs::cache::Cache;
use gitipfs::config::Config;
use gitipfs::fetch::{do_fetch, FetchRequest};
use gitipfs::gitio::GixOdb;
use gitipfs::ipfs::KuboClient;
use gitipfs::protocol::{parse_remote_url, serialize_refs, RemoteLocator};
use gitipfs::push::{do_push, PushRequest};
use gitipfs::refpack::{self, VfsRoot};
use gitipfs::{Error, Result};

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: git-remote-ipfs <remote> <url>");
        return ExitCode::FAILURE;
    }
    let url = args[2].clone();
    let git_dir = git_dir();

    match run(&git_dir, &url) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("git-remote-ipfs: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let default_level = if is_truthy(std::env::var("DEBUG").ok().as_deref()) {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "0")
}

fn git_dir() -> PathBuf {
    std::env::var_os("GIT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run(git_dir: &Path, url: &str) -> Result<()> {
    let cache_dir = git_dir.join("remote-igis");

    if url == "hash-cache:clear" {
        let cache = Cache::new(SledCache::open(cache_dir.join("cache"))?);
        cache.clear()?;
        println!("cache cleared");
        return Ok(());
    }
    if url == "hash-cache:dump" {
        let cache = Cache::new(SledCache::open(cache_dir.join("cache"))?);
        for (key, value) in cache.dump()? {
            println!(
                "{} {}",
                String::from_utf8_lossy(&key),
                String::from_utf8_lossy(&value)
            );
        }
        return Ok(());
    }

    let locator = parse_remote_url(url)?;
    let config = Config::load_or_default(&cache_dir.join("config.toml"))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Io {
            path: PathBuf::from("<runtime>"),
            source: e,
        })?;
    runtime.block_on(run_protocol(git_dir, &cache_dir, &config, locator))
}

async fn run_protocol(
    git_dir: &Path,
    cache_dir: &Path,
    config: &Config,
    locator: RemoteLocator,
) -> Result<()> {
    let odb = GixOdb::open(git_dir)?;
    let ipfs = KuboClient::new(
        config.ipfs_api.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let cache = Cache::new(SledCache::open(cache_dir.join("cache"))?);

    let mut vfs = match &locator {
        RemoteLocator::Fresh { name } => VfsRoot {
            name: Some(name.clone()),
            ..VfsRoot::default()
        },
        RemoteLocator::Existing { root } => refpack::load_vfs(&ipfs, root).await?,
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.map_err(|e| Error::Io {
        path: PathBuf::from("<stdin>"),
        source: e,
    })? {
        let line = line.trim_end().to_owned();
        if line.is_empty() {
            continue;
        }

        if line == "capabilities" {
            stdout.write_all(b"push\nfetch\n\n").await.ok();
            stdout.flush().await.ok();
        } else if line == "list" || line == "list for-push" {
            let refs = serialize_refs(&ipfs, &vfs).await?;
            for entry in &refs {
                stdout.write_all(entry.as_bytes()).await.ok();
                stdout.write_all(b"\n").await.ok();
            }
            stdout.write_all(b"\n").await.ok();
            stdout.flush().await.ok();
        } else if let Some(rest) = line.strip_prefix("push ") {
            let mut reqs = vec![parse_push_line(rest)?];
            while let Some(next) = lines.next_line().await.map_err(|e| Error::Io {
                path: PathBuf::from("<stdin>"),
                source: e,
            })? {
                let next = next.trim_end();
                if next.is_empty() {
                    break;
                }
                let rest = next
                    .strip_prefix("push ")
                    .ok_or_else(|| Error::InvalidRef(next.to_owned()))?;
                reqs.push(parse_push_line(rest)?);
            }

            let mut ok_lines = Vec::new();
            let (_root, new_vfs) =
                do_push(&odb, &ipfs, &cache, vfs.clone(), &reqs, &mut ok_lines).await?;
            vfs = new_vfs;
            stdout.write_all(&ok_lines).await.ok();
            stdout.write_all(b"\n").await.ok();
            stdout.flush().await.ok();
        } else if let Some(rest) = line.strip_prefix("fetch ") {
            let mut reqs = vec![parse_fetch_line(rest)?];
            while let Some(next) = lines.next_line().await.map_err(|e| Error::Io {
                path: PathBuf::from("<stdin>"),
                source: e,
            })? {
                let next = next.trim_end();
                if next.is_empty() {
                    break;
                }
                let rest = next
                    .strip_prefix("fetch ")
                    .ok_or_else(|| Error::InvalidRef(next.to_owned()))?;
                reqs.push(parse_fetch_line(rest)?);
            }

            do_fetch(&odb, &ipfs, &cache, &vfs, &reqs).await?;
            stdout.write_all(b"\n").await.ok();
            stdout.flush().await.ok();
        } else {
            return Err(Error::InvalidRef(line));
        }
    }

    Ok(())
}

fn parse_push_line(rest: &str) -> Result<PushRequest> {
    let (src, dst) = rest
        .split_once(':')
        .ok_or_else(|| Error::InvalidRef(rest.to_owned()))?;
    Ok(PushRequest {
        src: src.to_owned(),
        dst: dst.to_owned(),
    })
}

fn parse_fetch_line(rest: &str) -> Result<FetchRequest> {
    let (oid, name) = rest
        .split_once(' ')
        .ok_or_else(|| Error::InvalidRef(rest.to_owned()))?;
    Ok(FetchRequest {
        oid: oid.to_owned(),
        ref_name: name.to_owned(),
    })
}
