//! `reqwest`-backed [`IpfsClient`](super::IpfsClient) talking to Kubo's HTTP
//! RPC API (`POST /api/v0/...`). Grounded on
//! `bobisme-maw/crates/maw-lfs`'s `reqwest` dependency for an analogous
//! batch-HTTP content-store client.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{IpfsClient, LsEntry};
use crate::cid::Cid;
use crate::error::{Error, Result};

pub struct KuboClient {
    client: reqwest::Client,
    base_url: String,
}

impl KuboClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IpfsUnavailable(format!(
                "{} returned {}",
                path,
                resp.status()
            )));
        }
        Ok(resp)
    }

    async fn post_json<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<R> {
        let resp = self.post(path, query).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        // Kubo streams NDJSON; for the single-object responses this client
        // reads, the first line carries the whole answer.
        let first_line = bytes
            .split(|&b| b == b'\n')
            .find(|line| !line.is_empty())
            .unwrap_or(&bytes[..]);
        serde_json::from_slice(first_line)
            .map_err(|e| Error::IpfsUnavailable(format!("malformed response from {path}: {e}")))
    }
}

#[derive(Deserialize)]
struct HashResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Deserialize)]
struct DagPutResponse {
    #[serde(rename = "Cid")]
    cid: CidField,
}

#[derive(Deserialize)]
struct CidField {
    #[serde(rename = "/")]
    slash: String,
}

#[derive(Deserialize)]
struct LsResponse {
    #[serde(rename = "Objects")]
    objects: Vec<LsObject>,
}

#[derive(Deserialize)]
struct LsObject {
    #[serde(rename = "Links")]
    links: Vec<LsLink>,
}

#[derive(Deserialize)]
struct LsLink {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Type")]
    kind: i64,
}

/// UnixFS link type for a directory, per Kubo's `ls` RPC.
const UNIXFS_TYPE_DIRECTORY: i64 = 1;

#[async_trait]
impl IpfsClient for KuboClient {
    async fn dag_get<T: DeserializeOwned>(&self, cid: &Cid) -> Result<T> {
        let resp = self
            .post(
                "/api/v0/dag/get",
                &[("arg", cid.as_str()), ("output-codec", "dag-cbor")],
            )
            .await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        ciborium::de::from_reader(bytes.as_ref()).map_err(Error::CborDecode)
    }

    async fn dag_put<T: Serialize + Sync>(&self, value: &T) -> Result<Cid> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(value, &mut bytes).map_err(Error::CborEncode)?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("node.cbor")
            .mime_str("application/octet-stream")
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(self.url("/api/v0/dag/put"))
            .query(&[
                ("store-codec", "dag-cbor"),
                ("input-codec", "dag-cbor"),
                ("pin", "true"),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IpfsUnavailable(format!(
                "dag/put returned {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        let first_line = bytes
            .split(|&b| b == b'\n')
            .find(|line| !line.is_empty())
            .unwrap_or(&bytes[..]);
        let parsed: DagPutResponse = serde_json::from_slice(first_line)
            .map_err(|e| Error::IpfsUnavailable(format!("malformed dag/put response: {e}")))?;
        Ok(Cid::new(parsed.cid.slash))
    }

    async fn ls(&self, cid: &Cid) -> Result<Vec<LsEntry>> {
        let parsed: LsResponse = self
            .post_json("/api/v0/ls", &[("arg", cid.as_str())])
            .await?;
        let entries = parsed
            .objects
            .into_iter()
            .flat_map(|o| o.links)
            .map(|link| LsEntry {
                name: link.name,
                cid: Cid::new(link.hash),
                is_dir: link.kind == UNIXFS_TYPE_DIRECTORY,
            })
            .collect();
        Ok(entries)
    }

    async fn cat(&self, cid: &Cid) -> Result<Vec<u8>> {
        let resp = self.post("/api/v0/cat", &[("arg", cid.as_str())]).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn add(&self, data: &[u8]) -> Result<Cid> {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name("blob")
            .mime_str("application/octet-stream")
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(self.url("/api/v0/add"))
            .query(&[("pin", "true")])
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::IpfsUnavailable(format!(
                "add returned {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::IpfsUnavailable(e.to_string()))?;
        let parsed: HashResponse = serde_json::from_slice(&bytes)
            .map_err(|e| Error::IpfsUnavailable(format!("malformed add response: {e}")))?;
        Ok(Cid::new(parsed.hash))
    }

    async fn patch_add_link(&self, base: &Cid, name: &str, target: &Cid) -> Result<Cid> {
        let parsed: HashResponse = self
            .post_json(
                "/api/v0/object/patch/add-link",
                &[
                    ("arg", base.as_str()),
                    ("arg", name),
                    ("arg", target.as_str()),
                    ("create", "true"),
                ],
            )
            .await?;
        Ok(Cid::new(parsed.hash))
    }

    async fn pin_add(&self, cid: &Cid) -> Result<()> {
        self.post("/api/v0/pin/add", &[("arg", cid.as_str())])
            .await?;
        Ok(())
    }
}
