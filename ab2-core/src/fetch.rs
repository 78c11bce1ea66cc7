//! Source fetcher: turns a `(protocol, path, filetype)` triple into a local file
//! that can be uploaded.
//!
//! - `local` files are used in place.
//! - `ipfs` content is requested from the configured gateway (`?arg=<cid>`).
//! - `http` URLs are fetched with a plain GET, optionally through an HTTPS proxy.
//!
//! Network content is streamed into a temp file which is only handed out once the
//! whole body has been written. The temp file is removed when the returned
//! [`FetchedFile`] is dropped.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use reqwest::{Client, Proxy, RequestBuilder, StatusCode, Url};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("protocol `{0}` is not implemented")]
    NotImplemented(String),
    #[error("ipfs-gateway is not configured")]
    MissingGateway,
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid proxy `{proxy}`: {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("error fetching {url} with status code {status}")]
    Status { url: String, status: StatusCode },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a regular file", .0.display())]
    NotAFile(PathBuf),
    #[error("cannot derive an object key from `{0}`")]
    NoFileName(String),
}

/// Where the bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Local,
    /// Content-addressed network, resolved through an IPFS gateway.
    Ipfs,
    Http,
}

impl FromStr for Protocol {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Protocol::Local),
            "ipfs" | "content-addressed-network" => Ok(Protocol::Ipfs),
            "http" => Ok(Protocol::Http),
            other => Err(FetchError::NotImplemented(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Local => "local",
            Protocol::Ipfs => "ipfs",
            Protocol::Http => "http",
        };
        f.write_str(name)
    }
}

/// One file to fetch, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub protocol: Protocol,
    /// Local path, IPFS content identifier or URL, depending on `protocol`.
    pub path: String,
    /// Extension appended to network-sourced keys (`csv`, `png`, ...).
    pub filetype: String,
}

impl FetchTarget {
    /// Parses the protocol tag; unknown tags fail before anything touches disk or network.
    pub fn new(protocol: &str, path: &str, filetype: &str) -> Result<Self, FetchError> {
        let protocol = protocol.parse()?;
        Ok(Self {
            protocol,
            path: path.to_string(),
            filetype: filetype.to_string(),
        })
    }
}

/// Transport settings for a [`Fetcher`].
#[derive(Debug, Clone, Default)]
pub struct FetchSettings {
    pub ipfs_gateway: Option<String>,
    /// Proxy for `https://` URLs fetched with the `http` protocol.
    pub https_proxy: Option<String>,
    /// Directory for staged downloads; the system temp dir when unset.
    pub staging_dir: Option<PathBuf>,
}

impl From<&Config> for FetchSettings {
    fn from(config: &Config) -> Self {
        Self {
            ipfs_gateway: config.ipfs_gateway.clone(),
            https_proxy: config.effective_proxy().map(str::to_string),
            staging_dir: None,
        }
    }
}

/// A local file ready for upload.
#[derive(Debug)]
pub struct FetchedFile {
    key: String,
    path: PathBuf,
    staged: Option<NamedTempFile>,
}

impl FetchedFile {
    /// Object key the file should be stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file is a temp copy of network content.
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }
}

pub struct Fetcher {
    settings: FetchSettings,
}

impl Fetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub async fn fetch(&self, target: &FetchTarget) -> Result<FetchedFile, FetchError> {
        info!(protocol = %target.protocol, path = %target.path, filetype = %target.filetype, "Fetching source");
        match target.protocol {
            Protocol::Local => fetch_local(&target.path),
            Protocol::Ipfs => self.fetch_ipfs(target).await,
            Protocol::Http => self.fetch_http(target).await,
        }
    }

    async fn fetch_ipfs(&self, target: &FetchTarget) -> Result<FetchedFile, FetchError> {
        let gateway = self
            .settings
            .ipfs_gateway
            .as_deref()
            .ok_or(FetchError::MissingGateway)?;
        let mut url = parse_url(gateway)?;
        url.query_pairs_mut().append_pair("arg", &target.path);

        let key = format!("{}.{}", target.path, target.filetype);
        debug!(method = "POST", url = %url, "IPFS gateway request");
        let request = Client::new().post(url.clone());
        let staged = self.download_to_staging(request, &url, &key).await?;

        Ok(FetchedFile {
            key,
            path: staged.path().to_path_buf(),
            staged: Some(staged),
        })
    }

    async fn fetch_http(&self, target: &FetchTarget) -> Result<FetchedFile, FetchError> {
        let url = parse_url(&target.path)?;
        let key = http_object_key(&url, &target.filetype);

        let mut builder = Client::builder();
        // Scoped to this client only; the process environment is left alone.
        if let Some(proxy) = self
            .settings
            .https_proxy
            .as_deref()
            .filter(|p| p.starts_with("http"))
        {
            debug!(proxy = %proxy, "Routing https requests through proxy");
            let proxy_conf = Proxy::https(proxy).map_err(|source| FetchError::Proxy {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy_conf);
        }
        let client = builder.build().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        debug!(method = "GET", url = %url, "HTTP source request");
        let request = client.get(url.clone());
        let staged = self.download_to_staging(request, &url, &key).await?;

        Ok(FetchedFile {
            key,
            path: staged.path().to_path_buf(),
            staged: Some(staged),
        })
    }

    async fn download_to_staging(
        &self,
        request: RequestBuilder,
        url: &Url,
        file_name: &str,
    ) -> Result<NamedTempFile, FetchError> {
        let mut response = request.send().await.map_err(|source| {
            error!(error = ?source, url = %url, "Request failed");
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        debug!(status = %status, headers = ?response.headers(), "Response received");
        if !status.is_success() {
            error!(status = %status, url = %url, "Source returned non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        // CIDs with sub-paths contain '/', which is not valid inside a file name.
        let prefix = file_name.replace('/', "_");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let created = match &self.settings.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut staged = created.map_err(|source| FetchError::Io {
            path: self
                .settings
                .staging_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?
        {
            staged.write_all(&chunk).map_err(|source| FetchError::Io {
                path: staged.path().to_path_buf(),
                source,
            })?;
            written += chunk.len() as u64;
        }
        staged.flush().map_err(|source| FetchError::Io {
            path: staged.path().to_path_buf(),
            source,
        })?;

        info!(
            url = %url,
            bytes = written,
            staged_path = %staged.path().display(),
            "Downloaded source to staging file"
        );
        Ok(staged)
    }
}

fn fetch_local(path: &str) -> Result<FetchedFile, FetchError> {
    let local = PathBuf::from(path);
    let metadata = std::fs::metadata(&local).map_err(|source| FetchError::Io {
        path: local.clone(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(FetchError::NotAFile(local));
    }
    let key = local
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FetchError::NoFileName(path.to_string()))?;

    info!(path = %local.display(), key = %key, bytes = metadata.len(), "Using local file in place");
    Ok(FetchedFile {
        key,
        path: local,
        staged: None,
    })
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Key for an HTTP download: last URL path segment plus the declared extension.
///
/// `https://x/y/report.csv` with filetype `csv` yields `report.csv.csv`. Percent
/// escapes in the segment are decoded, so `my%20report.csv` becomes `my report.csv.csv`.
pub fn http_object_key(url: &Url, filetype: &str) -> String {
    let base = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    if base.ends_with(&format!(".{filetype}")) {
        warn!(
            base = %base,
            filetype, "URL already ends with the declared extension; key gets a double extension"
        );
    }
    format!("{base}.{filetype}")
}
