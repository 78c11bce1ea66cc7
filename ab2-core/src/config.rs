use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Settings read from the user's `config.yaml`.
///
/// Keys use the kebab-case names found in the file (`m2c-url`, `ingest-bucket`, ...).
/// Only `ingest-bucket` is required up front; the others are checked by the
/// operation that needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Processing trigger endpoint (API Gateway URL).
    #[serde(default)]
    pub m2c_url: Option<String>,
    pub ingest_bucket: String,
    /// Base URL of the IPFS gateway, e.g. `http://127.0.0.1:5001/api/v0/cat`.
    #[serde(default)]
    pub ipfs_gateway: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            ingest_bucket = %self.ingest_bucket,
            m2c_url = self.m2c_url.as_deref().unwrap_or("<unset>"),
            ipfs_gateway = self.ipfs_gateway.as_deref().unwrap_or("<unset>"),
            proxy_set = self.https_proxy.is_some(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }

    /// The proxy is only honoured when it looks like an HTTP(S) URL.
    pub fn effective_proxy(&self) -> Option<&str> {
        self.https_proxy
            .as_deref()
            .filter(|proxy| proxy.starts_with("http"))
    }
}
