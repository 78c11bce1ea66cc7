//! Processing trigger: tells the downstream pipeline that `bucket/key` is ready.
//!
//! The request is a JSON `POST` of `{"bucket": ..., "key": ...}` signed with
//! SigV4 for the `execute-api` service. The SHA-256 of the exact body bytes is
//! used as the signed payload hash.

use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::contract::{ContractError, SigningIdentity, SigningIdentityProvider};

/// Service name the trigger endpoint is signed for (API Gateway).
pub const SERVICE_NAME: &str = "execute-api";

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("m2c-url is not configured")]
    MissingEndpoint,
    #[error("failed to encode trigger payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to resolve signing identity: {0}")]
    Identity(#[source] ContractError),
    #[error("failed to sign trigger request: {0}")]
    Signing(String),
    #[error("failed to call remote service {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("processing endpoint answered {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// JSON body of the trigger. Field order is fixed, so the bytes are deterministic.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TriggerPayload<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
}

impl<'a> TriggerPayload<'a> {
    pub fn new(bucket: &'a str, key: &'a str) -> Self {
        Self { bucket, key }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, TriggerError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Lowercase hex SHA-256 of `body`.
pub fn payload_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Compute the SigV4 headers for `POST url` with a JSON body whose hash is `payload_digest`.
///
/// Returns the headers to add to the outgoing request (`authorization`,
/// `x-amz-date` and, for temporary credentials, `x-amz-security-token`).
pub fn sign_trigger(
    identity: &SigningIdentity,
    url: &str,
    payload_digest: &str,
    time: SystemTime,
) -> Result<Vec<(String, String)>, TriggerError> {
    let credentials = Credentials::new(
        identity.access_key_id.clone(),
        identity.secret_access_key.clone(),
        identity.session_token.clone(),
        None,
        "ab2",
    );
    let aws_identity: Identity = credentials.into();

    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&aws_identity)
        .region(&identity.region)
        .name(SERVICE_NAME)
        .time(time)
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| TriggerError::Signing(e.to_string()))?
        .into();

    let headers = [("content-type", JSON_CONTENT_TYPE)];
    let signable = SignableRequest::new(
        "POST",
        url,
        headers.iter().copied(),
        SignableBody::Precomputed(payload_digest.to_string()),
    )
    .map_err(|e| TriggerError::Signing(e.to_string()))?;

    let (instructions, _signature) = sign(signable, &params)
        .map_err(|e| TriggerError::Signing(e.to_string()))?
        .into_parts();

    Ok(instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}

/// Result of an accepted trigger.
#[derive(Debug, Clone)]
pub struct TriggerResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Client for the processing endpoint.
#[derive(Debug)]
pub struct Trigger {
    endpoint: String,
    client: Client,
}

impl Trigger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TriggerError> {
        let endpoint = config
            .m2c_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(TriggerError::MissingEndpoint)?;
        Ok(Self::new(endpoint))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sign and send the trigger for `bucket/key`.
    ///
    /// Only `200 OK` counts as success; anything else is returned as
    /// [`TriggerError::Rejected`] with the status and response body.
    pub async fn send<P>(
        &self,
        identity_provider: &P,
        bucket: &str,
        key: &str,
    ) -> Result<TriggerResponse, TriggerError>
    where
        P: SigningIdentityProvider + ?Sized,
    {
        let payload = TriggerPayload::new(bucket, key);
        let body = payload.to_json()?;
        let digest = payload_digest(&body);
        info!(bucket, key, payload_sha256 = %digest, endpoint = %self.endpoint, "Triggering processing");

        let identity = identity_provider.signing_identity().await.map_err(|e| {
            error!(error = %e, "Failed to resolve signing identity");
            TriggerError::Identity(e)
        })?;
        debug!(region = %identity.region, access_key_id = %identity.access_key_id, "Resolved signing identity");

        let signed_headers = sign_trigger(&identity, &self.endpoint, &digest, SystemTime::now())?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        for (name, value) in &signed_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        debug!(
            headers = ?signed_headers.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            body = %String::from_utf8_lossy(&body),
            "Signed trigger request"
        );

        let response = request.body(body).send().await.map_err(|source| {
            error!(error = ?source, url = %self.endpoint, "Failed to call remote service");
            TriggerError::Transport {
                url: self.endpoint.clone(),
                source,
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| TriggerError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;

        if status != StatusCode::OK {
            error!(status = %status, body = %text, "Processing endpoint rejected trigger");
            return Err(TriggerError::Rejected { status, body: text });
        }

        info!(status = %status, bytes = text.len(), "Processing trigger accepted");
        Ok(TriggerResponse { status, body: text })
    }
}
