#![allow(unused)]

//! # contract: seams between ab2's core logic and the outside world
//!
//! The core crate never talks to AWS SDK clients directly. Instead the CLI crate
//! provides implementations of the two traits below:
//!
//! - [`ObjectStore`]: writes one local file as one object in a bucket.
//! - [`SigningIdentityProvider`]: resolves the credentials and region used to
//!   SigV4-sign the processing trigger.
//!
//! Both traits are annotated for `mockall`, so tests can swap in deterministic
//! fakes (`MockObjectStore`, `MockSigningIdentityProvider`).

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Error type returned across the trait seams.
pub type ContractError = Box<dyn std::error::Error + Send + Sync>;

/// A single object write: the whole content of `path` ends up at `bucket/key`.
pub struct PutObject<'a> {
    pub bucket: &'a str,
    /// Destination key; an existing object at this key is replaced.
    pub key: &'a str,
    /// Local file providing the object body.
    pub path: &'a Path,
}

/// What the store reports back after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    pub bucket: String,
    pub key: String,
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
}

/// Destination for uploaded files.
///
/// Implementations must overwrite unconditionally: writing the same key twice
/// leaves only the second content in the bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `req.path` as `req.bucket/req.key`.
    async fn put_object<'a>(&self, req: PutObject<'a>) -> Result<PutReceipt, ContractError>;
}

/// Credentials and region used to sign a request.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("region", &self.region)
            .finish()
    }
}

/// Source of the ambient signing identity (AWS profile, env vars, IMDS, ...).
///
/// Resolved once per trigger; the result is never cached by the caller.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SigningIdentityProvider: Send + Sync {
    async fn signing_identity(&self) -> Result<SigningIdentity, ContractError>;
}
