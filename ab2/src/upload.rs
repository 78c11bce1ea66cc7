#![doc = "S3 implementation of the core `ObjectStore` trait."]
//
//! Bridges [`ab2_core::contract::ObjectStore`] to `aws-sdk-s3`. Credentials and
//! region come from the default AWS provider chain (profile, env vars, SSO, IMDS).

use std::path::Path;

use ab2_core::contract::{ContractError, ObjectStore, PutObject, PutReceipt};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        tracing::info!(
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("<unset>"),
            "Initialised S3 client from AWS config"
        );
        Self::new(Client::new(sdk_config))
    }

    async fn body_from_path(path: &Path) -> Result<ByteStream, ContractError> {
        ByteStream::from_path(path).await.map_err(|e| {
            tracing::error!(error = ?e, path = %path.display(), "Failed to open file as byte stream");
            Box::new(e) as ContractError
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object<'a>(&self, req: PutObject<'a>) -> Result<PutReceipt, ContractError> {
        tracing::info!(bucket = req.bucket, key = req.key, "Putting object to S3");
        let body = Self::body_from_path(req.path).await?;

        let result = self
            .client
            .put_object()
            .bucket(req.bucket)
            .key(req.key)
            .body(body)
            .send()
            .await;

        match result {
            Ok(output) => {
                tracing::info!(
                    bucket = req.bucket,
                    key = req.key,
                    e_tag = output.e_tag().unwrap_or(""),
                    "Successfully put object"
                );
                Ok(PutReceipt {
                    bucket: req.bucket.to_string(),
                    key: req.key.to_string(),
                    e_tag: output.e_tag().map(str::to_string),
                    version_id: output.version_id().map(str::to_string),
                })
            }
            Err(e) => {
                tracing::error!(error = ?e, bucket = req.bucket, key = req.key, "S3 PutObject failed");
                Err(format!("S3 PutObject error: {}", aws_sdk_s3::error::DisplayErrorContext(&e)).into())
            }
        }
    }
}
