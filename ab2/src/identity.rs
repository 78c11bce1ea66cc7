//! Ambient AWS identity used to sign the processing trigger.

use ab2_core::contract::{ContractError, SigningIdentity, SigningIdentityProvider};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_credential_types::provider::ProvideCredentials;

/// Resolves credentials and region from a loaded [`SdkConfig`].
pub struct AwsIdentity {
    sdk_config: SdkConfig,
}

impl AwsIdentity {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }
}

#[async_trait]
impl SigningIdentityProvider for AwsIdentity {
    async fn signing_identity(&self) -> Result<SigningIdentity, ContractError> {
        let region = self
            .sdk_config
            .region()
            .map(|r| r.to_string())
            .ok_or("no AWS region configured (set AWS_REGION or a profile region)")?;

        let provider = self
            .sdk_config
            .credentials_provider()
            .ok_or("no AWS credentials provider configured")?;

        let credentials = provider.provide_credentials().await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to retrieve AWS credentials");
            Box::new(e) as ContractError
        })?;

        tracing::info!(
            region = %region,
            access_key_id = credentials.access_key_id(),
            temporary = credentials.session_token().is_some(),
            "Retrieved AWS signing credentials"
        );

        Ok(SigningIdentity {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(str::to_string),
            region,
        })
    }
}
