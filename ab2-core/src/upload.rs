//! Sink uploader: puts one local file into the ingest bucket through an [`ObjectStore`].

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::contract::{ContractError, ObjectStore, PutObject, PutReceipt};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot open {} for upload: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload of {bucket}/{key} failed: {source}")]
    Store {
        bucket: String,
        key: String,
        #[source]
        source: ContractError,
    },
}

/// Upload `local_path` as `bucket/key`, replacing any existing object.
///
/// The file is opened before the store is called so a missing or unreadable file
/// fails without any network traffic.
pub async fn upload_file<S>(
    store: &S,
    bucket: &str,
    local_path: &Path,
    key: &str,
) -> Result<PutReceipt, UploadError>
where
    S: ObjectStore + ?Sized,
{
    let file = tokio::fs::File::open(local_path).await.map_err(|source| {
        error!(error = ?source, path = %local_path.display(), "Failed to open file for upload");
        UploadError::Open {
            path: local_path.to_path_buf(),
            source,
        }
    })?;
    drop(file);

    info!(bucket, key, path = %local_path.display(), "Uploading file to bucket");
    let receipt = store
        .put_object(PutObject {
            bucket,
            key,
            path: local_path,
        })
        .await
        .map_err(|source| {
            error!(error = %source, bucket, key, "Object store rejected upload");
            UploadError::Store {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            }
        })?;

    info!(
        bucket = %receipt.bucket,
        key = %receipt.key,
        e_tag = receipt.e_tag.as_deref().unwrap_or(""),
        "Upload succeeded"
    );
    Ok(receipt)
}
