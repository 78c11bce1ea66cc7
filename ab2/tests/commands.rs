// The upload and process flows, with the AWS clients replaced by mocks.

use ab2::cli::{process_command, upload_command};
use ab2_core::config::Config;
use ab2_core::contract::{
    MockObjectStore, MockSigningIdentityProvider, PutObject, PutReceipt, SigningIdentity,
};
use ab2_core::fetch::FetchTarget;
use ab2_core::trigger::{Trigger, TriggerError};
use tempfile::tempdir;

fn config(m2c_url: Option<&str>) -> Config {
    Config {
        m2c_url: m2c_url.map(str::to_string),
        ingest_bucket: "b".to_string(),
        ipfs_gateway: None,
        https_proxy: None,
    }
}

#[tokio::test]
async fn upload_local_file_lands_under_base_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.csv");
    std::fs::write(&path, "id\n1\n").unwrap();

    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .times(1)
        .returning(|req: PutObject<'_>| {
            assert_eq!(req.bucket, "b");
            assert_eq!(req.key, "a.csv");
            assert_eq!(std::fs::read(req.path).unwrap(), b"id\n1\n".to_vec());
            Ok(PutReceipt {
                bucket: req.bucket.to_string(),
                key: req.key.to_string(),
                e_tag: Some("\"abc\"".to_string()),
                version_id: None,
            })
        });

    let target = FetchTarget::new("local", path.to_str().unwrap(), "csv").unwrap();
    let receipt = upload_command(&config(None), &store, &target)
        .await
        .expect("upload should succeed");
    assert_eq!(receipt.key, "a.csv");
    assert_eq!(receipt.e_tag.as_deref(), Some("\"abc\""));
}

#[tokio::test]
async fn failed_fetch_never_uploads() {
    let mut store = MockObjectStore::new();
    store.expect_put_object().times(0);

    let target = FetchTarget::new("ipfs", "QmReport", "csv").unwrap();
    let err = upload_command(&config(None), &store, &target)
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("ipfs-gateway is not configured"),
        "got: {err:#}"
    );
}

#[tokio::test]
async fn store_failure_surfaces_as_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.csv");
    std::fs::write(&path, "x").unwrap();

    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .times(1)
        .returning(|_req: PutObject<'_>| Err("NoSuchBucket".into()));

    let target = FetchTarget::new("local", path.to_str().unwrap(), "csv").unwrap();
    let err = upload_command(&config(None), &store, &target)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("NoSuchBucket"));
}

#[test]
fn trigger_without_endpoint_is_rejected_up_front() {
    let err = Trigger::from_config(&config(None)).unwrap_err();
    assert!(matches!(err, TriggerError::MissingEndpoint));
}

#[tokio::test]
async fn process_uses_the_given_trigger_endpoint() {
    // The config carries no m2c-url; only the prebuilt trigger knows the endpoint.
    let trigger = Trigger::new("http://127.0.0.1:9/prod/m2c");
    let mut identity = MockSigningIdentityProvider::new();
    identity.expect_signing_identity().times(1).returning(|| {
        Ok(SigningIdentity {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
            region: "us-east-1".into(),
        })
    });

    let err = process_command(&trigger, &config(None), &identity, "somekey")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TriggerError>(),
        Some(TriggerError::Transport { .. })
    ));
}

#[tokio::test]
async fn process_against_unreachable_endpoint_is_transport_error() {
    let mut identity = MockSigningIdentityProvider::new();
    identity.expect_signing_identity().times(1).returning(|| {
        Ok(SigningIdentity {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
            region: "us-east-1".into(),
        })
    });

    let config = config(Some("http://127.0.0.1:9/prod/m2c"));
    let trigger = Trigger::from_config(&config).unwrap();
    let err = process_command(&trigger, &config, &identity, "somekey")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TriggerError>(),
        Some(TriggerError::Transport { .. })
    ));
}
