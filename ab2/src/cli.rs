///
/// This module implements the CLI interface for ab2: command parsing, config
/// lookup and the two user-facing flows.
///
/// - `upload` (alias `u`): fetch a file from `local`, `ipfs` or `http`, put it into
///   the ingest bucket, and with `--trigger` notify the processing endpoint.
/// - `process` (alias `p`): notify the processing endpoint that an object already
///   in the ingest bucket is ready.
///
/// Fetching, uploading and trigger signing live in [`ab2_core`]; this module only
/// wires them to the real AWS clients and prints the outcome.
use crate::identity::AwsIdentity;
use crate::load_config::{default_config_path, load_config};
use crate::upload::S3Store;
use ab2_core::config::Config;
use ab2_core::contract::{ObjectStore, PutReceipt, SigningIdentityProvider};
use ab2_core::fetch::{FetchSettings, FetchTarget, Fetcher};
use ab2_core::trigger::{Trigger, TriggerResponse};
use ab2_core::upload::upload_file;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for ab2: upload files to the ingest bucket and trigger processing.
#[derive(Parser)]
#[clap(
    name = "ab2",
    version,
    about = "Fetch a file from local disk, IPFS or HTTP, upload it to the ingest bucket and trigger processing"
)]
pub struct Cli {
    /// Path to the YAML config file (defaults to ~/go/bin/config.yaml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a file to the ingest bucket
    #[clap(visible_alias = "u")]
    Upload {
        /// File type appended to network-sourced keys, e.g. `csv`, `png`, `jpg`
        #[clap(short = 'f', long, default_value = "csv")]
        filetype: String,
        /// Where to read the file from: `local`, `ipfs` or `http`
        #[clap(short = 'p', long, default_value = "local")]
        protocol: String,
        /// Local path, IPFS content identifier or URL
        #[clap(short = 'u', long)]
        path: String,
        /// Trigger processing of the uploaded object afterwards
        #[clap(long)]
        trigger: bool,
    },
    /// Trigger processing of an object in the ingest bucket
    #[clap(visible_alias = "p")]
    Process {
        /// Object key in the ingest bucket
        #[clap(short = 'u', long)]
        path: String,
    },
}

/// Fetch `target` and store it in the configured ingest bucket.
pub async fn upload_command<S>(config: &Config, store: &S, target: &FetchTarget) -> Result<PutReceipt>
where
    S: ObjectStore + ?Sized,
{
    let fetcher = Fetcher::new(FetchSettings::from(config));
    let fetched = fetcher
        .fetch(target)
        .await
        .with_context(|| format!("Failed to fetch {} source {}", target.protocol, target.path))?;

    let receipt = upload_file(store, &config.ingest_bucket, fetched.path(), fetched.key()).await?;
    // `fetched` drops here, removing any staged download.
    Ok(receipt)
}

/// Signal the processing endpoint that `ingest-bucket/key` is ready.
pub async fn process_command<P>(
    trigger: &Trigger,
    config: &Config,
    identity: &P,
    key: &str,
) -> Result<TriggerResponse>
where
    P: SigningIdentityProvider + ?Sized,
{
    let response = trigger.send(identity, &config.ingest_bucket, key).await?;
    Ok(response)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = load_config(&config_path)?;

    match cli.command {
        Commands::Upload {
            filetype,
            protocol,
            path,
            trigger,
        } => {
            let target = FetchTarget::new(&protocol, &path, &filetype)?;
            // Fail before fetching when the trigger could never be sent.
            let trigger = if trigger {
                Some(Trigger::from_config(&config)?)
            } else {
                None
            };
            tracing::info!(command = "upload", protocol = %target.protocol, path = %target.path, "Starting upload");

            let sdk_config = aws_config::load_from_env().await;
            let store = S3Store::from_sdk_config(&sdk_config);
            let receipt = upload_command(&config, &store, &target).await?;
            println!(
                "Upload result: {}/{} (etag {})",
                receipt.bucket,
                receipt.key,
                receipt.e_tag.as_deref().unwrap_or("-")
            );
            println!("Succeeded");

            if let Some(trigger) = &trigger {
                let identity = AwsIdentity::new(sdk_config);
                let response = process_command(trigger, &config, &identity, &receipt.key).await?;
                println!("{}", response.body);
            }
            Ok(())
        }
        Commands::Process { path } => {
            tracing::info!(command = "process", key = %path, "Starting processing trigger");
            // Validate the endpoint before resolving credentials.
            let trigger = Trigger::from_config(&config)?;
            let identity = AwsIdentity::new(aws_config::load_from_env().await);
            let response = process_command(&trigger, &config, &identity, &path).await?;
            println!("{}", response.body);
            Ok(())
        }
    }
}
