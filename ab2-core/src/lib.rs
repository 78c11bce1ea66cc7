#![doc = "ab2-core: fetch, upload and trigger logic for the ab2 CLI."]

//! This crate holds everything that does not need an AWS SDK client: the config
//! model, the source fetcher, upload orchestration and the signed processing
//! trigger. The CLI crate supplies the real [`contract::ObjectStore`] and
//! [`contract::SigningIdentityProvider`] implementations.

pub mod config;
pub mod contract;
pub mod fetch;
pub mod trigger;
pub mod upload;
