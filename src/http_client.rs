use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

const USER_AGENT: &str = concat!("dota_ingest/", env!("CARGO_PKG_VERSION"));

/// Blocking client shared by every request of a run. A timeout of zero
/// disables the per-request deadline entirely.
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}
