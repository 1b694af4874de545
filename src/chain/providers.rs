use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers::prelude::*;
use url::Url;

use crate::chain::reader::EthersChainReader;
use crate::chain::retry::RetryPolicy;

/// HTTP provider with a per-request timeout.
pub fn create_http_provider(rpc_url: &str, timeout: Duration) -> Result<Arc<Provider<Http>>> {
    let url = Url::parse(rpc_url).with_context(|| format!("invalid RPC_URL {:?}", rpc_url))?;
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;
    Ok(Arc::new(Provider::new(Http::new_with_client(url, client))))
}

pub fn create_chain_reader(
    rpc_url: &str,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<EthersChainReader<Provider<Http>>> {
    let provider = create_http_provider(rpc_url, timeout)?;
    Ok(EthersChainReader::new(provider, retry))
}
