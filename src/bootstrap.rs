use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ethers::types::U256;

use crate::chain::providers;
use crate::chain::reader::ChainReader;
use crate::chain::retry::RetryPolicy;
use crate::config::{Config, IncentiveConfig};
use crate::engine::service::PlanningContext;
use crate::models::{parse_address, Deployment, IncentiveKey, PolicyOverrides, RebalancePolicy};

pub struct AppState {
    pub reader: Arc<dyn ChainReader>,
    pub deployment: Deployment,
    pub context: PlanningContext,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let retry = RetryPolicy::new(
            config.rpc_max_attempts,
            Duration::from_millis(config.rpc_base_delay_ms),
            Duration::from_millis(config.rpc_jitter_ms),
        );
        let reader = providers::create_chain_reader(&config.rpc_url, Duration::from_secs(config.rpc_timeout_secs), retry)?;

        let deployment = deployment_from_config(config)?;
        let context = PlanningContext {
            caller_policy: caller_policy_from_config(config)?,
            quote_token: config
                .quote_token_address
                .as_deref()
                .map(parse_address)
                .transpose()
                .context("QUOTE_TOKEN_ADDRESS")?,
        };

        log::info!(
            "planning against chain {} (position manager {:?}, farming {})",
            deployment.chain_id,
            deployment.position_manager,
            if deployment.incentive.is_some() { "enabled" } else { "disabled" }
        );

        Ok(AppState { reader: Arc::new(reader), deployment, context })
    }

    /// State over an arbitrary reader, for tests and embedding.
    pub fn with_reader(reader: Arc<dyn ChainReader>, deployment: Deployment, context: PlanningContext) -> Self {
        AppState { reader, deployment, context }
    }
}

pub fn deployment_from_config(config: &Config) -> anyhow::Result<Deployment> {
    Ok(Deployment {
        chain_id: config.expected_chain_id,
        position_manager: parse_address(&config.position_manager_address).context("POSITION_MANAGER_ADDRESS")?,
        swap_router: parse_address(&config.swap_router_address).context("SWAP_ROUTER_ADDRESS")?,
        quoter: parse_address(&config.quoter_address).context("QUOTER_ADDRESS")?,
        factory: parse_address(&config.factory_address).context("FACTORY_ADDRESS")?,
        farming_center: config
            .farming_center_address
            .as_deref()
            .map(parse_address)
            .transpose()
            .context("FARMING_CENTER_ADDRESS")?,
        incentive: config.incentive.as_ref().map(incentive_key).transpose()?,
    })
}

fn incentive_key(incentive: &IncentiveConfig) -> anyhow::Result<IncentiveKey> {
    Ok(IncentiveKey {
        reward_token: parse_address(&incentive.reward_token).context("INCENTIVE_REWARD_TOKEN")?,
        bonus_reward_token: parse_address(&incentive.bonus_reward_token).context("INCENTIVE_BONUS_REWARD_TOKEN")?,
        pool: parse_address(&incentive.pool).context("INCENTIVE_POOL")?,
        nonce: U256::from_dec_str(incentive.nonce.trim())
            .map_err(|e| anyhow::anyhow!("INCENTIVE_NONCE {:?}: {}", incentive.nonce, e))?,
    })
}

/// Caller policy from POLICY_* variables, or None to use the system default.
pub fn caller_policy_from_config(config: &Config) -> anyhow::Result<Option<RebalancePolicy>> {
    if !config.has_caller_policy() {
        return Ok(None);
    }
    let overrides = PolicyOverrides {
        edge_bps: config.policy_edge_bps,
        slippage_bps: config.policy_slippage_bps,
        deadline_seconds: config.policy_deadline_seconds,
    };
    let policy = RebalancePolicy::resolve(&overrides, None).context("invalid POLICY_* configuration")?;
    Ok(Some(policy))
}
