use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context};

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub expected_chain_id: u64,
    pub port: u16,

    // Protocol addresses
    pub position_manager_address: String,
    pub swap_router_address: String,
    pub quoter_address: String,
    pub factory_address: String,
    pub farming_center_address: Option<String>,

    // Farming incentive key (all four or none)
    pub incentive: Option<IncentiveConfig>,

    // Valuation
    pub quote_token_address: Option<String>,

    // Transport
    pub rpc_timeout_secs: u64,
    pub rpc_max_attempts: u32,
    pub rpc_base_delay_ms: u64,
    pub rpc_jitter_ms: u64,

    // Caller policy layered over the system default
    pub policy_edge_bps: Option<u16>,
    pub policy_slippage_bps: Option<u16>,
    pub policy_deadline_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncentiveConfig {
    pub reward_token: String,
    pub bonus_reward_token: String,
    pub pool: String,
    pub nonce: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow!("{} must be set", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses a present variable; a malformed value is an error, never a silent default.
fn parsed<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{} has malformed value {:?}: {}", key, raw, e)),
        None => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load configuration files (secrets first, then public config)
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("addresses.env").ok();
        dotenv::from_filename("config/addresses.env").ok();
        dotenv::dotenv().ok();

        let expected_chain_id = parsed::<u64>("EXPECTED_CHAIN_ID")?
            .ok_or_else(|| anyhow!("EXPECTED_CHAIN_ID must be set"))?;

        Ok(Config {
            rpc_url: required("RPC_URL")?,
            expected_chain_id,
            port: parsed("PORT")?.unwrap_or(8000),

            position_manager_address: required("POSITION_MANAGER_ADDRESS")?,
            swap_router_address: required("SWAP_ROUTER_ADDRESS")?,
            quoter_address: required("QUOTER_ADDRESS")?,
            factory_address: required("FACTORY_ADDRESS")?,
            farming_center_address: optional("FARMING_CENTER_ADDRESS"),
            incentive: Self::incentive_from_env().context("invalid farming incentive configuration")?,

            quote_token_address: optional("QUOTE_TOKEN_ADDRESS"),

            rpc_timeout_secs: parsed("RPC_TIMEOUT_SECS")?.unwrap_or(10),
            rpc_max_attempts: parsed("RPC_MAX_ATTEMPTS")?.unwrap_or(4),
            rpc_base_delay_ms: parsed("RPC_BASE_DELAY_MS")?.unwrap_or(250),
            rpc_jitter_ms: parsed("RPC_JITTER_MS")?.unwrap_or(100),

            policy_edge_bps: parsed("POLICY_EDGE_BPS")?,
            policy_slippage_bps: parsed("POLICY_SLIPPAGE_BPS")?,
            policy_deadline_seconds: parsed("POLICY_DEADLINE_SECONDS")?,
        })
    }

    fn incentive_from_env() -> anyhow::Result<Option<IncentiveConfig>> {
        let reward = optional("INCENTIVE_REWARD_TOKEN");
        let pool = optional("INCENTIVE_POOL");
        let nonce = optional("INCENTIVE_NONCE");
        let bonus = optional("INCENTIVE_BONUS_REWARD_TOKEN");
        match (reward, pool, nonce) {
            (Some(reward_token), Some(pool), Some(nonce)) => Ok(Some(IncentiveConfig {
                reward_token,
                // zero bonus token means "no bonus reward"
                bonus_reward_token: bonus.unwrap_or_else(|| format!("0x{}", "0".repeat(40))),
                pool,
                nonce,
            })),
            (None, None, None) if bonus.is_none() => Ok(None),
            _ => Err(anyhow!(
                "INCENTIVE_REWARD_TOKEN, INCENTIVE_POOL and INCENTIVE_NONCE must be set together"
            )),
        }
    }

    /// True when any POLICY_* variable was provided.
    pub fn has_caller_policy(&self) -> bool {
        self.policy_edge_bps.is_some() || self.policy_slippage_bps.is_some() || self.policy_deadline_seconds.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // process environment is shared between test threads
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_parsed_rejects_malformed_value() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::set_var("LP_PLANNER_TEST_PORT", "80a0");
        let err = parsed::<u16>("LP_PLANNER_TEST_PORT").unwrap_err();
        assert!(err.to_string().contains("LP_PLANNER_TEST_PORT"));
        env::remove_var("LP_PLANNER_TEST_PORT");
    }

    #[test]
    fn test_parsed_absent_and_blank_are_none() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::remove_var("LP_PLANNER_TEST_ABSENT");
        assert_eq!(parsed::<u64>("LP_PLANNER_TEST_ABSENT").expect("absent is ok"), None);
        env::set_var("LP_PLANNER_TEST_BLANK", "  ");
        assert_eq!(parsed::<u64>("LP_PLANNER_TEST_BLANK").expect("blank is ok"), None);
        env::remove_var("LP_PLANNER_TEST_BLANK");
    }

    #[test]
    fn test_partial_incentive_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        env::set_var("INCENTIVE_REWARD_TOKEN", "0x1111111111111111111111111111111111111111");
        env::remove_var("INCENTIVE_POOL");
        env::remove_var("INCENTIVE_NONCE");
        env::remove_var("INCENTIVE_BONUS_REWARD_TOKEN");
        assert!(Config::incentive_from_env().is_err());
        env::remove_var("INCENTIVE_REWARD_TOKEN");
        assert_eq!(Config::incentive_from_env().expect("none set"), None);
    }
}
