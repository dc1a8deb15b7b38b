//! Builder and pipeline configuration.
//!
//! Configuration is explicit and passed into [`crate::InstructionBuilder`] and
//! [`crate::SubmissionPipeline`] constructors. Both structs deserialize from
//! camelCase JSON with every field defaulted, and `PipelineConfig` can also be
//! read from `TOKEN_PIPELINE_*` environment variables.

use crate::error::{Result, TokenPipelineError};
use crate::instructions::TOKEN_PROGRAM;
use crate::pubkey::parse_field;
use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// Decimals assumed for every intent except CreateToken.
pub const DEFAULT_DECIMALS: u8 = 6;

/// Network cluster with a public RPC endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cluster {
    Mainnet,
    Testnet,
    #[default]
    Devnet,
    Localnet,
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }

    pub fn parse(name: &str) -> Result<Cluster> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "testnet" => Ok(Cluster::Testnet),
            "devnet" => Ok(Cluster::Devnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(TokenPipelineError::Config(format!("Unknown cluster: {}", other))),
        }
    }
}

/// Commitment a submission must reach before it is reported as successful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Commitment {
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Settings for the instruction builder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderConfig {
    /// Wallet that owns holding accounts, pays for new accounts and holds mint authority
    #[serde(with = "crate::pubkey::serde_base58")]
    pub owner: Pubkey,
    #[serde(with = "crate::pubkey::serde_base58")]
    pub token_program: Pubkey,
    /// Decimals for Transfer / Delegate / Burn / MintTo
    pub default_decimals: u8,
    /// Allow deriving holding accounts for owners that are program-derived addresses
    pub allow_owner_off_curve: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            owner: Pubkey::default(),
            token_program: TOKEN_PROGRAM,
            default_decimals: DEFAULT_DECIMALS,
            allow_owner_off_curve: false,
        }
    }
}

impl BuilderConfig {
    pub fn new(owner: Pubkey) -> Self {
        BuilderConfig {
            owner,
            ..Default::default()
        }
    }

    pub fn with_token_program(mut self, token_program: Pubkey) -> Self {
        self.token_program = token_program;
        self
    }
}

/// Settings for the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub cluster: Cluster,
    /// Overrides the cluster's public endpoint
    pub rpc_url: Option<String>,
    pub commitment: Commitment,
    pub poll_interval_ms: u64,
    /// Upper bound on the confirmation wait
    pub confirm_timeout_ms: u64,
    /// Priority fee in micro-lamports per compute unit
    pub compute_unit_price: Option<u64>,
    pub skip_preflight: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            cluster: Cluster::default(),
            rpc_url: None,
            commitment: Commitment::default(),
            poll_interval_ms: 500,
            confirm_timeout_ms: 60_000,
            compute_unit_price: None,
            skip_preflight: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| TokenPipelineError::Config(format!("Invalid pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read overrides from `TOKEN_PIPELINE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = PipelineConfig::default();

        if let Some(cluster) = lookup("TOKEN_PIPELINE_CLUSTER") {
            config.cluster = Cluster::parse(&cluster)?;
        }
        if let Some(url) = lookup("TOKEN_PIPELINE_RPC_URL") {
            config.rpc_url = Some(url);
        }
        if let Some(commitment) = lookup("TOKEN_PIPELINE_COMMITMENT") {
            config.commitment = match commitment.trim().to_ascii_lowercase().as_str() {
                "confirmed" => Commitment::Confirmed,
                "finalized" => Commitment::Finalized,
                other => {
                    return Err(TokenPipelineError::Config(format!(
                        "Unknown commitment: {}",
                        other
                    )))
                }
            };
        }
        if let Some(value) = lookup("TOKEN_PIPELINE_POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_u64("TOKEN_PIPELINE_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("TOKEN_PIPELINE_CONFIRM_TIMEOUT_MS") {
            config.confirm_timeout_ms = parse_u64("TOKEN_PIPELINE_CONFIRM_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("TOKEN_PIPELINE_COMPUTE_UNIT_PRICE") {
            config.compute_unit_price = Some(parse_u64("TOKEN_PIPELINE_COMPUTE_UNIT_PRICE", &value)?);
        }
        if let Some(value) = lookup("TOKEN_PIPELINE_SKIP_PREFLIGHT") {
            config.skip_preflight = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(TokenPipelineError::Config(format!(
                        "TOKEN_PIPELINE_SKIP_PREFLIGHT must be true or false, got {}",
                        value
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TokenPipelineError::Config(
                "pollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.confirm_timeout_ms < self.poll_interval_ms {
            return Err(TokenPipelineError::Config(format!(
                "confirmTimeoutMs ({}) is shorter than pollIntervalMs ({})",
                self.confirm_timeout_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.cluster.rpc_url())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

/// Parse the owner address of a builder config from text.
pub fn owner_from_str(owner: &str) -> Result<Pubkey> {
    parse_field("owner", owner)
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| TokenPipelineError::Config(format!("{} must be an integer, got {}", name, value)))
}
