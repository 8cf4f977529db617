use anyhow::{Context, Result};
use models::{SlippageOutOfRange, SlippageTolerance};
use serde::Deserialize;
use std::env;
use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid slippage tolerance: {0}")]
    InvalidSlippageTolerance(#[from] SlippageOutOfRange),

    #[error("{0} not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// 支持的区块链枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum SupportedChain {
    Ethereum = 1,
    Goerli = 5,
    Bsc = 56,
    Polygon = 137,
    Arbitrum = 42161,
    Base = 8453,
    Sepolia = 11155111,
}

impl SupportedChain {
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(SupportedChain::Ethereum),
            5 => Some(SupportedChain::Goerli),
            56 => Some(SupportedChain::Bsc),
            137 => Some(SupportedChain::Polygon),
            42161 => Some(SupportedChain::Arbitrum),
            8453 => Some(SupportedChain::Base),
            11155111 => Some(SupportedChain::Sepolia),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SupportedChain::Ethereum => "Ethereum",
            SupportedChain::Goerli => "Goerli",
            SupportedChain::Bsc => "BSC",
            SupportedChain::Polygon => "Polygon",
            SupportedChain::Arbitrum => "Arbitrum",
            SupportedChain::Base => "Base",
            SupportedChain::Sepolia => "Sepolia",
        }
    }

    /// 链名称，未知链返回 chain id
    pub fn display_name(chain_id: u64) -> String {
        Self::from_chain_id(chain_id)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| format!("chain-{}", chain_id))
    }
}

/// MEV 保护策略
///
/// 引擎构造时传入一次，生命周期内只读。
#[derive(Debug, Clone, Deserialize)]
pub struct ProtectionConfig {
    /// 总开关。关闭时所有调用都是纯透传
    pub enabled: bool,
    /// 在可用时尝试私密中继 bundle
    pub use_relay: bool,
    /// 滑点容忍度 (0-100%)
    pub slippage_tolerance: SlippageTolerance,
    /// 中继身份私钥 (只用于向中继证明身份，不签署资金交易)
    /// 未配置时生成一次性临时身份
    pub relay_signer_key: Option<String>,
}

impl ProtectionConfig {
    pub fn new(
        enabled: bool,
        use_relay: bool,
        slippage_tolerance_percent: u8,
        relay_signer_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled,
            use_relay,
            slippage_tolerance: SlippageTolerance::new(slippage_tolerance_percent)?,
            relay_signer_key,
        })
    }

    /// 关闭保护 (纯透传)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            use_relay: false,
            slippage_tolerance: SlippageTolerance::default(),
            relay_signer_key: None,
        }
    }
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_relay: true,
            slippage_tolerance: SlippageTolerance::default(),
            relay_signer_key: None,
        }
    }
}

/// 中继客户端配置
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// 覆盖默认中继 URL
    pub relay_url: Option<String>,
    /// 等待目标区块时的轮询间隔 (毫秒)
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            poll_interval_ms: 1000,
        }
    }
}

/// `mev_guard` 命令行的运行配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub protection: ProtectionConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // 加载 .env 文件
        dotenv::dotenv().ok();

        let rpc_url = env::var("RPC_URL").map_err(|_| ConfigError::MissingVar("RPC_URL"))?;
        url::Url::parse(&rpc_url).context("Invalid RPC_URL")?;

        let private_key = env::var("PRIVATE_KEY").ok().filter(|s| !s.is_empty());

        let enabled = parse_flag("MEV_PROTECTION_ENABLED", true)?;
        let use_relay = parse_flag("MEV_USE_RELAY", true)?;
        let tolerance = match env::var("MEV_SLIPPAGE_TOLERANCE_PERCENT") {
            Ok(value) => value.trim().parse::<u8>().map_err(|_| ConfigError::InvalidVar {
                name: "MEV_SLIPPAGE_TOLERANCE_PERCENT",
                value,
            })?,
            Err(_) => SlippageTolerance::default().percent(),
        };
        let relay_signer_key = env::var("FLASHBOTS_SIGNER_KEY").ok().filter(|s| !s.is_empty());

        let protection = ProtectionConfig::new(enabled, use_relay, tolerance, relay_signer_key)?;

        let relay_url = env::var("FLASHBOTS_RELAY_URL").ok().filter(|s| !s.is_empty());
        if let Some(ref relay_url) = relay_url {
            url::Url::parse(relay_url).context("Invalid FLASHBOTS_RELAY_URL")?;
        }

        let relay = RelayConfig {
            relay_url,
            poll_interval_ms: match env::var("RELAY_POLL_INTERVAL_MS") {
                Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidVar {
                    name: "RELAY_POLL_INTERVAL_MS",
                    value,
                })?,
                Err(_) => RelayConfig::default().poll_interval_ms,
            },
        };

        Ok(Self {
            rpc_url,
            private_key,
            protection,
            relay,
        })
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidVar { name, value }),
        },
        Err(_) => Ok(default),
    }
}
