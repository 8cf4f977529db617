use anyhow::{Context, Result};
use ethers::prelude::*;
use std::sync::Arc;
use tracing::{error, info, warn};

use config_crate::{AppConfig, SupportedChain};
use executor::{EthersChain, FlashbotsConfig, FlashbotsRelay, Protector, WalletSigner};

/// 已连接链的保护引擎
pub struct Application {
    pub protector: Arc<Protector>,
    pub chain_id: u64,
}

impl Application {
    /// 连接 RPC，按配置组装 Protector
    pub async fn start(config: &AppConfig) -> Result<Self> {
        Self::log_config(config);

        info!("初始化以太坊 Provider...");
        let provider = Arc::new(
            Provider::<Http>::try_from(config.rpc_url.as_str()).context("Provider 创建失败")?,
        );
        let chain_id = provider.get_chainid().await.context("获取 chain id 失败")?.as_u64();
        info!("已连接 {} (chain_id={})", SupportedChain::display_name(chain_id), chain_id);

        let private_key = config
            .private_key
            .as_deref()
            .context("PRIVATE_KEY not set")?;
        let signer = WalletSigner::from_private_key(provider.clone(), private_key, chain_id)?;
        info!("✅ 钱包已加载: {:?}", executor::TransactionSigner::address(&signer));

        let chain = Arc::new(EthersChain::new(provider.clone()));
        let mut protector = Protector::new(config.protection.clone(), chain, Arc::new(signer));

        if config.protection.enabled && config.protection.use_relay {
            match Self::relay_config(config, chain_id) {
                Some(relay_config) => {
                    let relay = FlashbotsRelay::new(relay_config, provider)?;
                    protector = protector.with_relay(Arc::new(relay));
                    info!("✅ Flashbots 私密中继已启用");
                }
                None => warn!("⚠️  链 {} 没有私密中继, 交易将公开广播", chain_id),
            }
        }

        Ok(Self {
            protector: Arc::new(protector),
            chain_id,
        })
    }

    /// 中继配置，链不在白名单中且未显式指定 URL 时返回 None
    fn relay_config(config: &AppConfig, chain_id: u64) -> Option<FlashbotsConfig> {
        let relay_url = match &config.relay.relay_url {
            Some(url) if executor::relay_supported(chain_id) => url.clone(),
            _ => FlashbotsConfig::relay_url_for_chain(chain_id)?.to_string(),
        };
        Some(FlashbotsConfig {
            relay_url,
            chain_id,
            signer_key: config.protection.relay_signer_key.clone(),
            poll_interval_ms: config.relay.poll_interval_ms,
        })
    }

    fn log_config(config: &AppConfig) {
        info!("========================================");
        info!("RPC: {}", config.rpc_url);
        info!("MEV 保护: {}", if config.protection.enabled { "开启" } else { "关闭" });
        info!("私密中继: {}", if config.protection.use_relay { "开启" } else { "关闭" });
        info!("滑点容忍度: {}", config.protection.slippage_tolerance);
        info!("========================================");
    }
}

/// 设置 panic hook
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("========================================");
        error!("!!! 系统发生 PANIC !!!");
        error!("========================================");
        error!("Panic 信息: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            error!(
                "发生位置: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            error!("Panic 消息: {}", s);
        }
        error!("========================================");
    }));
}
