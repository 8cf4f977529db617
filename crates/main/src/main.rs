//! MEV 保护命令行工具
//!
//! 使用方法:
//!   # 查看一笔交易的分类和当前保护状态 (离线)
//!   cargo run -p mev_guard -- inspect --to 0x7a25... --data 0x38ed1739...
//!
//!   # 按 5% 容忍度改写 calldata (离线)
//!   cargo run -p mev_guard -- rewrite --to 0x7a25... --data 0x38ed1739... --tolerance 5
//!
//!   # 保护并发送 (读取 .env)
//!   cargo run -p mev_guard -- protect --to 0x7a25... --data 0x38ed1739...

mod bootstrap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::parse_units;
use tracing::{info, warn};

use config_crate::{AppConfig, SupportedChain};
use dex::{DexClassifier, SlippageRewriter};
use executor::intent_is_protected;
use models::{FeeFields, SlippageTolerance, TradeKind, TransactionIntent};
use utils::{unix_timestamp, unix_to_shanghai_str, LoggerManager};

use crate::bootstrap::{setup_panic_hook, Application};

#[derive(Parser)]
#[command(name = "mev_guard")]
#[command(about = "DEX 交易 MEV 保护工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 分类交易并显示滑点边界、deadline 和保护状态
    Inspect {
        /// 链 ID（默认以太坊主网）
        #[arg(long, default_value = "1")]
        chain_id: u64,

        /// 目标合约地址
        #[arg(long)]
        to: String,

        /// calldata (十六进制)
        #[arg(long)]
        data: String,

        /// EIP-1559 maxFeePerGas (gwei)
        #[arg(long)]
        max_fee_gwei: Option<u64>,

        /// EIP-1559 maxPriorityFeePerGas (gwei)
        #[arg(long)]
        priority_fee_gwei: Option<u64>,
    },

    /// 按容忍度改写 calldata 并输出
    Rewrite {
        /// 链 ID（默认以太坊主网）
        #[arg(long, default_value = "1")]
        chain_id: u64,

        /// 目标合约地址
        #[arg(long)]
        to: String,

        /// calldata (十六进制)
        #[arg(long)]
        data: String,

        /// 滑点容忍度 (0-100，默认 1)
        #[arg(short, long, default_value = "1")]
        tolerance: u8,
    },

    /// 保护并发送交易
    Protect {
        /// 目标合约地址
        #[arg(long)]
        to: String,

        /// calldata (十六进制)
        #[arg(long)]
        data: String,

        /// 发送的 ETH 数量 (wei)
        #[arg(long, default_value = "0")]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    let _logger = LoggerManager::init();

    // 设置 panic hook
    setup_panic_hook();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            chain_id,
            to,
            data,
            max_fee_gwei,
            priority_fee_gwei,
        } => {
            let mut intent = TransactionIntent::call(chain_id, parse_address(&to)?, parse_calldata(&data)?);
            if let (Some(max_fee), Some(priority_fee)) = (max_fee_gwei, priority_fee_gwei) {
                intent = intent.with_fees(FeeFields::Eip1559 {
                    max_fee_per_gas: gwei(max_fee)?,
                    max_priority_fee_per_gas: gwei(priority_fee)?,
                });
            }
            inspect(&intent);
        }

        Commands::Rewrite {
            chain_id,
            to,
            data,
            tolerance,
        } => {
            let tolerance = SlippageTolerance::new(tolerance)?;
            let intent = TransactionIntent::call(chain_id, parse_address(&to)?, parse_calldata(&data)?);

            let classifier = DexClassifier::standard();
            let swap = match classifier.classify(intent.chain_id, intent.to, &intent.data) {
                TradeKind::KnownSwap(swap) => swap,
                other => anyhow::bail!("不是可改写的 swap: {:?}", other),
            };

            let rewritten = SlippageRewriter::standard().rewrite(&swap, &intent.data, tolerance)?;
            info!(
                "{:?}: {} -> {}, deadline={:?}",
                rewritten.bound_kind, rewritten.original_bound, rewritten.new_bound, rewritten.deadline
            );
            println!("{}", rewritten.data);
        }

        Commands::Protect { to, data, value } => {
            let config = AppConfig::load()?;
            let app = Application::start(&config).await?;

            let value = U256::from_dec_str(&value).context("Invalid --value")?;
            let intent = TransactionIntent::call(app.chain_id, parse_address(&to)?, parse_calldata(&data)?)
                .with_value(value)
                .with_from(app.protector.signer_address());

            let handle = app.protector.protect(&intent).await?;
            for advisory in &handle.advisories {
                warn!("⚠️  {}", advisory);
            }
            info!("交易哈希: {:?}", handle.tx_hash);
            println!("{}", serde_json::to_string_pretty(&handle)?);
        }
    }

    Ok(())
}

/// 离线检查一笔交易
fn inspect(intent: &TransactionIntent) {
    let classifier = DexClassifier::standard();
    let rewriter = SlippageRewriter::standard();

    info!("========================================");
    info!("链: {}", SupportedChain::display_name(intent.chain_id));

    let kind = classifier.classify(intent.chain_id, intent.to, &intent.data);
    match &kind {
        TradeKind::NotATrade => info!("分类: 非 DEX 交易"),
        TradeKind::UnknownCallToKnownRouter { router, family, selector } => {
            info!(
                "分类: 已知 {} Router {:?} 上的未知调用 0x{}",
                family,
                router,
                hex::encode(selector)
            );
        }
        TradeKind::KnownSwap(swap) => {
            let name = classifier
                .selectors()
                .get(&swap.selector)
                .map(|shape| shape.name)
                .unwrap_or("?");
            info!("分类: {} swap {}", swap.family, name);
            match rewriter.inspect(swap, &intent.data) {
                Ok(inspection) => {
                    info!("边界: {:?} = {}", inspection.bound_kind, inspection.bound);
                    match inspection.deadline {
                        Some(deadline) if deadline <= U256::from(u64::MAX) => {
                            info!("deadline: {}", unix_to_shanghai_str(deadline.as_u64()));
                        }
                        Some(deadline) => info!("deadline: {}", deadline),
                        None => info!("deadline: 无"),
                    }
                }
                Err(e) => warn!("无法读取边界: {}", e),
            }
        }
    }

    let protected = intent_is_protected(&classifier, &rewriter, intent, unix_timestamp());
    info!("已保护: {}", if protected { "是" } else { "否" });
    info!("========================================");
}

fn parse_address(value: &str) -> Result<Address> {
    value
        .parse::<Address>()
        .with_context(|| format!("Invalid address: {}", value))
}

fn parse_calldata(value: &str) -> Result<Bytes> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .with_context(|| format!("Invalid calldata: {}", value))?;
    Ok(bytes.into())
}

fn gwei(value: u64) -> Result<U256> {
    Ok(parse_units(value, "gwei")?.into())
}
