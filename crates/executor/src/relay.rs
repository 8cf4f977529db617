//! 私密中继接口
//!
//! 引擎只依赖三个调用: 模拟、提交、等待结果。具体线上协议 (JSON-RPC、
//! bundle 签名) 由实现方负责，见 [`crate::flashbots::FlashbotsRelay`]。

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

use crate::chain::SignedTransaction;

/// 提交给中继的交易包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub transactions: Vec<SignedTransaction>,
}

impl Bundle {
    /// 单笔交易的 bundle
    pub fn single(tx: SignedTransaction) -> Self {
        Self {
            transactions: vec![tx],
        }
    }
}

/// 模拟结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    Success { gas_used: u64 },
    Reverted { reason: String },
}

/// 中继接受 bundle 后返回的句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionHandle {
    pub bundle_hash: H256,
    pub target_block: u64,
    pub tx_hash: H256,
    pub signer: Address,
    pub nonce: U256,
}

/// 中继报告的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayResolution {
    /// 已在目标区块打包
    BundleIncluded,
    /// 目标区块已过，未打包
    BlockPassedWithoutInclusion,
    /// 账户 nonce 已被其他交易推进
    AccountNonceTooHigh,
}

/// 私密中继
#[async_trait]
pub trait PrivateRelay: Send + Sync {
    async fn simulate(&self, bundle: &Bundle, target_block: u64) -> Result<SimulationOutcome>;

    async fn send_bundle(&self, bundle: &Bundle, target_block: u64) -> Result<SubmissionHandle>;

    /// 最多等待到目标区块
    async fn wait_for_resolution(&self, handle: &SubmissionHandle) -> Result<RelayResolution>;
}
