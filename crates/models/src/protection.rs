use ethers::types::{Address, Transaction, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::trade::{selector_hex, RouterFamily, Selector};

/// 私密中继提交的终态 (闭集)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// Bundle 已在目标区块打包
    Included {
        bundle_hash: H256,
        block_number: u64,
        tx_hash: H256,
    },
    /// 目标区块已过，未被打包
    ExcludedFromBlock { target_block: u64 },
    /// 该 nonce 已被其他交易消耗
    NonceAlreadyMined { nonce: U256 },
    /// 中继模拟 revert 或报错
    SimulationFailed { reason: String },
    /// 中继或链读取不可用
    RelayUnreachable { reason: String },
}

impl SubmissionOutcome {
    pub fn is_included(&self) -> bool {
        matches!(self, SubmissionOutcome::Included { .. })
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionOutcome::Included { block_number, tx_hash, .. } => {
                write!(f, "included in block {} ({:?})", block_number, tx_hash)
            }
            SubmissionOutcome::ExcludedFromBlock { target_block } => {
                write!(f, "not included in target block {}", target_block)
            }
            SubmissionOutcome::NonceAlreadyMined { nonce } => {
                write!(f, "nonce {} already mined by another transaction", nonce)
            }
            SubmissionOutcome::SimulationFailed { reason } => write!(f, "simulation failed: {}", reason),
            SubmissionOutcome::RelayUnreachable { reason } => write!(f, "relay unreachable: {}", reason),
        }
    }
}

/// 调用方可见的提示 (不是错误)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    /// 发往已知 Router 的调用无法解析，未做任何保护
    UnrecognizedRouterCall {
        router: Address,
        family: RouterFamily,
        selector: Selector,
    },
    /// 私密中继未成功，已回退到公开广播 (滑点保护仍然生效)
    RelayFallback { outcome: SubmissionOutcome },
    /// nonce 已被其他交易消耗，原始意图可能已过期
    StaleIntent { nonce: U256 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::UnrecognizedRouterCall { router, family, selector } => write!(
                f,
                "call {} to known {} router {:?} could not be analyzed; sent without protection",
                selector_hex(selector),
                family,
                router
            ),
            Advisory::RelayFallback { outcome } => {
                write!(f, "private relay fallback ({}); broadcast publicly with slippage bound", outcome)
            }
            Advisory::StaleIntent { nonce } => {
                write!(f, "nonce {} was consumed by another transaction; intent may be stale", nonce)
            }
        }
    }
}

/// 交易最终的发送渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionRoute {
    /// 通过私密中继 bundle 打包
    Relay { bundle_hash: H256, block_number: u64 },
    /// 公开 mempool 广播
    PublicMempool,
}

/// `protect()` 返回给调用方的交易句柄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionHandle {
    pub tx_hash: H256,
    pub route: SubmissionRoute,
    /// calldata 是否被改写 (滑点保护)
    pub calldata_rewritten: bool,
    /// 中继打包后从链上取回的交易
    pub transaction: Option<Transaction>,
    pub advisories: Vec<Advisory>,
}

impl TransactionHandle {
    pub fn public(tx_hash: H256, calldata_rewritten: bool) -> Self {
        Self {
            tx_hash,
            route: SubmissionRoute::PublicMempool,
            calldata_rewritten,
            transaction: None,
            advisories: Vec::new(),
        }
    }

    pub fn with_advisories(mut self, advisories: Vec<Advisory>) -> Self {
        self.advisories = advisories;
        self
    }

    pub fn is_relayed(&self) -> bool {
        matches!(self.route, SubmissionRoute::Relay { .. })
    }
}
