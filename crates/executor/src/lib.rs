//! MEV 保护执行层
//!
//! 负责把钱包交易安全地送上链
//!
//! ## 模块结构
//!
//! - `chain`: 链读取与签名能力
//! - `relay`: 私密中继接口
//! - `flashbots`: Flashbots 中继实现
//! - `submitter`: bundle 提交状态机
//! - `protector`: 保护编排 (分类、改写、中继、回退)
//! - `events`: 钱包事件与 Protector 替换

pub mod chain;
pub mod relay;
pub mod flashbots;
pub mod submitter;
pub mod protector;
pub mod events;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ChainReader, EthersChain, SignedTransaction, TransactionSigner, WalletSigner};
pub use relay::{Bundle, PrivateRelay, RelayResolution, SimulationOutcome, SubmissionHandle};
pub use flashbots::{relay_supported, BundleBuilder, FlashbotsConfig, FlashbotsRelay};
pub use submitter::{BundleSubmission, RelaySubmitter, SubmissionReport, SubmissionState};
pub use protector::{intent_is_protected, Protector};
pub use events::{run_wallet_events, ProtectorSlot, WalletEvent};
pub use types::ProtectError;
