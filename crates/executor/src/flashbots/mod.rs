//! Flashbots 模块
//!
//! 私密中继的 Flashbots 实现，防止三明治攻击、抢跑
//!
//! ## 工作原理
//!
//! ```text
//! 普通交易:  钱包 → 公开 Mempool → 所有人可见 → 可能被夹
//! Flashbots: 钱包 → Flashbots 中继 → 私密发给验证者 → 直接打包
//! ```
//!
//! 只有白名单中的链 (主网、Goerli、Sepolia) 有中继。

mod bundle;
mod client;
mod types;

pub use bundle::BundleBuilder;
pub use client::FlashbotsRelay;
pub use types::*;
