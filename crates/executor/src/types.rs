use dex::RewriteError;
use models::Advisory;
use thiserror::Error;

/// `protect()` 的错误
///
/// 中继回退不是错误，见 [`Advisory::RelayFallback`]。
#[derive(Debug, Error)]
pub enum ProtectError {
    /// 已识别的 swap 无法改写，没有发送任何交易
    #[error("Slippage rewrite failed: {0}")]
    RewriteFailed(#[from] RewriteError),

    /// 广播失败，附带失败前已经产生的提示
    #[error("Broadcast failed: {reason}")]
    BroadcastFailed {
        reason: String,
        advisories: Vec<Advisory>,
    },
}

impl ProtectError {
    /// 失败前产生的提示
    pub fn advisories(&self) -> &[Advisory] {
        match self {
            ProtectError::RewriteFailed(_) => &[],
            ProtectError::BroadcastFailed { advisories, .. } => advisories,
        }
    }
}
