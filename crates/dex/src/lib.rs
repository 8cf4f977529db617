//! DEX 调用识别与滑点保护
//!
//! - `registry`: 各链已知 Router 及其 ABI 家族
//! - `selectors`: 已知 swap 函数的调用形状
//! - `codec`: calldata 编解码
//! - `classifier`: 交易分类
//! - `rewriter`: 滑点边界与 deadline 改写

pub mod registry;
pub mod selectors;
pub mod codec;
pub mod classifier;
pub mod rewriter;

pub use registry::{RouterEntry, RouterRegistry, ethereum_routers};
pub use selectors::{ArgLayout, SelectorRegistry, SwapShape};
pub use codec::{CalldataCodec, CodecError, DecodedCall};
pub use classifier::DexClassifier;
pub use rewriter::{
    apply_tolerance, BoundInspection, RewriteError, RewrittenCall, SlippageRewriter,
    DEADLINE_WINDOW_SECS,
};
