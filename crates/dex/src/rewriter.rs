//! 滑点改写器
//!
//! 根据滑点容忍度重新计算边界参数 (最小输出 / 最大输入)，并把 deadline
//! 改为 `now + 5 分钟`，然后重新编码。
//!
//! 两个方向使用同一个公式: `new = floor(bound * (100 - t) / 100)`。
//! t = 0 时边界不变，t = 100 时边界为 0。

use ethers::types::{Bytes, U256};
use models::{selector_hex, BoundKind, KnownSwap, Selector, SlippageTolerance};
use thiserror::Error;
use tracing::debug;

use crate::codec::{CalldataCodec, CodecError};

/// deadline 窗口 (秒)
pub const DEADLINE_WINDOW_SECS: u64 = 300;

/// 改写错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Selector {} has no slippage bound parameter", selector_hex(.selector))]
    Unsupported { selector: Selector },
}

/// 改写结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenCall {
    pub data: Bytes,
    pub bound_kind: BoundKind,
    pub original_bound: U256,
    pub new_bound: U256,
    /// 新 deadline (调用形状没有 deadline 时为 None)
    pub deadline: Option<u64>,
}

/// 调用中当前的保护参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundInspection {
    pub bound_kind: BoundKind,
    pub bound: U256,
    pub deadline: Option<U256>,
}

/// 按容忍度收紧边界，任何 U256 都不会溢出
pub fn apply_tolerance(bound: U256, tolerance: SlippageTolerance) -> U256 {
    let keep = U256::from(100 - tolerance.percent() as u64);
    let hundred = U256::from(100);
    // bound = 100q + r  =>  floor(bound * keep / 100) = q * keep + floor(r * keep / 100)
    let (q, r) = bound.div_mod(hundred);
    q * keep + r * keep / hundred
}

/// 滑点改写器
#[derive(Debug, Clone)]
pub struct SlippageRewriter {
    codec: CalldataCodec,
}

impl SlippageRewriter {
    pub fn new(codec: CalldataCodec) -> Self {
        Self { codec }
    }

    pub fn standard() -> Self {
        Self::new(CalldataCodec::standard())
    }

    pub fn codec(&self) -> &CalldataCodec {
        &self.codec
    }

    /// 以当前时间改写
    pub fn rewrite(
        &self,
        call: &KnownSwap,
        data: &[u8],
        tolerance: SlippageTolerance,
    ) -> Result<RewrittenCall, RewriteError> {
        self.rewrite_at(call, data, tolerance, utils::unix_timestamp())
    }

    /// 以给定的 unix 时间改写
    pub fn rewrite_at(
        &self,
        call: &KnownSwap,
        data: &[u8],
        tolerance: SlippageTolerance,
        now: u64,
    ) -> Result<RewrittenCall, RewriteError> {
        let shape = self.codec.shape(&call.selector)?;
        let bound_kind = shape.kind.bound_kind();
        let bound_index = shape.bound_index.ok_or(RewriteError::Unsupported {
            selector: call.selector,
        })?;
        let deadline_index = shape.deadline_index;
        let name = shape.name;

        let mut decoded = self.codec.decode(&call.selector, data)?;

        let original_bound = decoded.uint(bound_index).ok_or(RewriteError::Unsupported {
            selector: call.selector,
        })?;
        let new_bound = apply_tolerance(original_bound, tolerance);
        if !decoded.set_uint(bound_index, new_bound) {
            return Err(RewriteError::Unsupported {
                selector: call.selector,
            });
        }

        let deadline = match deadline_index {
            Some(index) => {
                let deadline = now + DEADLINE_WINDOW_SECS;
                if !decoded.set_uint(index, U256::from(deadline)) {
                    return Err(RewriteError::Unsupported {
                        selector: call.selector,
                    });
                }
                Some(deadline)
            }
            None => None,
        };

        let data = self.codec.encode(&decoded)?;

        debug!(
            "改写 {}: {:?} {} -> {} (容忍度 {}), deadline={:?}",
            name, bound_kind, original_bound, new_bound, tolerance, deadline
        );

        Ok(RewrittenCall {
            data,
            bound_kind,
            original_bound,
            new_bound,
            deadline,
        })
    }

    /// 读取调用中当前的边界和 deadline (不改写)
    pub fn inspect(&self, call: &KnownSwap, data: &[u8]) -> Result<BoundInspection, RewriteError> {
        let shape = self.codec.shape(&call.selector)?;
        let bound_kind = shape.kind.bound_kind();
        let bound_index = shape.bound_index.ok_or(RewriteError::Unsupported {
            selector: call.selector,
        })?;
        let deadline_index = shape.deadline_index;

        let decoded = self.codec.decode(&call.selector, data)?;
        let bound = decoded.uint(bound_index).ok_or(RewriteError::Unsupported {
            selector: call.selector,
        })?;
        let deadline = deadline_index.and_then(|index| decoded.uint(index));

        Ok(BoundInspection {
            bound_kind,
            bound,
            deadline,
        })
    }
}
