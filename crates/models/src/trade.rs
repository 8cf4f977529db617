use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 4 字节函数选择器
pub type Selector = [u8; 4];

/// 选择器的十六进制表示 (0x38ed1739)
pub fn selector_hex(selector: &Selector) -> String {
    format!("0x{}", hex::encode(selector))
}

/// Router 使用的 ABI 家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouterFamily {
    /// Uniswap V2 风格: 平铺参数 + address[] path
    V2Style,
    /// Uniswap V3 风格: 单个 struct 参数
    V3Style,
}

impl RouterFamily {
    pub fn name(&self) -> &'static str {
        match self {
            RouterFamily::V2Style => "V2",
            RouterFamily::V3Style => "V3",
        }
    }
}

impl fmt::Display for RouterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 保护边界参数的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    /// 最小输出 (amountOutMin / amountOutMinimum)
    MinOutput,
    /// 最大输入 (amountInMax / amountInMaximum)
    MaxInput,
}

/// Swap 函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapKind {
    /// V2: 精确输入代币
    ExactInput,
    /// V2: 精确输出代币
    ExactOutput,
    /// V2: 精确输入 ETH (msg.value)
    ExactInputWithEth,
    /// V2: 用 ETH 换精确输出，输入上限就是 msg.value
    ExactOutputWithEth,
    /// V3: 单池精确输入
    ExactInputSingle,
    /// V3: 单池精确输出
    ExactOutputSingle,
    /// V3: 多跳精确输入
    ExactInputPath,
    /// V3: 多跳精确输出
    ExactOutputPath,
}

impl SwapKind {
    pub fn bound_kind(&self) -> BoundKind {
        match self {
            SwapKind::ExactInput
            | SwapKind::ExactInputWithEth
            | SwapKind::ExactInputSingle
            | SwapKind::ExactInputPath => BoundKind::MinOutput,
            SwapKind::ExactOutput
            | SwapKind::ExactOutputWithEth
            | SwapKind::ExactOutputSingle
            | SwapKind::ExactOutputPath => BoundKind::MaxInput,
        }
    }
}

/// 已识别的 swap 调用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSwap {
    pub family: RouterFamily,
    pub selector: Selector,
}

/// 交易分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    /// 不是已知 Router 上的交易
    NotATrade,
    /// 已知 Router 上的已知 swap 函数
    KnownSwap(KnownSwap),
    /// 已知 Router，但函数无法解析
    UnknownCallToKnownRouter {
        router: Address,
        family: RouterFamily,
        selector: Selector,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_kind() {
        assert_eq!(SwapKind::ExactInput.bound_kind(), BoundKind::MinOutput);
        assert_eq!(SwapKind::ExactInputPath.bound_kind(), BoundKind::MinOutput);
        assert_eq!(SwapKind::ExactOutputSingle.bound_kind(), BoundKind::MaxInput);
        assert_eq!(SwapKind::ExactOutputWithEth.bound_kind(), BoundKind::MaxInput);
    }

    #[test]
    fn test_selector_hex() {
        assert_eq!(selector_hex(&[0x38, 0xed, 0x17, 0x39]), "0x38ed1739");
    }
}
