//! Swap 函数选择器注册表
//!
//! 每个选择器对应一个固定的调用形状 (参数类型、布局、边界参数和 deadline 的位置)。
//! 选择器由规范签名计算得出 (keccak256(signature)[..4])。

use ethers::abi::ParamType;
use ethers::utils::id;
use models::{RouterFamily, Selector, SwapKind};
use std::collections::HashMap;
use std::sync::Arc;

/// 参数布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLayout {
    /// 平铺参数 (V2 Router)
    Flat,
    /// 单个 struct 参数 (V3 Router)，字段按顺序展开
    Tuple,
}

/// 调用形状
#[derive(Debug, Clone)]
pub struct SwapShape {
    /// 规范签名
    pub signature: &'static str,
    /// 可读名称
    pub name: &'static str,
    pub family: RouterFamily,
    pub kind: SwapKind,
    pub layout: ArgLayout,
    /// 参数类型 (Tuple 布局时为 struct 字段)
    pub params: Vec<ParamType>,
    /// 保护边界参数位置 (amountOutMin / amountInMax)
    pub bound_index: Option<usize>,
    /// deadline 参数位置
    pub deadline_index: Option<usize>,
}

impl SwapShape {
    pub fn selector(&self) -> Selector {
        id(self.signature)
    }
}

lazy_static::lazy_static! {
    static ref STANDARD: Arc<SelectorRegistry> = Arc::new(SelectorRegistry::build_standard());
}

fn uint() -> ParamType {
    ParamType::Uint(256)
}

fn path() -> ParamType {
    ParamType::Array(Box::new(ParamType::Address))
}

/// V2 Router: (uint amount, uint bound, address[] path, address to, uint deadline)
fn v2_two_amounts(signature: &'static str, name: &'static str, kind: SwapKind) -> SwapShape {
    SwapShape {
        signature,
        name,
        family: RouterFamily::V2Style,
        kind,
        layout: ArgLayout::Flat,
        params: vec![uint(), uint(), path(), ParamType::Address, uint()],
        bound_index: Some(1),
        deadline_index: Some(4),
    }
}

/// V2 Router ETH 输入: (uint amount, address[] path, address to, uint deadline)
fn v2_eth_in(signature: &'static str, name: &'static str, kind: SwapKind, bound_index: Option<usize>) -> SwapShape {
    SwapShape {
        signature,
        name,
        family: RouterFamily::V2Style,
        kind,
        layout: ArgLayout::Flat,
        params: vec![uint(), path(), ParamType::Address, uint()],
        bound_index,
        deadline_index: Some(3),
    }
}

/// V3 单池: (tokenIn, tokenOut, fee, recipient, [deadline], amount, bound, sqrtPriceLimitX96)
fn v3_single(signature: &'static str, name: &'static str, kind: SwapKind, with_deadline: bool) -> SwapShape {
    let mut params = vec![
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(24),
        ParamType::Address,
    ];
    if with_deadline {
        params.push(uint());
    }
    params.extend([uint(), uint(), ParamType::Uint(160)]);

    let offset = if with_deadline { 1 } else { 0 };
    SwapShape {
        signature,
        name,
        family: RouterFamily::V3Style,
        kind,
        layout: ArgLayout::Tuple,
        params,
        bound_index: Some(5 + offset),
        deadline_index: with_deadline.then_some(4),
    }
}

/// V3 多跳: (bytes path, recipient, [deadline], amount, bound)
fn v3_path(signature: &'static str, name: &'static str, kind: SwapKind, with_deadline: bool) -> SwapShape {
    let mut params = vec![ParamType::Bytes, ParamType::Address];
    if with_deadline {
        params.push(uint());
    }
    params.extend([uint(), uint()]);

    let offset = if with_deadline { 1 } else { 0 };
    SwapShape {
        signature,
        name,
        family: RouterFamily::V3Style,
        kind,
        layout: ArgLayout::Tuple,
        params,
        bound_index: Some(3 + offset),
        deadline_index: with_deadline.then_some(2),
    }
}

/// 选择器注册表
#[derive(Debug, Clone, Default)]
pub struct SelectorRegistry {
    shapes: HashMap<Selector, SwapShape>,
}

impl SelectorRegistry {
    /// 标准注册表 (进程内共享)
    pub fn standard() -> Arc<Self> {
        STANDARD.clone()
    }

    fn build_standard() -> Self {
        let shapes = vec![
            // ===== Uniswap V2 Router02 及其分叉 =====
            v2_two_amounts(
                "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)",
                "swapExactTokensForTokens",
                SwapKind::ExactInput,
            ),
            v2_two_amounts(
                "swapTokensForExactTokens(uint256,uint256,address[],address,uint256)",
                "swapTokensForExactTokens",
                SwapKind::ExactOutput,
            ),
            v2_eth_in(
                "swapExactETHForTokens(uint256,address[],address,uint256)",
                "swapExactETHForTokens",
                SwapKind::ExactInputWithEth,
                Some(0),
            ),
            v2_two_amounts(
                "swapTokensForExactETH(uint256,uint256,address[],address,uint256)",
                "swapTokensForExactETH",
                SwapKind::ExactOutput,
            ),
            v2_two_amounts(
                "swapExactTokensForETH(uint256,uint256,address[],address,uint256)",
                "swapExactTokensForETH",
                SwapKind::ExactInput,
            ),
            // 输入上限是 msg.value，calldata 中没有边界参数
            v2_eth_in(
                "swapETHForExactTokens(uint256,address[],address,uint256)",
                "swapETHForExactTokens",
                SwapKind::ExactOutputWithEth,
                None,
            ),
            v2_two_amounts(
                "swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256,uint256,address[],address,uint256)",
                "swapExactTokensForTokensSupportingFeeOnTransferTokens",
                SwapKind::ExactInput,
            ),
            v2_eth_in(
                "swapExactETHForTokensSupportingFeeOnTransferTokens(uint256,address[],address,uint256)",
                "swapExactETHForTokensSupportingFeeOnTransferTokens",
                SwapKind::ExactInputWithEth,
                Some(0),
            ),
            v2_two_amounts(
                "swapExactTokensForETHSupportingFeeOnTransferTokens(uint256,uint256,address[],address,uint256)",
                "swapExactTokensForETHSupportingFeeOnTransferTokens",
                SwapKind::ExactInput,
            ),
            // ===== Uniswap V3 SwapRouter =====
            v3_single(
                "exactInputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))",
                "exactInputSingle",
                SwapKind::ExactInputSingle,
                true,
            ),
            v3_path(
                "exactInput((bytes,address,uint256,uint256,uint256))",
                "exactInput",
                SwapKind::ExactInputPath,
                true,
            ),
            v3_single(
                "exactOutputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))",
                "exactOutputSingle",
                SwapKind::ExactOutputSingle,
                true,
            ),
            v3_path(
                "exactOutput((bytes,address,uint256,uint256,uint256))",
                "exactOutput",
                SwapKind::ExactOutputPath,
                true,
            ),
            // ===== Uniswap V3 SwapRouter02 (struct 中没有 deadline) =====
            v3_single(
                "exactInputSingle((address,address,uint24,address,uint256,uint256,uint160))",
                "exactInputSingle (SwapRouter02)",
                SwapKind::ExactInputSingle,
                false,
            ),
            v3_path(
                "exactInput((bytes,address,uint256,uint256))",
                "exactInput (SwapRouter02)",
                SwapKind::ExactInputPath,
                false,
            ),
            v3_single(
                "exactOutputSingle((address,address,uint24,address,uint256,uint256,uint160))",
                "exactOutputSingle (SwapRouter02)",
                SwapKind::ExactOutputSingle,
                false,
            ),
            v3_path(
                "exactOutput((bytes,address,uint256,uint256))",
                "exactOutput (SwapRouter02)",
                SwapKind::ExactOutputPath,
                false,
            ),
        ];

        let mut registry = Self::default();
        for shape in shapes {
            registry.register(shape);
        }
        registry
    }

    /// 注册一个调用形状
    pub fn register(&mut self, shape: SwapShape) {
        self.shapes.insert(shape.selector(), shape);
    }

    pub fn get(&self, selector: &Selector) -> Option<&SwapShape> {
        self.shapes.get(selector)
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.shapes.contains_key(selector)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Selector, &SwapShape)> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
