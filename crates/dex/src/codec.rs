//! Calldata 编解码器
//!
//! 针对已注册的 swap 选择器做纯结构化的 ABI 编解码，不做地址或业务校验。
//! Tuple 布局的 struct 字段会被展开，与平铺参数使用同一套下标。
//!
//! 解码会重新编码并与原始字节比较，所以任何被接受的输入都满足
//! `encode(decode(data)) == data`。

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Bytes, U256};
use models::{selector_hex, Selector};
use std::sync::Arc;
use thiserror::Error;

use crate::selectors::{ArgLayout, SelectorRegistry, SwapShape};

/// 编解码错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Unknown selector: {}", selector_hex(.0))]
    UnknownSelector(Selector),

    #[error("Malformed calldata: {0}")]
    Malformed(String),
}

/// 解码后的调用
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCall {
    pub selector: Selector,
    pub args: Vec<Token>,
}

impl DecodedCall {
    /// 读取无符号整数参数
    pub fn uint(&self, index: usize) -> Option<U256> {
        match self.args.get(index) {
            Some(Token::Uint(value)) => Some(*value),
            _ => None,
        }
    }

    /// 替换无符号整数参数，返回是否替换成功
    pub fn set_uint(&mut self, index: usize, value: U256) -> bool {
        match self.args.get_mut(index) {
            Some(slot @ Token::Uint(_)) => {
                *slot = Token::Uint(value);
                true
            }
            _ => false,
        }
    }
}

/// Calldata 编解码器
#[derive(Debug, Clone)]
pub struct CalldataCodec {
    registry: Arc<SelectorRegistry>,
}

impl CalldataCodec {
    pub fn new(registry: Arc<SelectorRegistry>) -> Self {
        Self { registry }
    }

    /// 使用标准选择器注册表
    pub fn standard() -> Self {
        Self::new(SelectorRegistry::standard())
    }

    pub fn registry(&self) -> &SelectorRegistry {
        &self.registry
    }

    pub fn shape(&self, selector: &Selector) -> Result<&SwapShape, CodecError> {
        self.registry
            .get(selector)
            .ok_or(CodecError::UnknownSelector(*selector))
    }

    /// 解码完整 calldata (包含 4 字节选择器)
    pub fn decode(&self, selector: &Selector, data: &[u8]) -> Result<DecodedCall, CodecError> {
        let shape = self.shape(selector)?;

        if data.len() < 4 {
            return Err(CodecError::Malformed(format!(
                "calldata is {} bytes, shorter than a selector",
                data.len()
            )));
        }
        if data[..4] != selector[..] {
            return Err(CodecError::Malformed(format!(
                "calldata selector 0x{} does not match {}",
                hex::encode(&data[..4]),
                selector_hex(selector)
            )));
        }

        let body = &data[4..];
        if body.len() % 32 != 0 {
            return Err(CodecError::Malformed(format!(
                "argument section is {} bytes, not a multiple of 32",
                body.len()
            )));
        }

        let args = match shape.layout {
            ArgLayout::Flat => abi::decode(&shape.params, body)
                .map_err(|e| CodecError::Malformed(e.to_string()))?,
            ArgLayout::Tuple => {
                let mut tokens = abi::decode(&[ParamType::Tuple(shape.params.clone())], body)
                    .map_err(|e| CodecError::Malformed(e.to_string()))?;
                match tokens.pop() {
                    Some(Token::Tuple(fields)) if tokens.is_empty() => fields,
                    _ => return Err(CodecError::Malformed("expected a single struct argument".to_string())),
                }
            }
        };

        let call = DecodedCall {
            selector: *selector,
            args,
        };

        // 非规范编码 (多余字节、脏 padding、非常规 offset) 一律拒绝
        let reencoded = self.encode(&call)?;
        if reencoded.as_ref() != data {
            return Err(CodecError::Malformed("non-canonical ABI encoding".to_string()));
        }

        Ok(call)
    }

    /// 编码调用，参数类型必须与注册的形状一致
    pub fn encode(&self, call: &DecodedCall) -> Result<Bytes, CodecError> {
        let shape = self.shape(&call.selector)?;

        if !Token::types_check(&call.args, &shape.params) {
            return Err(CodecError::Malformed(format!(
                "arguments do not match {}",
                shape.signature
            )));
        }

        let body = match shape.layout {
            ArgLayout::Flat => abi::encode(&call.args),
            ArgLayout::Tuple => abi::encode(&[Token::Tuple(call.args.clone())]),
        };

        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&call.selector);
        out.extend_from_slice(&body);
        Ok(Bytes::from(out))
    }
}
