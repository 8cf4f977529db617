use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, U256};
use serde::{Deserialize, Serialize};

/// 交易费用字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeeFields {
    /// 未设置，由签名方填充
    #[default]
    Unset,
    /// Legacy gas price
    Legacy { gas_price: U256 },
    /// EIP-1559 费用对
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl FeeFields {
    /// 两个 EIP-1559 费用字段都存在且非零
    pub fn is_relay_style(&self) -> bool {
        match self {
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => !max_fee_per_gas.is_zero() && !max_priority_fee_per_gas.is_zero(),
            _ => false,
        }
    }
}

/// 调用方希望发送的未签名交易
///
/// 引擎从不修改调用方持有的副本，只会派生新的 intent。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub chain_id: u64,
    pub from: Option<Address>,
    /// `None` 表示合约创建
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
    #[serde(default)]
    pub fees: FeeFields,
    pub gas_limit: Option<U256>,
    pub nonce: Option<U256>,
}

impl TransactionIntent {
    /// 创建一笔调用 `to` 的交易
    pub fn call(chain_id: u64, to: Address, data: Bytes) -> Self {
        Self {
            chain_id,
            from: None,
            to: Some(to),
            data,
            value: U256::zero(),
            fees: FeeFields::Unset,
            gas_limit: None,
            nonce: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_fees(mut self, fees: FeeFields) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// 派生一个只替换 calldata 的新 intent
    pub fn with_data(&self, data: Bytes) -> Self {
        Self {
            data,
            ..self.clone()
        }
    }

    /// calldata 的 4 字节函数选择器
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }

    /// 转换为 ethers 的 TypedTransaction
    ///
    /// 费用未设置时生成 EIP-1559 请求，由 middleware 填充。
    pub fn to_typed_transaction(&self) -> TypedTransaction {
        match self.fees {
            FeeFields::Legacy { gas_price } => {
                let mut tx = TransactionRequest::new()
                    .value(self.value)
                    .data(self.data.clone())
                    .chain_id(self.chain_id)
                    .gas_price(gas_price);
                if let Some(to) = self.to {
                    tx = tx.to(to);
                }
                if let Some(from) = self.from {
                    tx = tx.from(from);
                }
                if let Some(gas) = self.gas_limit {
                    tx = tx.gas(gas);
                }
                if let Some(nonce) = self.nonce {
                    tx = tx.nonce(nonce);
                }
                tx.into()
            }
            FeeFields::Eip1559 { .. } | FeeFields::Unset => {
                let mut tx = Eip1559TransactionRequest::new()
                    .value(self.value)
                    .data(self.data.clone())
                    .chain_id(self.chain_id);
                if let FeeFields::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                } = self.fees
                {
                    tx = tx
                        .max_fee_per_gas(max_fee_per_gas)
                        .max_priority_fee_per_gas(max_priority_fee_per_gas);
                }
                if let Some(to) = self.to {
                    tx = tx.to(to);
                }
                if let Some(from) = self.from {
                    tx = tx.from(from);
                }
                if let Some(gas) = self.gas_limit {
                    tx = tx.gas(gas);
                }
                if let Some(nonce) = self.nonce {
                    tx = tx.nonce(nonce);
                }
                tx.into()
            }
        }
    }
}
