//! Bundle 构建器
//!
//! 把引擎的 [`Bundle`] 转成 Flashbots 线上格式

use ethers::types::Bytes;

use super::types::{BundleRequest, SimulateBundleRequest};
use crate::relay::Bundle;

/// Bundle 构建器
#[derive(Debug, Clone, Default)]
pub struct BundleBuilder {
    /// 签名后的交易列表
    txs: Vec<Bytes>,
    /// 目标区块号
    target_block: u64,
}

impl BundleBuilder {
    /// 从引擎的 bundle 创建，交易顺序不变
    pub fn from_bundle(bundle: &Bundle) -> Self {
        let txs = bundle.transactions.iter().map(|tx| tx.raw.clone()).collect();
        Self {
            txs,
            ..Self::default()
        }
    }

    /// 设置目标区块号
    pub fn target_block(mut self, block: u64) -> Self {
        self.target_block = block;
        self
    }

    fn encoded_txs(&self) -> Vec<String> {
        self.txs.iter().map(|tx| format!("0x{}", hex::encode(tx))).collect()
    }

    /// 构建 eth_sendBundle 参数
    pub fn build(&self) -> BundleRequest {
        BundleRequest {
            txs: self.encoded_txs(),
            block_number: format!("0x{:x}", self.target_block),
        }
    }

    /// 构建 eth_callBundle 参数，基于 `state_block` 的状态模拟
    pub fn build_simulation(&self, state_block: u64) -> SimulateBundleRequest {
        SimulateBundleRequest {
            txs: self.encoded_txs(),
            block_number: format!("0x{:x}", self.target_block),
            state_block_number: format!("0x{:x}", state_block),
            timestamp: None,
        }
    }

    /// 获取交易数量
    pub fn tx_count(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SignedTransaction;
    use ethers::types::{Address, H256, U256};

    fn signed(raw: Vec<u8>, nonce: u64) -> SignedTransaction {
        SignedTransaction {
            raw: Bytes::from(raw),
            hash: H256::repeat_byte(0x11),
            from: Address::repeat_byte(0x22),
            nonce: U256::from(nonce),
        }
    }

    #[test]
    fn test_bundle_builder() {
        let bundle = Bundle {
            transactions: vec![signed(vec![0x01, 0x02, 0x03], 7), signed(vec![0x04, 0x05, 0x06], 8)],
        };

        let request = BundleBuilder::from_bundle(&bundle)
            .target_block(12345678)
            .build();

        assert_eq!(request.txs, vec!["0x010203".to_string(), "0x040506".to_string()]);
        assert_eq!(request.block_number, "0xbc614e");
    }

    #[test]
    fn test_from_engine_bundle() {
        let builder = BundleBuilder::from_bundle(&Bundle::single(signed(vec![0x02, 0xf8, 0x70], 7)))
            .target_block(100);
        assert_eq!(builder.tx_count(), 1);
        assert!(!builder.is_empty());

        let sim = builder.build_simulation(99);
        assert_eq!(sim.txs, vec!["0x02f870".to_string()]);
        assert_eq!(sim.block_number, "0x64");
        assert_eq!(sim.state_block_number, "0x63");
    }

    #[test]
    fn test_serialized_request_is_camel_case() {
        let request = BundleBuilder::from_bundle(&Bundle::single(signed(vec![0xaa], 0)))
            .target_block(1)
            .build();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["blockNumber"], "0x1");
        assert_eq!(json["txs"][0], "0xaa");
        assert!(json.get("revertingTxHashes").is_none());
    }
}
