//! Flashbots 类型定义

use ethers::types::{H256, U256, Bytes, Address};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 出块间隔，白名单中的链都是 12 秒一个 slot 的 PoS 以太坊
pub const SLOT_DURATION: Duration = Duration::from_secs(12);

/// 目标区块之后额外容忍的 slot 数
pub const GRACE_SLOTS: u64 = 5;

/// Flashbots 配置
#[derive(Debug, Clone)]
pub struct FlashbotsConfig {
    /// Flashbots 中继 URL
    pub relay_url: String,
    /// 链 ID
    pub chain_id: u64,
    /// Bundle 签名私钥（只用于向 Flashbots 证明身份）
    /// 为空时生成一次性身份，客户端生命周期内复用
    pub signer_key: Option<String>,
    /// 等待目标区块时的轮询间隔 (毫秒)
    pub poll_interval_ms: u64,
}

impl Default for FlashbotsConfig {
    fn default() -> Self {
        Self {
            // 以太坊主网 Flashbots 中继
            relay_url: "https://relay.flashbots.net".to_string(),
            chain_id: 1,
            signer_key: None,
            poll_interval_ms: 1000,
        }
    }
}

impl FlashbotsConfig {
    /// 获取对应链的 Flashbots 中继 URL，不在白名单中的链返回 None
    pub fn relay_url_for_chain(chain_id: u64) -> Option<&'static str> {
        match chain_id {
            1 => Some("https://relay.flashbots.net"),                  // 以太坊主网
            5 => Some("https://relay-goerli.flashbots.net"),           // Goerli 测试网
            11155111 => Some("https://relay-sepolia.flashbots.net"),   // Sepolia 测试网
            _ => None,
        }
    }

    /// 链头从 `current_block` 走到 `target_block` 的最长等待
    ///
    /// 按剩余区块数加 [`GRACE_SLOTS`] 个 slot 计算，超过即视为节点卡住
    pub fn block_wait_ceiling(current_block: u64, target_block: u64) -> Duration {
        let slots = target_block
            .saturating_sub(current_block)
            .saturating_add(GRACE_SLOTS);
        SLOT_DURATION.saturating_mul(u32::try_from(slots).unwrap_or(u32::MAX))
    }

    /// 为指定链创建配置
    pub fn for_chain(chain_id: u64) -> Option<Self> {
        Self::relay_url_for_chain(chain_id).map(|url| Self {
            relay_url: url.to_string(),
            chain_id,
            ..Self::default()
        })
    }
}

/// 该链是否有私密中继
pub fn relay_supported(chain_id: u64) -> bool {
    FlashbotsConfig::relay_url_for_chain(chain_id).is_some()
}

/// Bundle 请求参数
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRequest {
    /// 签名后的交易列表（十六进制字符串）
    pub txs: Vec<String>,
    /// 目标区块号（十六进制）
    pub block_number: String,
}

/// Bundle 模拟请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateBundleRequest {
    /// 签名后的交易列表
    pub txs: Vec<String>,
    /// 目标区块号
    pub block_number: String,
    /// 用于模拟的状态区块号
    pub state_block_number: String,
    /// 模拟时间戳（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Bundle 发送响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBundleResponse {
    /// Bundle 哈希
    #[serde(default)]
    pub bundle_hash: H256,
}

/// Bundle 模拟响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateBundleResponse {
    /// 模拟结果列表
    #[serde(default)]
    pub results: Vec<SimulationResult>,
    /// coinbase 收益差（验证者收益）
    #[serde(default)]
    pub coinbase_diff: U256,
    /// 总 gas 使用
    #[serde(default)]
    pub total_gas_used: u64,
    /// 状态区块号
    #[serde(default)]
    pub state_block_number: u64,
}

impl SimulateBundleResponse {
    /// 第一笔失败交易的错误信息
    ///
    /// revert 为空 (0x) 表示成功，只有非空的 revert 才是失败
    pub fn first_failure(&self) -> Option<String> {
        self.results.iter().find_map(|result| {
            let has_revert = result.revert.as_ref().map(|r| !r.is_empty()).unwrap_or(false);
            if result.error.is_some() || has_revert {
                Some(
                    result
                        .error
                        .clone()
                        .or_else(|| result.revert.as_ref().map(|r| format!("{:?}", r)))
                        .unwrap_or_else(|| "Unknown error".to_string()),
                )
            } else {
                None
            }
        })
    }
}

/// 单笔交易模拟结果
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// 交易哈希
    #[serde(default)]
    pub tx_hash: H256,
    /// gas 使用量
    #[serde(default)]
    pub gas_used: u64,
    /// 发送者
    #[serde(default)]
    pub from_address: Address,
    /// 接收者
    #[serde(default)]
    pub to_address: Option<Address>,
    /// 错误信息（如果有）
    #[serde(default)]
    pub error: Option<String>,
    /// 回滚原因（如果有）
    #[serde(default)]
    pub revert: Option<Bytes>,
}

/// Bundle 状态查询响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStatsResponse {
    /// 是否已经被模拟
    #[serde(default)]
    pub is_simulated: bool,
    /// 是否已经被提交给验证者
    #[serde(default)]
    pub is_sent_to_miners: bool,
    /// 第一次模拟时间
    #[serde(default)]
    pub simulated_at: Option<String>,
    /// 提交给验证者的时间
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// JSON-RPC 请求
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<T: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: T,
}

impl<T: Serialize> JsonRpcRequest<T> {
    pub fn new(method: &'static str, params: T) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }
}

/// JSON-RPC 响应
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 错误
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_allow_list() {
        assert_eq!(
            FlashbotsConfig::relay_url_for_chain(1),
            Some("https://relay.flashbots.net")
        );
        assert_eq!(
            FlashbotsConfig::relay_url_for_chain(11155111),
            Some("https://relay-sepolia.flashbots.net")
        );
        assert!(relay_supported(5));
        assert!(!relay_supported(56));
        assert!(FlashbotsConfig::for_chain(137).is_none());
    }

    #[test]
    fn test_block_wait_ceiling() {
        // 下一个区块: 1 + 5 个 slot
        assert_eq!(
            FlashbotsConfig::block_wait_ceiling(99, 100),
            Duration::from_secs(72)
        );
        // 已经到达目标区块只剩宽限
        assert_eq!(
            FlashbotsConfig::block_wait_ceiling(100, 100),
            SLOT_DURATION * GRACE_SLOTS as u32
        );
        assert_eq!(
            FlashbotsConfig::block_wait_ceiling(0, u64::MAX),
            SLOT_DURATION.saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_simulation_failure_detection() {
        let ok: SimulateBundleResponse = serde_json::from_str(
            r#"{"results":[{"gasUsed":21000,"revert":"0x"}],"totalGasUsed":21000}"#,
        )
        .unwrap();
        assert_eq!(ok.first_failure(), None);
        assert_eq!(ok.total_gas_used, 21000);

        let reverted: SimulateBundleResponse = serde_json::from_str(
            r#"{"results":[{"gasUsed":50000,"error":"execution reverted","revert":"0x08c379a0"}]}"#,
        )
        .unwrap();
        assert_eq!(reverted.first_failure(), Some("execution reverted".to_string()));
    }

    #[test]
    fn test_json_rpc_error_response() {
        let response: JsonRpcResponse<SendBundleResponse> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"unable to decode txs"}}"#,
        )
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32000);
    }
}
