//! Flashbots 中继客户端
//!
//! 负责与 Flashbots 中继通信: 模拟、提交 bundle，等待目标区块结果

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::{BlockId, BlockNumber, H256};
use ethers::utils::keccak256;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use ::utils::TARGET_RELAY;

use super::bundle::BundleBuilder;
use super::types::*;
use crate::relay::{Bundle, PrivateRelay, RelayResolution, SimulationOutcome, SubmissionHandle};

/// Flashbots 中继客户端
pub struct FlashbotsRelay<M: Middleware> {
    config: FlashbotsConfig,
    http_client: Client,
    /// 用于查询区块和账户 nonce
    provider: Arc<M>,
    /// Bundle 签名钱包（只用于向 Flashbots 证明身份，不签署交易）
    identity: LocalWallet,
}

impl<M: Middleware + 'static> FlashbotsRelay<M> {
    /// 创建中继客户端
    ///
    /// 没有配置 signer_key 时生成一次性身份，在客户端生命周期内复用。
    pub fn new(config: FlashbotsConfig, provider: Arc<M>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let identity = match &config.signer_key {
            Some(key) => key.parse::<LocalWallet>()?,
            None => LocalWallet::new(&mut ethers::core::rand::thread_rng()),
        }
        .with_chain_id(config.chain_id);

        info!(
            target: TARGET_RELAY,
            "🔒 Flashbots 中继初始化: relay_url={}, chain_id={}, 身份={:?}",
            config.relay_url, config.chain_id, identity.address()
        );

        Ok(Self {
            config,
            http_client,
            provider,
            identity,
        })
    }

    /// 获取配置
    pub fn config(&self) -> &FlashbotsConfig {
        &self.config
    }

    /// 中继身份地址
    pub fn identity(&self) -> Address {
        self.identity.address()
    }

    /// 获取 Bundle 状态
    async fn get_bundle_stats(&self, bundle_hash: H256, block_number: u64) -> Result<BundleStatsResponse> {
        #[derive(serde::Serialize)]
        struct Params {
            #[serde(rename = "bundleHash")]
            bundle_hash: String,
            #[serde(rename = "blockNumber")]
            block_number: String,
        }

        let request = JsonRpcRequest::new(
            "flashbots_getBundleStats",
            vec![Params {
                bundle_hash: format!("{:?}", bundle_hash),
                block_number: format!("0x{:x}", block_number),
            }],
        );

        self.send_signed_request::<BundleStatsResponse>(&request).await
    }

    /// 生成 X-Flashbots-Signature 头
    ///
    /// Flashbots 要求: signMessage(keccak256(body).toHex())，即对 body 哈希的
    /// 十六进制字符串做 EIP-191 签名，格式为 {signer_address}:{signature}
    async fn signature_header(&self, body: &str) -> Result<String> {
        let body_hash = keccak256(body.as_bytes());
        let hash_hex = format!("0x{}", hex::encode(body_hash));
        let signature = self.identity.sign_message(hash_hex.as_bytes()).await?;

        // r (32) + s (32) + v (1)，v 必须是 27 或 28
        let mut sig_bytes = signature.to_vec();
        if sig_bytes.len() == 65 && sig_bytes[64] < 27 {
            sig_bytes[64] += 27;
        }

        let signer_addr = format!("0x{}", hex::encode(self.identity.address().as_bytes()));
        Ok(format!("{}:0x{}", signer_addr, hex::encode(&sig_bytes)))
    }

    /// 发送签名的请求到 Flashbots 中继
    async fn send_signed_request<T: serde::de::DeserializeOwned + Default>(
        &self,
        request: &JsonRpcRequest<impl serde::Serialize>,
    ) -> Result<T> {
        let body = serde_json::to_string(request)?;
        let auth_header = self.signature_header(&body).await?;

        debug!(target: TARGET_RELAY, "📡 {} -> {}", request.method, self.config.relay_url);
        debug!(target: TARGET_RELAY, "📤 请求体: {}", body);

        let response = self
            .http_client
            .post(&self.config.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", auth_header)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        debug!(target: TARGET_RELAY, "📥 Flashbots 响应 [{}]: {}", status, text);

        if !status.is_success() {
            return Err(anyhow!("Flashbots 请求失败: {} - {}", status, text));
        }

        let json_response: JsonRpcResponse<T> = serde_json::from_str(&text)?;

        if let Some(error) = json_response.error {
            return Err(anyhow!("Flashbots RPC 错误: {} - {}", error.code, error.message));
        }

        json_response.result.ok_or_else(|| anyhow!("Flashbots 响应中没有 result"))
    }

    /// 轮询直到链头到达目标区块
    ///
    /// 最长等待按第一次读到的链头和出块间隔计算
    async fn wait_for_block(&self, target_block: u64) -> Result<()> {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let started = tokio::time::Instant::now();
        let mut ceiling = None;

        loop {
            let current_block = self.provider.get_block_number().await?.as_u64();
            if current_block >= target_block {
                return Ok(());
            }
            let limit = *ceiling.get_or_insert_with(|| {
                FlashbotsConfig::block_wait_ceiling(current_block, target_block)
            });
            if started.elapsed() >= limit {
                return Err(anyhow!(
                    "等待区块 {} 超时 (当前 {})",
                    target_block,
                    current_block
                ));
            }

            debug!(target: TARGET_RELAY, "等待区块 {} (当前 {})", target_block, current_block);
            tokio::time::sleep(poll).await;
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> PrivateRelay for FlashbotsRelay<M> {
    async fn simulate(&self, bundle: &Bundle, target_block: u64) -> Result<SimulationOutcome> {
        let state_block = target_block.saturating_sub(1);
        let sim_request = BundleBuilder::from_bundle(bundle)
            .target_block(target_block)
            .build_simulation(state_block);

        let request = JsonRpcRequest::new("eth_callBundle", vec![sim_request]);
        let response = self.send_signed_request::<SimulateBundleResponse>(&request).await?;

        if let Some(reason) = response.first_failure() {
            warn!(target: TARGET_RELAY, "Bundle 模拟失败: {}", reason);
            return Ok(SimulationOutcome::Reverted { reason });
        }

        debug!(
            target: TARGET_RELAY,
            "Bundle 模拟成功: gas_used={}, coinbase_diff={}",
            response.total_gas_used, response.coinbase_diff
        );
        Ok(SimulationOutcome::Success {
            gas_used: response.total_gas_used,
        })
    }

    async fn send_bundle(&self, bundle: &Bundle, target_block: u64) -> Result<SubmissionHandle> {
        let first = bundle
            .transactions
            .first()
            .ok_or_else(|| anyhow!("空 bundle"))?;

        let bundle_request = BundleBuilder::from_bundle(bundle)
            .target_block(target_block)
            .build();
        let request = JsonRpcRequest::new("eth_sendBundle", vec![bundle_request]);
        let response = self.send_signed_request::<SendBundleResponse>(&request).await?;

        info!(
            target: TARGET_RELAY,
            "Bundle 已发送: {:?}, 目标区块 {}",
            response.bundle_hash, target_block
        );

        Ok(SubmissionHandle {
            bundle_hash: response.bundle_hash,
            target_block,
            tx_hash: first.hash,
            signer: first.from,
            nonce: first.nonce,
        })
    }

    async fn wait_for_resolution(&self, handle: &SubmissionHandle) -> Result<RelayResolution> {
        self.wait_for_block(handle.target_block).await?;

        // 统计信息只用于日志
        match self.get_bundle_stats(handle.bundle_hash, handle.target_block).await {
            Ok(stats) => debug!(target: TARGET_RELAY, "Bundle 状态: {:?}", stats),
            Err(e) => debug!(target: TARGET_RELAY, "获取 Bundle 状态失败: {:?}", e),
        }

        // 按交易哈希确认，而不是看区块里有没有交易
        if let Some(tx) = self.provider.get_transaction(handle.tx_hash).await? {
            if tx.block_number.is_some() {
                info!(
                    target: TARGET_RELAY,
                    "✅ Bundle {:?} 已打包: tx={:?}, 区块 {:?}",
                    handle.bundle_hash, handle.tx_hash, tx.block_number
                );
                return Ok(RelayResolution::BundleIncluded);
            }
        }

        let block = BlockId::Number(BlockNumber::Number(handle.target_block.into()));
        let mined_nonce = self
            .provider
            .get_transaction_count(handle.signer, Some(block))
            .await?;
        if mined_nonce > handle.nonce {
            warn!(
                target: TARGET_RELAY,
                "账户 {:?} nonce 已推进到 {} (bundle nonce {})",
                handle.signer, mined_nonce, handle.nonce
            );
            return Ok(RelayResolution::AccountNonceTooHigh);
        }

        info!(
            target: TARGET_RELAY,
            "Bundle {:?} 未在区块 {} 被打包",
            handle.bundle_hash, handle.target_block
        );
        Ok(RelayResolution::BlockPassedWithoutInclusion)
    }
}
