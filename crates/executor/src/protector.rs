//! MEV 保护编排
//!
//! 钱包发出的每笔交易都经过 [`Protector::protect`]:
//!
//! 1. 保护关闭 → 原样广播
//! 2. 不是 DEX 交易 → 原样广播
//! 3. 已知 Router 上无法识别的调用 → 原样广播，并附带提示
//! 4. 已知 swap → 按容忍度收紧滑点边界、刷新 deadline
//! 5. 中继可用 → 走私密 bundle，未打包则带着改写后的 calldata 回退到公开广播

use ethers::types::U256;
use models::{
    Advisory, SubmissionOutcome, SubmissionRoute, TradeKind, TransactionHandle, TransactionIntent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utils::TARGET_PROTECTION;

use config_crate::ProtectionConfig;
use dex::{DexClassifier, SlippageRewriter};

use crate::chain::{ChainReader, TransactionSigner};
use crate::flashbots::relay_supported;
use crate::relay::PrivateRelay;
use crate::submitter::RelaySubmitter;
use crate::types::ProtectError;

/// MEV 保护引擎
pub struct Protector {
    config: ProtectionConfig,
    classifier: DexClassifier,
    rewriter: SlippageRewriter,
    chain: Arc<dyn ChainReader>,
    signer: Arc<dyn TransactionSigner>,
    relay: Option<Arc<dyn PrivateRelay>>,
}

impl Protector {
    /// 使用默认 Router 和标准选择器创建，不带中继
    pub fn new(
        config: ProtectionConfig,
        chain: Arc<dyn ChainReader>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        Self {
            config,
            classifier: DexClassifier::standard(),
            rewriter: SlippageRewriter::standard(),
            chain,
            signer,
            relay: None,
        }
    }

    /// 接入私密中继
    pub fn with_relay(mut self, relay: Arc<dyn PrivateRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn config(&self) -> &ProtectionConfig {
        &self.config
    }

    pub fn signer_address(&self) -> ethers::types::Address {
        self.signer.address()
    }

    /// 对交易分类
    pub fn classify(&self, intent: &TransactionIntent) -> TradeKind {
        self.classifier.classify(intent.chain_id, intent.to, &intent.data)
    }

    /// 保护并发送交易
    pub async fn protect(&self, intent: &TransactionIntent) -> Result<TransactionHandle, ProtectError> {
        if !self.config.enabled {
            debug!(target: TARGET_PROTECTION, "保护已关闭, 原样广播");
            return self.broadcast(intent, false, Vec::new()).await;
        }

        let swap = match self.classify(intent) {
            TradeKind::NotATrade => {
                debug!(target: TARGET_PROTECTION, "非 DEX 交易, 原样广播");
                return self.broadcast(intent, false, Vec::new()).await;
            }
            TradeKind::UnknownCallToKnownRouter { router, family, selector } => {
                let advisory = Advisory::UnrecognizedRouterCall { router, family, selector };
                warn!(target: TARGET_PROTECTION, "⚠️ {}", advisory);
                return self.broadcast(intent, false, vec![advisory]).await;
            }
            TradeKind::KnownSwap(swap) => swap,
        };

        let rewritten = self
            .rewriter
            .rewrite(&swap, &intent.data, self.config.slippage_tolerance)
            .map_err(|e| {
                warn!(target: TARGET_PROTECTION, "滑点改写失败, 不发送: {}", e);
                ProtectError::RewriteFailed(e)
            })?;

        info!(
            target: TARGET_PROTECTION,
            "🛡️ {} swap 已保护: {:?} {} -> {} (容忍度 {}), deadline={:?}",
            swap.family,
            rewritten.bound_kind,
            rewritten.original_bound,
            rewritten.new_bound,
            self.config.slippage_tolerance,
            rewritten.deadline
        );

        let protected = intent.with_data(rewritten.data);

        let relay = match &self.relay {
            Some(relay) if self.config.use_relay && relay_supported(intent.chain_id) => relay.clone(),
            _ => {
                debug!(
                    target: TARGET_PROTECTION,
                    "链 {} 不走私密中继, 公开广播", intent.chain_id
                );
                return self.broadcast(&protected, true, Vec::new()).await;
            }
        };

        let submitter = RelaySubmitter::new(self.chain.clone(), self.signer.clone(), relay);
        let report = submitter.submit(&protected).await;

        if let SubmissionOutcome::Included { bundle_hash, block_number, tx_hash } = report.outcome {
            info!(
                target: TARGET_PROTECTION,
                "✅ 私密中继打包成功: tx={:?}, 区块 {}", tx_hash, block_number
            );
            return Ok(TransactionHandle {
                tx_hash,
                route: SubmissionRoute::Relay { bundle_hash, block_number },
                calldata_rewritten: true,
                transaction: report.transaction,
                advisories: Vec::new(),
            });
        }

        let mut advisories = Vec::new();
        if let SubmissionOutcome::NonceAlreadyMined { nonce } = &report.outcome {
            advisories.push(Advisory::StaleIntent { nonce: *nonce });
        }
        warn!(
            target: TARGET_PROTECTION,
            "私密中继未成功 ({}), 回退到公开广播", report.outcome
        );
        advisories.insert(0, Advisory::RelayFallback { outcome: report.outcome });

        // 回退沿用 bundle 中的 nonce
        let fallback = match report.signed_nonce {
            Some(nonce) => protected.clone().with_nonce(nonce),
            None => protected,
        };
        self.broadcast(&fallback, true, advisories).await
    }

    /// 交易是否已经受到保护 (不做任何 I/O)
    pub fn is_protected(&self, intent: &TransactionIntent) -> bool {
        self.is_protected_at(intent, utils::unix_timestamp())
    }

    /// 以给定的 unix 时间判断
    pub fn is_protected_at(&self, intent: &TransactionIntent, now: u64) -> bool {
        intent_is_protected(&self.classifier, &self.rewriter, intent, now)
    }

    async fn broadcast(
        &self,
        intent: &TransactionIntent,
        calldata_rewritten: bool,
        advisories: Vec<Advisory>,
    ) -> Result<TransactionHandle, ProtectError> {
        match self.signer.sign_and_send(&intent.to_typed_transaction()).await {
            Ok(tx_hash) => {
                info!(target: TARGET_PROTECTION, "📤 已公开广播: {:?}", tx_hash);
                Ok(TransactionHandle::public(tx_hash, calldata_rewritten).with_advisories(advisories))
            }
            Err(e) => {
                warn!(target: TARGET_PROTECTION, "广播失败: {:?}", e);
                Err(ProtectError::BroadcastFailed {
                    reason: e.to_string(),
                    advisories,
                })
            }
        }
    }
}

/// 交易是否已经受到保护: EIP-1559 费用对齐全，或者是边界非零、deadline
/// 未过期的已知 swap
pub fn intent_is_protected(
    classifier: &DexClassifier,
    rewriter: &SlippageRewriter,
    intent: &TransactionIntent,
    now: u64,
) -> bool {
    if intent.fees.is_relay_style() {
        return true;
    }

    let TradeKind::KnownSwap(swap) = classifier.classify(intent.chain_id, intent.to, &intent.data) else {
        return false;
    };

    match rewriter.inspect(&swap, &intent.data) {
        Ok(inspection) => {
            let fresh = inspection
                .deadline
                .map(|deadline| deadline > U256::from(now))
                .unwrap_or(true);
            !inspection.bound.is_zero() && fresh
        }
        Err(_) => false,
    }
}
