//! 私密中继 bundle 提交状态机
//!
//! ```text
//! Building ──> Simulating ──> Submitting ──> AwaitingResolution ──> Included
//!    │             │              │                  ├──> ExcludedFromBlock
//!    │             v              │                  ├──> NonceAlreadyMined
//!    │      SimulationFailed      │                  │
//!    └────────────────────────────┴──────────────────┴──> RelayUnreachable
//! ```
//!
//! 每次调用只针对一个目标区块 (head + 1)，所有传输错误都收敛为闭集结果。

use anyhow::{anyhow, Result};
use ethers::types::{Transaction, U256};
use models::{SubmissionOutcome, TransactionIntent};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utils::TARGET_RELAY;

use crate::chain::{ChainReader, SignedTransaction, TransactionSigner};
use crate::relay::{Bundle, PrivateRelay, RelayResolution, SimulationOutcome, SubmissionHandle};

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    Building,
    Simulating,
    SimulationFailed,
    Submitting,
    AwaitingResolution,
    Included,
    ExcludedFromBlock,
    NonceAlreadyMined,
    RelayUnreachable,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Included
                | SubmissionState::SimulationFailed
                | SubmissionState::ExcludedFromBlock
                | SubmissionState::NonceAlreadyMined
                | SubmissionState::RelayUnreachable
        )
    }

    /// 是否允许从当前状态迁移到 `next`
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Building, Simulating)
                | (Building, RelayUnreachable)
                | (Simulating, SimulationFailed)
                | (Simulating, Submitting)
                | (Submitting, AwaitingResolution)
                | (Submitting, RelayUnreachable)
                | (AwaitingResolution, Included)
                | (AwaitingResolution, ExcludedFromBlock)
                | (AwaitingResolution, NonceAlreadyMined)
                | (AwaitingResolution, RelayUnreachable)
        )
    }
}

/// 单次提交的临时状态，不持久化
#[derive(Debug, Clone)]
pub struct BundleSubmission {
    state: SubmissionState,
    trail: Vec<SubmissionState>,
    target_block: Option<u64>,
    signed: Option<SignedTransaction>,
    simulation: Option<SimulationOutcome>,
}

impl Default for BundleSubmission {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleSubmission {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Building,
            trail: vec![SubmissionState::Building],
            target_block: None,
            signed: None,
            simulation: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn trail(&self) -> &[SubmissionState] {
        &self.trail
    }

    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal submission transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(target: TARGET_RELAY, "提交状态 {:?} -> {:?}", self.state, next);
        self.state = next;
        self.trail.push(next);
    }
}

/// 提交结果
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub outcome: SubmissionOutcome,
    /// 经过的状态 (含初始状态)
    pub trail: Vec<SubmissionState>,
    pub target_block: Option<u64>,
    /// bundle 中使用的 nonce，构建失败时为 None
    pub signed_nonce: Option<U256>,
    pub simulation: Option<SimulationOutcome>,
    /// 打包后从链上取回的交易
    pub transaction: Option<Transaction>,
}

impl SubmissionReport {
    fn finish(
        submission: BundleSubmission,
        outcome: SubmissionOutcome,
        transaction: Option<Transaction>,
    ) -> Self {
        Self {
            outcome,
            trail: submission.trail,
            target_block: submission.target_block,
            signed_nonce: submission.signed.map(|tx| tx.nonce),
            simulation: submission.simulation,
            transaction,
        }
    }

    pub fn final_state(&self) -> Option<SubmissionState> {
        self.trail.last().copied()
    }
}

/// 私密中继提交器
#[derive(Clone)]
pub struct RelaySubmitter {
    chain: Arc<dyn ChainReader>,
    signer: Arc<dyn TransactionSigner>,
    relay: Arc<dyn PrivateRelay>,
}

impl RelaySubmitter {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        signer: Arc<dyn TransactionSigner>,
        relay: Arc<dyn PrivateRelay>,
    ) -> Self {
        Self { chain, signer, relay }
    }

    /// 把交易作为单笔 bundle 提交到下一个区块
    pub async fn submit(&self, intent: &TransactionIntent) -> SubmissionReport {
        let mut submission = BundleSubmission::new();

        // Building
        let (target_block, bundle) = match self.build(intent).await {
            Ok(built) => built,
            Err(e) => {
                warn!(target: TARGET_RELAY, "构建 bundle 失败: {:?}", e);
                submission.advance(SubmissionState::RelayUnreachable);
                return SubmissionReport::finish(
                    submission,
                    SubmissionOutcome::RelayUnreachable { reason: e.to_string() },
                    None,
                );
            }
        };
        submission.target_block = Some(target_block);
        submission.signed = bundle.transactions.first().cloned();
        submission.advance(SubmissionState::Simulating);

        info!(
            target: TARGET_RELAY,
            "准备提交 bundle: {} 笔交易, 目标区块 {}",
            bundle.transactions.len(),
            target_block
        );

        // Simulating
        let simulation = match self.relay.simulate(&bundle, target_block).await {
            Ok(simulation) => simulation,
            Err(e) => SimulationOutcome::Reverted { reason: e.to_string() },
        };
        submission.simulation = Some(simulation.clone());
        if let SimulationOutcome::Reverted { reason } = simulation {
            warn!(target: TARGET_RELAY, "Bundle 模拟失败, 不提交: {}", reason);
            submission.advance(SubmissionState::SimulationFailed);
            return SubmissionReport::finish(
                submission,
                SubmissionOutcome::SimulationFailed { reason },
                None,
            );
        }
        submission.advance(SubmissionState::Submitting);

        // Submitting
        let handle = match self.relay.send_bundle(&bundle, target_block).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(target: TARGET_RELAY, "发送 bundle 失败: {:?}", e);
                submission.advance(SubmissionState::RelayUnreachable);
                return SubmissionReport::finish(
                    submission,
                    SubmissionOutcome::RelayUnreachable { reason: e.to_string() },
                    None,
                );
            }
        };
        submission.advance(SubmissionState::AwaitingResolution);

        // AwaitingResolution
        match self.relay.wait_for_resolution(&handle).await {
            Ok(RelayResolution::BundleIncluded) => {
                let transaction = self.fetch_mined(&handle).await;
                let block_number = transaction
                    .as_ref()
                    .and_then(|tx| tx.block_number)
                    .map(|n| n.as_u64())
                    .unwrap_or(handle.target_block);
                info!(
                    target: TARGET_RELAY,
                    "✅ Bundle 已打包: bundle={:?}, tx={:?}, 区块 {}",
                    handle.bundle_hash, handle.tx_hash, block_number
                );
                submission.advance(SubmissionState::Included);
                SubmissionReport::finish(
                    submission,
                    SubmissionOutcome::Included {
                        bundle_hash: handle.bundle_hash,
                        block_number,
                        tx_hash: handle.tx_hash,
                    },
                    transaction,
                )
            }
            Ok(RelayResolution::BlockPassedWithoutInclusion) => {
                info!(target: TARGET_RELAY, "Bundle 未在区块 {} 被打包", handle.target_block);
                submission.advance(SubmissionState::ExcludedFromBlock);
                SubmissionReport::finish(
                    submission,
                    SubmissionOutcome::ExcludedFromBlock {
                        target_block: handle.target_block,
                    },
                    None,
                )
            }
            Ok(RelayResolution::AccountNonceTooHigh) => {
                warn!(target: TARGET_RELAY, "nonce {} 已被其他交易使用", handle.nonce);
                submission.advance(SubmissionState::NonceAlreadyMined);
                SubmissionReport::finish(
                    submission,
                    SubmissionOutcome::NonceAlreadyMined { nonce: handle.nonce },
                    None,
                )
            }
            Err(e) => {
                warn!(target: TARGET_RELAY, "等待 bundle 结果失败: {:?}", e);
                submission.advance(SubmissionState::RelayUnreachable);
                SubmissionReport::finish(
                    submission,
                    SubmissionOutcome::RelayUnreachable { reason: e.to_string() },
                    None,
                )
            }
        }
    }

    /// 确认链 ID，确定目标区块，签名为单笔 bundle
    async fn build(&self, intent: &TransactionIntent) -> Result<(u64, Bundle)> {
        let chain_id = self.chain.get_chain_id().await?;
        if chain_id != intent.chain_id {
            return Err(anyhow!(
                "链 ID 不匹配: 连接的是 {}, 交易是 {}",
                chain_id,
                intent.chain_id
            ));
        }

        let target_block = self.chain.get_block_number().await? + 1;
        let signed = self.signer.sign(&intent.to_typed_transaction()).await?;
        debug!(
            target: TARGET_RELAY,
            "已签名: tx={:?}, from={:?}, nonce={}",
            signed.hash, signed.from, signed.nonce
        );

        Ok((target_block, Bundle::single(signed)))
    }

    async fn fetch_mined(&self, handle: &SubmissionHandle) -> Option<Transaction> {
        match self.chain.get_transaction_by_hash(handle.tx_hash).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(target: TARGET_RELAY, "获取已打包交易失败: {:?}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{swap_intent, FakeChain, FakeSigner, ScriptedRelay};
    use std::sync::atomic::Ordering;
    use SubmissionState::*;

    fn build_submitter(chain: FakeChain, signer: FakeSigner, relay: ScriptedRelay) -> (RelaySubmitter, Arc<FakeSigner>, Arc<ScriptedRelay>) {
        let signer = Arc::new(signer);
        let relay = Arc::new(relay);
        (
            RelaySubmitter::new(Arc::new(chain), signer.clone(), relay.clone()),
            signer,
            relay,
        )
    }

    #[test]
    fn test_terminal_states() {
        for state in [Included, SimulationFailed, ExcludedFromBlock, NonceAlreadyMined, RelayUnreachable] {
            assert!(state.is_terminal());
            for next in [Building, Simulating, Submitting, AwaitingResolution, Included] {
                assert!(!state.can_transition_to(next));
            }
        }
        for state in [Building, Simulating, Submitting, AwaitingResolution] {
            assert!(!state.is_terminal());
        }
        // 模拟失败不能进入提交
        assert!(!SimulationFailed.can_transition_to(Submitting));
        assert!(!Simulating.can_transition_to(RelayUnreachable));
    }

    #[tokio::test]
    async fn test_included() {
        let (submitter, _, relay) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::new(),
            ScriptedRelay::included(),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert!(report.outcome.is_included());
        assert_eq!(report.target_block, Some(101));
        assert_eq!(report.trail, vec![Building, Simulating, Submitting, AwaitingResolution, Included]);
        assert!(report.transaction.is_some());
        assert_eq!(relay.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_simulation_failure_never_submits() {
        let (submitter, _, relay) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::new(),
            ScriptedRelay::reverting("execution reverted: INSUFFICIENT_OUTPUT_AMOUNT"),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert!(matches!(report.outcome, SubmissionOutcome::SimulationFailed { .. }));
        assert_eq!(report.trail, vec![Building, Simulating, SimulationFailed]);
        assert_eq!(relay.simulated.load(Ordering::SeqCst), 1);
        assert_eq!(relay.sent.load(Ordering::SeqCst), 0);
        assert_eq!(relay.waited.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_simulation_transport_error_is_simulation_failure() {
        let (submitter, _, relay) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::new(),
            ScriptedRelay::simulation_unreachable(),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert_eq!(report.final_state(), Some(SimulationFailed));
        assert_eq!(relay.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_excluded_from_block() {
        let (submitter, _, _) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::new(),
            ScriptedRelay::resolving(RelayResolution::BlockPassedWithoutInclusion),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert_eq!(report.outcome, SubmissionOutcome::ExcludedFromBlock { target_block: 101 });
        assert_eq!(report.final_state(), Some(ExcludedFromBlock));
        assert!(report.transaction.is_none());
    }

    #[tokio::test]
    async fn test_nonce_already_mined() {
        let (submitter, _, _) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::with_nonce(42),
            ScriptedRelay::resolving(RelayResolution::AccountNonceTooHigh),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert_eq!(report.outcome, SubmissionOutcome::NonceAlreadyMined { nonce: U256::from(42) });
        assert_eq!(report.signed_nonce, Some(U256::from(42)));
    }

    #[tokio::test]
    async fn test_send_failure_is_unreachable() {
        let (submitter, _, relay) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::new(),
            ScriptedRelay::send_unreachable(),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert!(matches!(report.outcome, SubmissionOutcome::RelayUnreachable { .. }));
        assert_eq!(report.trail, vec![Building, Simulating, Submitting, RelayUnreachable]);
        assert_eq!(relay.waited.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_failure_is_unreachable() {
        let (submitter, _, _) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::new(),
            ScriptedRelay::wait_unreachable(),
        );
        let report = submitter.submit(&swap_intent()).await;

        assert_eq!(report.final_state(), Some(RelayUnreachable));
        assert_eq!(report.trail.len(), 5);
    }

    #[tokio::test]
    async fn test_building_failures() {
        // 链 ID 不匹配
        let (submitter, _, relay) = build_submitter(
            FakeChain::new(5, 100),
            FakeSigner::new(),
            ScriptedRelay::included(),
        );
        let report = submitter.submit(&swap_intent()).await;
        assert_eq!(report.trail, vec![Building, RelayUnreachable]);
        assert_eq!(relay.simulated.load(Ordering::SeqCst), 0);

        // 签名失败
        let (submitter, _, relay) = build_submitter(
            FakeChain::new(1, 100),
            FakeSigner::failing(),
            ScriptedRelay::included(),
        );
        let report = submitter.submit(&swap_intent()).await;
        assert!(matches!(report.outcome, SubmissionOutcome::RelayUnreachable { .. }));
        assert_eq!(report.signed_nonce, None);
        assert_eq!(relay.simulated.load(Ordering::SeqCst), 0);

        // 链读取失败
        let (submitter, _, _) = build_submitter(
            FakeChain::unreachable(),
            FakeSigner::new(),
            ScriptedRelay::included(),
        );
        let report = submitter.submit(&swap_intent()).await;
        assert_eq!(report.final_state(), Some(RelayUnreachable));
    }
}
