//! 测试用的链、签名器和中继替身

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Transaction, H256, U256, U64};
use ethers::utils::{id, keccak256};
use models::TransactionIntent;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::chain::{ChainReader, SignedTransaction, TransactionSigner};
use crate::relay::{Bundle, PrivateRelay, RelayResolution, SimulationOutcome, SubmissionHandle};

/// 以太坊主网 Uniswap V2 Router02
pub fn uniswap_v2_router() -> Address {
    "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".parse().unwrap()
}

/// swapExactTokensForTokens calldata
pub fn exact_in_calldata(amount_out_min: u64, deadline: u64) -> Bytes {
    let selector = id("swapExactTokensForTokens(uint256,uint256,address[],address,uint256)");
    let args = abi::encode(&[
        Token::Uint(U256::from(10u64).pow(U256::from(18))),
        Token::Uint(U256::from(amount_out_min)),
        Token::Array(vec![
            Token::Address(Address::repeat_byte(0xaa)),
            Token::Address(Address::repeat_byte(0xbb)),
        ]),
        Token::Address(Address::repeat_byte(0xcc)),
        Token::Uint(U256::from(deadline)),
    ]);
    let mut data = selector.to_vec();
    data.extend(args);
    data.into()
}

/// 主网上一笔已知 swap，最小输出 1_000_000
pub fn swap_intent() -> TransactionIntent {
    TransactionIntent::call(1, uniswap_v2_router(), exact_in_calldata(1_000_000, 1_700_000_000))
}

/// 链读取替身
pub struct FakeChain {
    chain_id: u64,
    head: u64,
    unreachable: bool,
    pub reads: AtomicUsize,
}

impl FakeChain {
    pub fn new(chain_id: u64, head: u64) -> Self {
        Self {
            chain_id,
            head,
            unreachable: false,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(1, 0)
        }
    }

    fn check(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn get_chain_id(&self) -> Result<u64> {
        self.check()?;
        Ok(self.chain_id)
    }

    async fn get_block_number(&self) -> Result<u64> {
        self.check()?;
        Ok(self.head)
    }

    async fn get_transaction_by_hash(&self, hash: H256) -> Result<Option<Transaction>> {
        self.check()?;
        Ok(Some(Transaction {
            hash,
            block_number: Some(U64::from(self.head + 1)),
            ..Transaction::default()
        }))
    }
}

/// 签名器替身，记录每一笔广播的交易
pub struct FakeSigner {
    address: Address,
    nonce: U256,
    fail_sign: bool,
    fail_broadcast: bool,
    pub signed: Mutex<Vec<TypedTransaction>>,
    pub broadcasts: Mutex<Vec<TypedTransaction>>,
}

impl FakeSigner {
    pub fn new() -> Self {
        Self::with_nonce(7)
    }

    /// 账户下一个 nonce 为 `nonce`
    pub fn with_nonce(nonce: u64) -> Self {
        Self {
            address: Address::repeat_byte(0x42),
            nonce: U256::from(nonce),
            fail_sign: false,
            fail_broadcast: false,
            signed: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_sign: true,
            fail_broadcast: true,
            ..Self::new()
        }
    }

    pub fn failing_broadcast() -> Self {
        Self {
            fail_broadcast: true,
            ..Self::new()
        }
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().len()
    }

    /// 广播过的 calldata
    pub fn broadcast_data(&self) -> Vec<Bytes> {
        self.broadcasts
            .lock()
            .iter()
            .map(|tx| tx.data().cloned().unwrap_or_default())
            .collect()
    }

    fn tx_hash(tx: &TypedTransaction) -> H256 {
        H256::from(keccak256(tx.data().map(|d| d.to_vec()).unwrap_or_default()))
    }
}

impl Default for FakeSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, tx: &TypedTransaction) -> Result<SignedTransaction> {
        if self.fail_sign {
            return Err(anyhow!("wallet locked"));
        }
        self.signed.lock().push(tx.clone());
        Ok(SignedTransaction {
            raw: tx.data().cloned().unwrap_or_default(),
            hash: Self::tx_hash(tx),
            from: self.address,
            nonce: tx.nonce().copied().unwrap_or(self.nonce),
        })
    }

    async fn sign_and_send(&self, tx: &TypedTransaction) -> Result<H256> {
        if self.fail_broadcast {
            return Err(anyhow!("nonce too low"));
        }
        self.broadcasts.lock().push(tx.clone());
        Ok(Self::tx_hash(tx))
    }
}

/// 按脚本返回结果的中继替身
pub struct ScriptedRelay {
    /// None 表示传输错误
    simulation: Option<SimulationOutcome>,
    send_ok: bool,
    /// None 表示传输错误
    resolution: Option<RelayResolution>,
    pub simulated: AtomicUsize,
    pub sent: AtomicUsize,
    pub waited: AtomicUsize,
    pub bundles: Mutex<Vec<Bundle>>,
}

impl ScriptedRelay {
    fn script(
        simulation: Option<SimulationOutcome>,
        send_ok: bool,
        resolution: Option<RelayResolution>,
    ) -> Self {
        Self {
            simulation,
            send_ok,
            resolution,
            simulated: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
            waited: AtomicUsize::new(0),
            bundles: Mutex::new(Vec::new()),
        }
    }

    fn success() -> Option<SimulationOutcome> {
        Some(SimulationOutcome::Success { gas_used: 120_000 })
    }

    pub fn resolving(resolution: RelayResolution) -> Self {
        Self::script(Self::success(), true, Some(resolution))
    }

    pub fn included() -> Self {
        Self::resolving(RelayResolution::BundleIncluded)
    }

    pub fn reverting(reason: &str) -> Self {
        Self::script(
            Some(SimulationOutcome::Reverted { reason: reason.to_string() }),
            true,
            Some(RelayResolution::BundleIncluded),
        )
    }

    pub fn simulation_unreachable() -> Self {
        Self::script(None, true, Some(RelayResolution::BundleIncluded))
    }

    pub fn send_unreachable() -> Self {
        Self::script(Self::success(), false, Some(RelayResolution::BundleIncluded))
    }

    pub fn wait_unreachable() -> Self {
        Self::script(Self::success(), true, None)
    }

    pub fn total_calls(&self) -> usize {
        self.simulated.load(Ordering::SeqCst)
            + self.sent.load(Ordering::SeqCst)
            + self.waited.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrivateRelay for ScriptedRelay {
    async fn simulate(&self, _bundle: &Bundle, _target_block: u64) -> Result<SimulationOutcome> {
        self.simulated.fetch_add(1, Ordering::SeqCst);
        self.simulation.clone().ok_or_else(|| anyhow!("relay timeout"))
    }

    async fn send_bundle(&self, bundle: &Bundle, target_block: u64) -> Result<SubmissionHandle> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if !self.send_ok {
            return Err(anyhow!("503 Service Unavailable"));
        }
        self.bundles.lock().push(bundle.clone());
        let first = bundle
            .transactions
            .first()
            .ok_or_else(|| anyhow!("empty bundle"))?;
        Ok(SubmissionHandle {
            bundle_hash: H256::repeat_byte(0xb0),
            target_block,
            tx_hash: first.hash,
            signer: first.from,
            nonce: first.nonce,
        })
    }

    async fn wait_for_resolution(&self, _handle: &SubmissionHandle) -> Result<RelayResolution> {
        self.waited.fetch_add(1, Ordering::SeqCst);
        self.resolution.ok_or_else(|| anyhow!("relay timeout"))
    }
}
