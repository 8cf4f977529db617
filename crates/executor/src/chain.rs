//! 链读取与签名能力
//!
//! 引擎本身不持有私钥，签名能力由钱包连接方注入。

use anyhow::Result;
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Transaction, H256, U256};
use ethers::utils::keccak256;
use std::sync::Arc;

/// 已签名的原始交易
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// RLP 编码的签名交易
    pub raw: Bytes,
    pub hash: H256,
    pub from: Address,
    pub nonce: U256,
}

/// 链读取能力
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_chain_id(&self) -> Result<u64>;

    async fn get_block_number(&self) -> Result<u64>;

    async fn get_transaction_by_hash(&self, hash: H256) -> Result<Option<Transaction>>;
}

/// 签名能力
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    /// 签名但不发送 (用于 bundle)
    async fn sign(&self, tx: &TypedTransaction) -> Result<SignedTransaction>;

    /// 签名并广播到公开 mempool
    async fn sign_and_send(&self, tx: &TypedTransaction) -> Result<H256>;
}

/// 基于 ethers Middleware 的链读取
pub struct EthersChain<M: Middleware> {
    provider: Arc<M>,
}

impl<M: Middleware + 'static> EthersChain<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for EthersChain<M> {
    async fn get_chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chainid().await?.as_u64())
    }

    async fn get_block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn get_transaction_by_hash(&self, hash: H256) -> Result<Option<Transaction>> {
        Ok(self.provider.get_transaction(hash).await?)
    }
}

/// 基于 LocalWallet 的签名器
///
/// 缺失的 nonce / gas / 费用字段由 SignerMiddleware 填充。
pub struct WalletSigner<M: Middleware> {
    client: Arc<SignerMiddleware<Arc<M>, LocalWallet>>,
}

impl<M: Middleware + 'static> WalletSigner<M> {
    pub fn new(provider: Arc<M>, wallet: LocalWallet) -> Self {
        Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
        }
    }

    /// 从私钥创建
    pub fn from_private_key(provider: Arc<M>, private_key: &str, chain_id: u64) -> Result<Self> {
        let wallet = private_key.parse::<LocalWallet>()?.with_chain_id(chain_id);
        Ok(Self::new(provider, wallet))
    }
}

#[async_trait]
impl<M: Middleware + 'static> TransactionSigner for WalletSigner<M> {
    fn address(&self) -> Address {
        self.client.address()
    }

    async fn sign(&self, tx: &TypedTransaction) -> Result<SignedTransaction> {
        let mut tx = tx.clone();
        tx.set_from(self.client.address());
        self.client.fill_transaction(&mut tx, None).await?;

        let signature = self.client.signer().sign_transaction(&tx).await?;
        let raw = tx.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        Ok(SignedTransaction {
            raw,
            hash,
            from: self.client.address(),
            nonce: tx.nonce().copied().unwrap_or_default(),
        })
    }

    async fn sign_and_send(&self, tx: &TypedTransaction) -> Result<H256> {
        let pending = self.client.send_transaction(tx.clone(), None).await?;
        Ok(pending.tx_hash())
    }
}
