//! 钱包事件
//!
//! 账户切换、链切换以消息的形式通过 broadcast 通道送达。引擎的持有者
//! 收到消息后重建 [`Protector`] 并替换，正在执行的 `protect()` 继续使用
//! 它开始时拿到的实例。

use ethers::types::Address;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use utils::TARGET_PROTECTION;

use crate::protector::Protector;

/// 钱包事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEvent {
    AccountChanged(Address),
    ChainChanged(u64),
    Disconnected,
}

/// 当前生效的 Protector
#[derive(Default)]
pub struct ProtectorSlot {
    inner: RwLock<Option<Arc<Protector>>>,
}

impl ProtectorSlot {
    pub fn new(protector: Protector) -> Self {
        Self {
            inner: RwLock::new(Some(Arc::new(protector))),
        }
    }

    /// 钱包未连接
    pub fn empty() -> Self {
        Self::default()
    }

    /// 当前实例，调用方持有期间不受替换影响
    pub fn current(&self) -> Option<Arc<Protector>> {
        self.inner.read().clone()
    }

    /// 替换实例，返回旧的
    pub fn replace(&self, protector: Option<Protector>) -> Option<Arc<Protector>> {
        let next = protector.map(Arc::new);
        std::mem::replace(&mut *self.inner.write(), next)
    }
}

/// 消费钱包事件，直到通道关闭
///
/// `rebuild` 根据事件构造新的 Protector，返回 None 表示钱包不可用。
pub async fn run_wallet_events<F>(
    mut rx: broadcast::Receiver<WalletEvent>,
    slot: Arc<ProtectorSlot>,
    mut rebuild: F,
) where
    F: FnMut(&WalletEvent) -> Option<Protector>,
{
    loop {
        match rx.recv().await {
            Ok(event) => {
                info!(target: TARGET_PROTECTION, "钱包事件: {:?}", event);
                let next = match event {
                    WalletEvent::Disconnected => None,
                    _ => rebuild(&event),
                };
                slot.replace(next);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(target: TARGET_PROTECTION, "钱包事件积压, 跳过 {} 条", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChain, FakeSigner};
    use config_crate::ProtectionConfig;

    fn protector_for(chain_id: u64) -> Protector {
        Protector::new(
            ProtectionConfig::default(),
            Arc::new(FakeChain::new(chain_id, 100)),
            Arc::new(FakeSigner::new()),
        )
    }

    #[test]
    fn test_slot_replace_keeps_old_handles_alive() {
        let slot = ProtectorSlot::new(protector_for(1));
        let in_flight = slot.current().unwrap();

        let old = slot.replace(Some(protector_for(5)));

        assert!(Arc::ptr_eq(&old.unwrap(), &in_flight));
        assert!(!Arc::ptr_eq(&slot.current().unwrap(), &in_flight));
    }

    #[tokio::test]
    async fn test_wallet_events_swap_protector() {
        let (tx, rx) = broadcast::channel(8);
        let slot = Arc::new(ProtectorSlot::new(protector_for(1)));
        let original = slot.current().unwrap();

        let task = tokio::spawn(run_wallet_events(rx, slot.clone(), |event| match event {
            WalletEvent::ChainChanged(chain_id) => Some(protector_for(*chain_id)),
            _ => Some(protector_for(1)),
        }));

        tx.send(WalletEvent::ChainChanged(11155111)).unwrap();
        tx.send(WalletEvent::Disconnected).unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(slot.current().is_none());
        // 旧实例仍然可用
        assert!(original.config().enabled);
    }
}
