//! DEX 交易分类器
//!
//! 两步判断: `to` 是否是当前链上的已知 Router，calldata 的选择器是否是已知 swap。

use ethers::types::Address;
use models::{KnownSwap, Selector, TradeKind};
use std::sync::Arc;
use tracing::debug;

use crate::registry::RouterRegistry;
use crate::selectors::SelectorRegistry;

/// DEX 交易分类器
#[derive(Debug, Clone)]
pub struct DexClassifier {
    routers: Arc<RouterRegistry>,
    selectors: Arc<SelectorRegistry>,
}

impl DexClassifier {
    pub fn new(routers: Arc<RouterRegistry>, selectors: Arc<SelectorRegistry>) -> Self {
        Self { routers, selectors }
    }

    /// 默认 Router + 标准选择器
    pub fn standard() -> Self {
        Self::new(Arc::new(RouterRegistry::with_defaults()), SelectorRegistry::standard())
    }

    pub fn routers(&self) -> &RouterRegistry {
        &self.routers
    }

    pub fn selectors(&self) -> &SelectorRegistry {
        &self.selectors
    }

    /// 对交易分类，从不失败
    pub fn classify(&self, chain_id: u64, to: Option<Address>, data: &[u8]) -> TradeKind {
        let Some(to) = to else {
            return TradeKind::NotATrade;
        };
        let Some(router) = self.routers.lookup(chain_id, &to) else {
            return TradeKind::NotATrade;
        };
        if data.len() < 4 {
            return TradeKind::NotATrade;
        }

        let selector: Selector = [data[0], data[1], data[2], data[3]];
        match self.selectors.get(&selector) {
            Some(shape) if shape.family == router.family => {
                debug!("识别到 {} swap: {} @ {}", router.family, shape.name, router.name);
                TradeKind::KnownSwap(KnownSwap {
                    family: router.family,
                    selector,
                })
            }
            _ => TradeKind::UnknownCallToKnownRouter {
                router: to,
                family: router.family,
                selector,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::v2_exact_in_calldata;
    use crate::registry::ethereum_routers;
    use ethers::utils::id;
    use models::RouterFamily;

    #[test]
    fn test_known_swap_on_v2_router() {
        let classifier = DexClassifier::standard();
        let router: Address = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".parse().unwrap();
        let data = v2_exact_in_calldata(1_000_000, 1_700_000_000);

        assert_eq!(
            classifier.classify(1, Some(router), &data),
            TradeKind::KnownSwap(KnownSwap {
                family: RouterFamily::V2Style,
                selector: [0x38, 0xed, 0x17, 0x39],
            })
        );
    }

    #[test]
    fn test_unregistered_selector_on_known_router() {
        let classifier = DexClassifier::standard();
        let router = *ethereum_routers::UNISWAP_V2_ROUTER;
        // addLiquidity 不是 swap
        let data = id("addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)").to_vec();

        assert_eq!(
            classifier.classify(1, Some(router), &data),
            TradeKind::UnknownCallToKnownRouter {
                router,
                family: RouterFamily::V2Style,
                selector: [data[0], data[1], data[2], data[3]],
            }
        );
    }

    #[test]
    fn test_selector_from_other_family_is_not_known_swap() {
        let classifier = DexClassifier::standard();
        let router = *ethereum_routers::UNISWAP_V3_SWAP_ROUTER;
        let data = v2_exact_in_calldata(1_000_000, 1_700_000_000);

        assert!(matches!(
            classifier.classify(1, Some(router), &data),
            TradeKind::UnknownCallToKnownRouter { family: RouterFamily::V3Style, .. }
        ));
    }

    #[test]
    fn test_not_a_trade() {
        let classifier = DexClassifier::standard();
        let data = v2_exact_in_calldata(1_000_000, 1_700_000_000);
        let router = *ethereum_routers::UNISWAP_V2_ROUTER;

        // 无关地址
        assert_eq!(
            classifier.classify(1, Some(Address::repeat_byte(0x77)), &data),
            TradeKind::NotATrade
        );
        // 合约创建
        assert_eq!(classifier.classify(1, None, &data), TradeKind::NotATrade);
        // 没有 calldata (直接转 ETH)
        assert_eq!(classifier.classify(1, Some(router), &[]), TradeKind::NotATrade);
        assert_eq!(classifier.classify(1, Some(router), &[0x38, 0xed]), TradeKind::NotATrade);
        // 其他链
        assert_eq!(classifier.classify(56, Some(router), &data), TradeKind::NotATrade);
    }
}
