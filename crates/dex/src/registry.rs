//! DEX Router 注册表
//!
//! chain id -> 已知 Router 地址及其 ABI 家族。构造时填充，之后只读。

use ethers::types::Address;
use models::RouterFamily;
use std::collections::HashMap;
use std::str::FromStr;

/// Uniswap V2 / V3 Router 地址 (Ethereum Mainnet)
pub mod ethereum_routers {
    use super::*;

    lazy_static::lazy_static! {
        /// Uniswap V2 Router02
        pub static ref UNISWAP_V2_ROUTER: Address = Address::from_str("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D").unwrap();
        /// SushiSwap Router
        pub static ref SUSHISWAP_ROUTER: Address = Address::from_str("0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F").unwrap();
        /// Uniswap V3 SwapRouter
        pub static ref UNISWAP_V3_SWAP_ROUTER: Address = Address::from_str("0xE592427A0AEce92De3Edee1F18E0157C05861564").unwrap();
        /// Uniswap V3 SwapRouter02
        pub static ref UNISWAP_V3_SWAP_ROUTER_02: Address = Address::from_str("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45").unwrap();
    }
}

/// 默认 Router 表: (chain_id, 地址, 家族, 名称)
const DEFAULT_ROUTERS: &[(u64, &str, RouterFamily, &str)] = &[
    // Ethereum
    (1, "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", RouterFamily::V2Style, "Uniswap V2 Router02"),
    (1, "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F", RouterFamily::V2Style, "SushiSwap Router"),
    (1, "0xE592427A0AEce92De3Edee1F18E0157C05861564", RouterFamily::V3Style, "Uniswap V3 SwapRouter"),
    (1, "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45", RouterFamily::V3Style, "Uniswap V3 SwapRouter02"),
    // BSC
    (56, "0x10ED43C718714eb63d5aA57B78B54704E256024E", RouterFamily::V2Style, "PancakeSwap V2 Router"),
    (56, "0x1b81D678ffb9C0263b24A97847620C99d213eB14", RouterFamily::V3Style, "PancakeSwap V3 SwapRouter"),
    // Polygon
    (137, "0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff", RouterFamily::V2Style, "QuickSwap Router"),
    (137, "0xE592427A0AEce92De3Edee1F18E0157C05861564", RouterFamily::V3Style, "Uniswap V3 SwapRouter"),
    // Arbitrum
    (42161, "0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506", RouterFamily::V2Style, "SushiSwap Router"),
    (42161, "0xE592427A0AEce92De3Edee1F18E0157C05861564", RouterFamily::V3Style, "Uniswap V3 SwapRouter"),
    // Base
    (8453, "0x2626664c2603336E57B271c5C0b26F421741e481", RouterFamily::V3Style, "Uniswap V3 SwapRouter02"),
    // Sepolia
    (11155111, "0x3bFA4769FB09eeFC5a80d6E87c3B9C650f7Ae48E", RouterFamily::V3Style, "Uniswap V3 SwapRouter02"),
];

/// Router 信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterEntry {
    pub address: Address,
    pub family: RouterFamily,
    pub name: String,
}

/// Router 注册表
#[derive(Debug, Clone, Default)]
pub struct RouterRegistry {
    chains: HashMap<u64, HashMap<Address, RouterEntry>>,
}

impl RouterRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含主流链默认 Router 的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (chain_id, address, family, name) in DEFAULT_ROUTERS {
            // 常量表中的地址都是合法的
            if let Ok(address) = Address::from_str(address) {
                registry.insert(*chain_id, address, *family, name);
            }
        }
        registry
    }

    /// 追加一个 Router (构造阶段使用)
    pub fn with_router(mut self, chain_id: u64, address: Address, family: RouterFamily, name: &str) -> Self {
        self.insert(chain_id, address, family, name);
        self
    }

    fn insert(&mut self, chain_id: u64, address: Address, family: RouterFamily, name: &str) {
        self.chains.entry(chain_id).or_default().insert(
            address,
            RouterEntry {
                address,
                family,
                name: name.to_string(),
            },
        );
    }

    /// 查找某条链上的 Router
    pub fn lookup(&self, chain_id: u64, address: &Address) -> Option<&RouterEntry> {
        self.chains.get(&chain_id)?.get(address)
    }

    /// 某条链上的所有 Router
    pub fn routers_for(&self, chain_id: u64) -> Vec<&RouterEntry> {
        self.chains
            .get(&chain_id)
            .map(|routers| routers.values().collect())
            .unwrap_or_default()
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
