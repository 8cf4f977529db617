use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 滑点容忍度超出 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Slippage tolerance must be within 0..=100 percent, got {0}")]
pub struct SlippageOutOfRange(pub u8);

/// 滑点容忍度 (百分比, 0-100)
///
/// 只能通过 [`SlippageTolerance::new`] 构造，后续使用方拿到的值总是合法的。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlippageTolerance(u8);

impl SlippageTolerance {
    pub const MAX_PERCENT: u8 = 100;

    pub fn new(percent: u8) -> Result<Self, SlippageOutOfRange> {
        if percent > Self::MAX_PERCENT {
            return Err(SlippageOutOfRange(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for SlippageTolerance {
    type Error = SlippageOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlippageTolerance> for u8 {
    fn from(value: SlippageTolerance) -> Self {
        value.0
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        assert_eq!(SlippageTolerance::new(0).unwrap().percent(), 0);
        assert_eq!(SlippageTolerance::new(100).unwrap().percent(), 100);
        assert_eq!(SlippageTolerance::new(101), Err(SlippageOutOfRange(101)));
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let ok: SlippageTolerance = serde_json::from_str("5").unwrap();
        assert_eq!(ok.percent(), 5);
        assert!(serde_json::from_str::<SlippageTolerance>("150").is_err());
    }
}
