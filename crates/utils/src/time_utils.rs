//! 时间工具模块
//!
//! 提供 unix 时间戳和上海时区格式化

use chrono::{TimeZone, Utc};
use chrono_tz::Asia::Shanghai;

/// 当前 unix 时间戳 (秒)
pub fn unix_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// 将 unix 时间戳 (如交易 deadline) 格式化为上海时间
pub fn unix_to_shanghai_str(timestamp: u64) -> String {
    let utc = i64::try_from(timestamp)
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    match utc {
        Some(utc) => utc.with_timezone(&Shanghai).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{} (invalid)", timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_timestamp_is_recent() {
        // 2024-01-01 之后
        assert!(unix_timestamp() > 1_704_067_200);
    }

    #[test]
    fn test_unix_to_shanghai_str() {
        // 1970-01-01 00:00:00 UTC = 08:00 上海
        assert_eq!(unix_to_shanghai_str(0), "1970-01-01 08:00:00");
        assert!(unix_to_shanghai_str(u64::MAX).contains("invalid"));
    }

    #[test]
    fn test_unix_to_shanghai_str_crosses_date() {
        // 2023-12-31 16:00:00 UTC
        assert_eq!(unix_to_shanghai_str(1_704_038_400), "2024-01-01 00:00:00");
        assert_eq!(unix_to_shanghai_str(1_704_038_399), "2023-12-31 23:59:59");
    }
}
