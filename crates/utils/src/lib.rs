mod logger;
pub mod time_utils;

pub use logger::{LoggerManager, TARGET_PROTECTION, TARGET_RELAY};
pub use time_utils::{unix_timestamp, unix_to_shanghai_str};
