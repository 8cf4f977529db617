use std::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, fmt, Layer};
use tracing_subscriber::filter::{LevelFilter, FilterFn};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_appender::{non_blocking, rolling};
use time::macros::offset;

/// 保护决策日志 target
pub const TARGET_PROTECTION: &str = "mev_protection";
/// 中继通信日志 target
pub const TARGET_RELAY: &str = "relay";

/// 日志管理器 - 基于target分类的日志系统
pub struct LoggerManager {
    _guards: Vec<non_blocking::WorkerGuard>,
}

impl LoggerManager {
    /// 初始化日志系统
    ///
    /// 日志分类：
    /// - app.log: 通用应用日志
    /// - protection.log: 交易分类 / 滑点改写 / 回退决策
    /// - relay.log: 私密中继 bundle 模拟、提交、打包结果
    pub fn init() -> Self {
        Self::init_in("logs")
    }

    /// 在指定目录初始化日志系统
    pub fn init_in(dir: &str) -> Self {
        let mut guards = Vec::new();

        fs::create_dir_all(dir).ok();

        // 配置时区为东八区 (UTC+8 上海时间)
        let timer = OffsetTime::new(
            offset!(+8),
            time::format_description::well_known::Rfc3339,
        );

        // 1. 控制台输出 - INFO 级别
        let console_layer = fmt::layer()
            .compact()
            .with_target(true)
            .with_timer(timer.clone())
            .with_filter(LevelFilter::INFO);

        // 2. 通用应用日志 (app.log)
        let (app_writer, app_guard) = non_blocking(rolling::daily(dir, "app.log"));
        guards.push(app_guard);

        let app_layer = fmt::layer()
            .compact()
            .with_writer(app_writer)
            .with_ansi(false)
            .with_target(true)
            .with_timer(timer.clone())
            .with_filter(LevelFilter::INFO)
            .with_filter(FilterFn::new(|metadata| {
                !matches!(metadata.target(), TARGET_PROTECTION | TARGET_RELAY)
            }));

        // 3. 保护决策日志 (protection.log) - 包含 DEBUG
        let (protection_writer, protection_guard) = non_blocking(rolling::daily(dir, "protection.log"));
        guards.push(protection_guard);

        let protection_layer = fmt::layer()
            .compact()
            .with_writer(protection_writer)
            .with_ansi(false)
            .with_target(true)
            .with_timer(timer.clone())
            .with_filter(FilterFn::new(|metadata| {
                metadata.target() == TARGET_PROTECTION
            }));

        // 4. 中继日志 (relay.log) - 包含 DEBUG 请求体
        let (relay_writer, relay_guard) = non_blocking(rolling::daily(dir, "relay.log"));
        guards.push(relay_guard);

        let relay_layer = fmt::layer()
            .compact()
            .with_writer(relay_writer)
            .with_ansi(false)
            .with_target(true)
            .with_timer(timer)
            .with_filter(FilterFn::new(|metadata| {
                metadata.target() == TARGET_RELAY
            }));

        // 初始化tracing订阅器
        tracing_subscriber::registry()
            .with(console_layer)
            .with(app_layer)
            .with(protection_layer)
            .with(relay_layer)
            .init();

        Self { _guards: guards }
    }
}
