//! 日志初始化
//!
//! `tracing_subscriber::fmt` + `EnvFilter`；`RUST_LOG` 优先，否则使用配置里的级别。
//! `log` 宏产生的记录经由 tracing 的 log 桥接一并输出。

use tracing_subscriber::EnvFilter;

/// 安装全局订阅器；重复调用（例如测试中）静默忽略
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("[Logging] 订阅器已存在，跳过初始化");
    }
}
