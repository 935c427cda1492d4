//! 生命周期配置
//!
//! 所有参数在启动时读取一次，运行期间不变。

use racebox_protocol::DecoderConfig;
use std::time::Duration;

/// 默认设备名称前缀（RaceBox Mini / Mini S / Micro）
pub const DEFAULT_NAME_PREFIXES: [&str; 3] = ["RaceBox Mini ", "RaceBox Mini S ", "RaceBox Micro "];

/// 重试策略：线性、固定延迟、有界次数
///
/// 每次失败都先退避 `retry_delay`，失败累计到 `max_retries` 次后进入 Failed，
/// 因此 `max_retries = N` 恰好产生 N 次退避。计数器在整个生命周期内累计，
/// 成功进入 Streaming 也不会清零。`max_retries = 0` 时首次失败即进入 Failed，不退避。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// 累计 `failures` 次失败后是否应放弃
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_retries
    }
}

/// 连接生命周期配置
///
/// # Example
///
/// ```
/// use racebox_driver::LifecycleConfig;
/// use std::time::Duration;
///
/// let config = LifecycleConfig {
///     scan_interval: Duration::from_millis(500),
///     ..LifecycleConfig::default()
/// };
/// assert_eq!(config.desired_mtu, 247);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// 设备名称前缀，任一匹配即可
    pub name_prefixes: Vec<String>,
    /// 两次扫描之间的间隔
    pub scan_interval: Duration,
    /// 连接超时
    pub connect_timeout: Duration,
    /// 期望的 MTU（尽力协商）
    pub desired_mtu: u16,
    /// 重试策略
    pub retry: RetryPolicy,
    /// Streaming 状态下无数据超过该时长视为链路丢失；None 表示不检测
    pub stream_idle_timeout: Option<Duration>,
    /// 两次显示之间的最小间隔（零表示每条记录都显示）
    pub display_interval: Duration,
    /// 解码器配置
    pub decoder: DecoderConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            name_prefixes: DEFAULT_NAME_PREFIXES.iter().map(|s| s.to_string()).collect(),
            scan_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            desired_mtu: 247,
            retry: RetryPolicy::default(),
            stream_idle_timeout: None,
            display_interval: Duration::ZERO,
            decoder: DecoderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.scan_interval, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_secs(5));
        assert_eq!(config.name_prefixes.len(), 3);
        assert!(config.stream_idle_timeout.is_none());
        assert!(!config.decoder.verify_checksum);
    }

    #[test]
    fn test_retry_bound() {
        let policy = RetryPolicy {
            max_retries: 2,
            retry_delay: Duration::ZERO,
        };
        assert!(!policy.is_exhausted(1));
        assert!(policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));

        let none = RetryPolicy {
            max_retries: 0,
            retry_delay: Duration::ZERO,
        };
        assert!(none.is_exhausted(1));
    }
}
