//! 数据流性能指标
//!
//! 提供零开销的原子计数器，可以在任何线程读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 数据流实时指标
///
/// # 使用示例
///
/// ```rust
/// use racebox_driver::StreamMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(StreamMetrics::default());
/// metrics.frames_assembled.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.frames_assembled, 1);
/// ```
#[derive(Debug, Default)]
pub struct StreamMetrics {
    /// 收到的原始字节数
    pub bytes_received: AtomicU64,
    /// 重组前被丢弃的噪声字节数
    pub bytes_discarded: AtomicU64,
    /// 重组出的完整帧数
    pub frames_assembled: AtomicU64,
    /// 解码失败（格式错误或超出范围）的帧数
    pub frames_rejected: AtomicU64,
    /// 成功解码的记录数
    pub records_decoded: AtomicU64,
    /// 交给显示端的记录数
    pub records_displayed: AtomicU64,
    /// 连接尝试次数
    pub connect_attempts: AtomicU64,
    /// 退避次数
    pub backoffs: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取所有计数器的快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            frames_assembled: self.frames_assembled.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            records_displayed: self.records_displayed.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            backoffs: self.backoffs.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub bytes_discarded: u64,
    pub frames_assembled: u64,
    pub frames_rejected: u64,
    pub records_decoded: u64,
    pub records_displayed: u64,
    pub connect_attempts: u64,
    pub backoffs: u64,
}

impl MetricsSnapshot {
    /// 解码失败率（百分比）；没有帧时返回 0.0
    pub fn reject_rate(&self) -> f64 {
        if self.frames_assembled == 0 {
            return 0.0;
        }
        (self.frames_rejected as f64 / self.frames_assembled as f64) * 100.0
    }

    /// 噪声字节占比（百分比）；没有数据时返回 0.0
    pub fn noise_rate(&self) -> f64 {
        if self.bytes_received == 0 {
            return 0.0;
        }
        (self.bytes_discarded as f64 / self.bytes_received as f64) * 100.0
    }
}
