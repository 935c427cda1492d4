//! 显示边界
//!
//! 记录总是被解码，但只有在 [`DisplayFlag`] 打开时才交给 [`RecordSink`]。
//! 开关由输入线程写、生命周期线程读，两者之间没有其他共享状态。

use crossbeam_channel::Sender;
use racebox_protocol::Record;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 显示开关（原子版本，用于线程间共享）
///
/// 仅决定是否渲染，不影响帧重组和解码的正确性，因此使用 Relaxed 即可。
#[derive(Debug, Clone, Default)]
pub struct DisplayFlag {
    inner: Arc<AtomicBool>,
}

impl DisplayFlag {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.inner.store(enabled, Ordering::Relaxed);
    }

    /// 翻转开关，返回翻转后的值
    pub fn toggle(&self) -> bool {
        !self.inner.fetch_xor(true, Ordering::Relaxed)
    }
}

/// 显示节流：两次显示之间的最小间隔
///
/// 对应设备配置中的采样/显示频率。间隔为零时不节流。
#[derive(Debug, Clone)]
pub struct DisplayThrottle {
    interval: Duration,
    last_shown: Option<Instant>,
}

impl DisplayThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_shown: None,
        }
    }

    /// 由频率（Hz）构造；0 Hz 表示不节流
    pub fn from_rate_hz(rate_hz: u32) -> Self {
        if rate_hz == 0 {
            Self::new(Duration::ZERO)
        } else {
            Self::new(Duration::from_secs(1) / rate_hz)
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 当前时刻是否允许显示（允许时记录时间）
    pub fn should_show(&mut self, now: Instant) -> bool {
        match self.last_shown {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_shown = Some(now);
                true
            },
        }
    }
}

impl Default for DisplayThrottle {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

/// 记录接收端（终端渲染、通道转发等）
pub trait RecordSink: Send {
    fn show(&mut self, record: &Record);
}

impl<F> RecordSink for F
where
    F: FnMut(Record) + Send,
{
    fn show(&mut self, record: &Record) {
        self(*record)
    }
}

impl RecordSink for Sender<Record> {
    fn show(&mut self, record: &Record) {
        // 接收端已关闭时丢弃
        let _ = self.try_send(*record);
    }
}
