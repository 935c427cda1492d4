//! 生命周期状态、事件与结果

use racebox_transport::DeviceInfo;
use std::fmt;
use std::time::Duration;

/// 连接生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Scanning,
    Connecting,
    Configuring,
    Streaming,
    Disconnected,
    /// 终止状态：重试次数耗尽
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Configuring => "configuring",
            Self::Streaming => "streaming",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 生命周期事件（观察者通道）
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    DeviceFound(DeviceInfo),
    /// MTU 协商结果（None 表示平台不支持）
    MtuNegotiated(Option<u16>),
    /// 进入退避等待
    Backoff {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
}

/// 生命周期线程的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// 外部取消（唯一不经过重试的退出路径）
    Cancelled,
    /// 连续失败次数超过上限
    Failed { attempts: u32, last_error: String },
}

impl fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed {
                attempts,
                last_error,
            } => write!(f, "failed after {} attempts: {}", attempts, last_error),
        }
    }
}
