//! 驱动层错误类型定义

use racebox_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误（扫描、连接、订阅、链路断开）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 通知通道已关闭（对端断开）
    #[error("Notification channel closed")]
    ChannelClosed,

    /// 流式传输期间超过 `stream_idle_timeout` 未收到数据
    #[error("No data received for {0:?}")]
    IdleTimeout(Duration),

    /// 生命周期线程错误（启动失败或 panic）
    #[error("Lifecycle thread error: {0}")]
    LifecycleThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use racebox_transport::TransportError;
    use std::time::Duration;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Transport(TransportError::Timeout);
        assert_eq!(
            driver_error.to_string(),
            "Transport error: Operation timeout"
        );

        assert_eq!(
            DriverError::ChannelClosed.to_string(),
            "Notification channel closed"
        );
        assert_eq!(
            DriverError::IdleTimeout(Duration::from_secs(2)).to_string(),
            "No data received for 2s"
        );

        let msg = DriverError::LifecycleThread("panicked".to_string()).to_string();
        assert!(msg.contains("Lifecycle thread") && msg.contains("panicked"));
    }

    #[test]
    fn test_from_transport_error() {
        let driver_error: DriverError = TransportError::Disconnected.into();
        match driver_error {
            DriverError::Transport(e) => assert!(matches!(e, TransportError::Disconnected)),
            _ => panic!("Expected Transport variant"),
        }
    }
}
