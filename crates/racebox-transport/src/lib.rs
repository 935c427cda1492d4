//! # RaceBox Transport Layer
//!
//! 传输层抽象：设备发现、会话建立、数据通知订阅。
//!
//! 连接生命周期（`racebox-driver`）只依赖本 crate 的 trait，
//! 具体链路（BLE、TCP 桥接、文件回放）可以自由替换。
//!
//! ```text
//! Transport::discover() ──► DeviceInfo
//! Transport::connect()  ──► Session
//! Session::subscribe()  ──► Receiver<Notification>  (任意大小的字节分片)
//! ```

use bytes::Bytes;
use crossbeam_channel::Receiver;
use std::time::Duration;
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod replay;
pub mod tcp;

pub use replay::{ReplayConfig, ReplayTransport};
pub use tcp::TcpBridgeTransport;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Operation timeout")]
    Timeout,
    #[error("Link lost")]
    Disconnected,
    #[error("Not subscribed")]
    NotSubscribed,
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("Connection attempt cancelled")]
    Cancelled,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    Busy,
    Rejected,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 扫描得到的设备信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// 广播名称（如 "RaceBox Mini 0123456789"）
    pub name: String,
    /// 链路地址（BLE MAC、`host:port` 或文件路径）
    pub address: String,
    /// 信号强度（dBm），不可用时为 None
    pub rssi: Option<i16>,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            rssi: None,
        }
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// 名称是否以任一前缀开头
    pub fn matches_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        prefixes.iter().any(|p| self.name.starts_with(p.as_ref()))
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.address)?;
        if let Some(rssi) = self.rssi {
            write!(f, " {} dBm", rssi)?;
        }
        Ok(())
    }
}

/// 数据通知：一段原始字节，或链路错误
///
/// 通道关闭等同于链路断开。
pub type Notification = Result<Bytes, TransportError>;

/// 传输层入口：设备发现与连接
pub trait Transport: Send {
    type Session: Session;

    /// 执行一次扫描，返回当前可见的设备
    fn discover(&mut self) -> Result<Vec<DeviceInfo>, TransportError>;

    /// 建立会话，超过 `timeout` 返回 `TransportError::Timeout`
    ///
    /// `abort` 断开（所有发送端被释放）时必须尽快放弃连接并返回
    /// `TransportError::Cancelled`。不需要中止时传入 `crossbeam_channel::never()`。
    fn connect(
        &mut self,
        device: &DeviceInfo,
        timeout: Duration,
        abort: &Receiver<()>,
    ) -> Result<Self::Session, TransportError>;
}

/// 已建立的会话
///
/// Drop 即断开连接。
pub trait Session: Send {
    /// 当前 MTU
    fn mtu(&mut self) -> Result<u16, TransportError> {
        Err(TransportError::Unsupported("mtu"))
    }

    /// 请求协商 MTU
    fn request_mtu(&mut self, _mtu: u16) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("request_mtu"))
    }

    /// 订阅数据通知
    fn subscribe(&mut self) -> Result<Receiver<Notification>, TransportError>;

    /// 取消订阅；重复调用无副作用
    fn unsubscribe(&mut self) -> Result<(), TransportError>;
}

/// `abort` 是否已断开（非阻塞）
pub fn is_aborted(abort: &Receiver<()>) -> bool {
    matches!(abort.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected))
}

/// BLE ATT 头部长度（MTU 中不可用于负载的部分）
pub const ATT_HEADER_LEN: u16 = 3;

/// BLE 默认 MTU
pub const DEFAULT_MTU: u16 = 23;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_prefix() {
        let device = DeviceInfo::new("RaceBox Mini S 1234", "AA:BB");
        assert!(device.matches_prefix(&["RaceBox Mini "]));
        assert!(device.matches_prefix(&["Other", "RaceBox Mini S "]));
        assert!(!device.matches_prefix(&["RaceBox Micro "]));
        assert!(!device.matches_prefix::<&str>(&[]));
    }

    #[test]
    fn test_device_display() {
        let device = DeviceInfo::new("RaceBox Micro 1", "AA:BB").with_rssi(-60);
        assert_eq!(device.to_string(), "RaceBox Micro 1 [AA:BB] -60 dBm");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "Operation timeout");
        let err: TransportError = DeviceError::new(DeviceErrorKind::Busy, "in use").into();
        assert_eq!(err.to_string(), "Device Error: Busy: in use");
        assert_eq!(TransportError::Cancelled.to_string(), "Connection attempt cancelled");
    }

    #[test]
    fn test_is_aborted() {
        let (tx, rx) = crossbeam_channel::bounded::<()>(0);
        assert!(!is_aborted(&rx));
        drop(tx);
        assert!(is_aborted(&rx));
        assert!(!is_aborted(&crossbeam_channel::never()));
    }
}
