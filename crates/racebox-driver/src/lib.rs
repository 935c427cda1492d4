//! 驱动层模块
//!
//! 本模块把传输层和协议层串起来，提供 RaceBox 设备的连接生命周期管理：
//! - 扫描、连接、MTU 协商、订阅数据通知
//! - 帧重组与解码（[`StreamPipeline`]）
//! - 有界重试与固定退避
//! - 协作式取消（[`CancelToken`]）
//! - 显示开关（[`DisplayFlag`]）与性能计数（[`StreamMetrics`]）
//!
//! # 使用场景
//!
//! ```rust,no_run
//! use racebox_driver::{LifecycleBuilder, LifecycleOutcome};
//! use racebox_transport::{ReplayConfig, ReplayTransport};
//!
//! let transport = ReplayTransport::from_file("capture.bin", ReplayConfig::default());
//! let handle = LifecycleBuilder::new()
//!     .spawn(transport, |record: racebox_protocol::Record| {
//!         println!("{:.6}, {:.6}", record.location.latitude, record.location.longitude);
//!     })
//!     .unwrap();
//!
//! handle.display().set(true);
//! handle.cancel();
//! assert!(matches!(handle.join(), Ok(LifecycleOutcome::Cancelled)));
//! ```

mod builder;
pub mod cancel;
pub mod config;
pub mod display;
mod error;
mod handle;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod state;

pub use builder::LifecycleBuilder;
pub use cancel::CancelToken;
pub use config::{LifecycleConfig, RetryPolicy};
pub use display::{DisplayFlag, DisplayThrottle, RecordSink};
pub use error::DriverError;
pub use handle::LifecycleHandle;
pub use lifecycle::ConnectionLifecycle;
pub use metrics::{MetricsSnapshot, StreamMetrics};
pub use pipeline::StreamPipeline;
pub use state::{LifecycleEvent, LifecycleOutcome, LifecycleState};
