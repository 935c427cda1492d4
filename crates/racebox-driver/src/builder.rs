//! Builder 模式实现

use crate::cancel::CancelToken;
use crate::config::LifecycleConfig;
use crate::display::{DisplayFlag, RecordSink};
use crate::error::DriverError;
use crate::handle::LifecycleHandle;
use crate::lifecycle::ConnectionLifecycle;
use crate::metrics::StreamMetrics;
use racebox_transport::Transport;
use std::sync::Arc;
use tracing::{debug, info};

/// 生命周期 Builder
///
/// # Example
///
/// ```no_run
/// use racebox_driver::{LifecycleBuilder, LifecycleConfig};
/// use racebox_transport::TcpBridgeTransport;
/// use std::time::Duration;
///
/// let config = LifecycleConfig {
///     stream_idle_timeout: Some(Duration::from_secs(3)),
///     ..LifecycleConfig::default()
/// };
/// let transport = TcpBridgeTransport::new("192.168.1.20:7000", "RaceBox Mini Bridge");
/// let (tx, rx) = crossbeam_channel::unbounded::<racebox_protocol::Record>();
///
/// let handle = LifecycleBuilder::new()
///     .config(config)
///     .with_events()
///     .spawn(transport, tx)
///     .unwrap();
/// handle.display().set(true);
/// # drop(rx);
/// ```
#[derive(Debug, Default)]
pub struct LifecycleBuilder {
    config: LifecycleConfig,
    display: Option<DisplayFlag>,
    cancel: Option<CancelToken>,
    metrics: Option<Arc<StreamMetrics>>,
    events: bool,
}

impl LifecycleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置生命周期配置（默认 `LifecycleConfig::default()`）
    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// 使用外部创建的显示开关（默认关闭）
    pub fn display(mut self, display: DisplayFlag) -> Self {
        self.display = Some(display);
        self
    }

    /// 使用外部创建的取消令牌（例如 Ctrl+C 处理器持有的令牌）
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn metrics(mut self, metrics: Arc<StreamMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 启用生命周期事件通道
    pub fn with_events(mut self) -> Self {
        self.events = true;
        self
    }

    /// 构造生命周期（在当前线程运行）
    pub fn build<T, S>(self, transport: T, sink: S) -> ConnectionLifecycle<T>
    where
        T: Transport,
        S: RecordSink + 'static,
    {
        ConnectionLifecycle::new(
            transport,
            self.config,
            Box::new(sink),
            self.display.unwrap_or_default(),
            self.cancel.unwrap_or_default(),
            self.metrics.unwrap_or_default(),
        )
    }

    /// 在后台线程运行生命周期
    pub fn spawn<T, S>(self, transport: T, sink: S) -> Result<LifecycleHandle, DriverError>
    where
        T: Transport + 'static,
        S: RecordSink + 'static,
    {
        let with_events = self.events;
        let mut lifecycle = self.build(transport, sink);
        let events = with_events.then(|| lifecycle.subscribe_events());

        let cancel = lifecycle.cancel_token().clone();
        let display = lifecycle.display().clone();
        let metrics = lifecycle.metrics().clone();

        let thread = std::thread::Builder::new()
            .name("racebox-lifecycle".into())
            .spawn(move || {
                debug!("Lifecycle thread started");
                let outcome = lifecycle.run();
                info!("Lifecycle finished: {}", outcome);
                outcome
            })
            .map_err(|e| DriverError::LifecycleThread(e.to_string()))?;

        Ok(LifecycleHandle::new(thread, cancel, display, metrics, events))
    }
}
