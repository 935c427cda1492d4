//! 连接生命周期状态机
//!
//! ```text
//! Scanning ──► Connecting ──► Configuring ──► Streaming
//!    ▲              │                             │
//!    │              ▼                             ▼
//!    └──(退避)── Disconnected ◄───────────────────┘
//!                   │
//!                   ▼
//!                Failed（累计失败达到上限）
//! ```
//!
//! 所有等待（扫描间隔、连接、退避、通知接收）都同时监听取消信号。
//! 取消是唯一不经过重试的退出路径。

use crate::cancel::CancelToken;
use crate::config::LifecycleConfig;
use crate::display::{DisplayFlag, DisplayThrottle, RecordSink};
use crate::error::DriverError;
use crate::metrics::StreamMetrics;
use crate::pipeline::StreamPipeline;
use crate::state::{LifecycleEvent, LifecycleOutcome, LifecycleState};
use crossbeam_channel::{Receiver, Sender};
use racebox_protocol::RecordDecoder;
use racebox_transport::{DeviceInfo, Session, Transport, TransportError};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace, warn};

/// 单次会话的结束原因
enum SessionExit {
    Cancelled,
    Failed(DriverError),
}

impl From<TransportError> for SessionExit {
    fn from(e: TransportError) -> Self {
        Self::Failed(e.into())
    }
}

/// 订阅守卫：离开作用域时取消订阅（正常、取消、出错三种路径都会经过）
struct Subscription<'a, S: Session> {
    session: &'a mut S,
}

impl<S: Session> Drop for Subscription<'_, S> {
    fn drop(&mut self) {
        match self.session.unsubscribe() {
            Ok(()) => debug!("Unsubscribed from data notifications"),
            Err(e) => warn!("Failed to unsubscribe: {}", e),
        }
    }
}

/// 连接生命周期
///
/// 通常通过 [`LifecycleBuilder`](crate::LifecycleBuilder) 构造，
/// 在独立线程上调用 [`run()`](Self::run)。
pub struct ConnectionLifecycle<T: Transport> {
    transport: T,
    config: LifecycleConfig,
    pipeline: StreamPipeline,
    sink: Box<dyn RecordSink>,
    cancel: CancelToken,
    metrics: Arc<StreamMetrics>,
    events: Option<Sender<LifecycleEvent>>,
    state: LifecycleState,
    /// 累计失败次数（整个生命周期内不清零）
    failures: u32,
}

impl<T: Transport> ConnectionLifecycle<T> {
    pub fn new(
        transport: T,
        config: LifecycleConfig,
        sink: Box<dyn RecordSink>,
        display: DisplayFlag,
        cancel: CancelToken,
        metrics: Arc<StreamMetrics>,
    ) -> Self {
        let pipeline = StreamPipeline::new(
            RecordDecoder::with_config(config.decoder),
            display,
            DisplayThrottle::new(config.display_interval),
            metrics.clone(),
        );
        Self {
            transport,
            config,
            pipeline,
            sink,
            cancel,
            metrics,
            events: None,
            state: LifecycleState::Scanning,
            failures: 0,
        }
    }

    /// 创建事件通道；之后的所有事件都会发送到返回的接收端
    pub fn subscribe_events(&mut self) -> Receiver<LifecycleEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.events = Some(tx);
        rx
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn display(&self) -> &DisplayFlag {
        self.pipeline.display()
    }

    pub fn metrics(&self) -> &Arc<StreamMetrics> {
        &self.metrics
    }

    /// 运行直到取消或重试耗尽
    pub fn run(&mut self) -> LifecycleOutcome {
        loop {
            self.transition(LifecycleState::Scanning);

            let err = match self.run_session() {
                SessionExit::Cancelled => {
                    self.transition(LifecycleState::Disconnected);
                    info!("Lifecycle cancelled");
                    return LifecycleOutcome::Cancelled;
                },
                SessionExit::Failed(e) => e,
            };

            self.transition(LifecycleState::Disconnected);
            if self.cancel.is_cancelled() {
                info!("Lifecycle cancelled");
                return LifecycleOutcome::Cancelled;
            }

            // === 重试路径：每次失败只计数一次 ===
            self.failures += 1;
            let retry = self.config.retry;

            if retry.max_retries > 0 {
                warn!(
                    "Connection attempt failed ({}/{}): {}. Backing off {:?}",
                    self.failures, retry.max_retries, err, retry.retry_delay
                );
                self.metrics.backoffs.fetch_add(1, Ordering::Relaxed);
                self.emit(LifecycleEvent::Backoff {
                    attempt: self.failures,
                    delay: retry.retry_delay,
                    reason: err.to_string(),
                });

                if self.cancel.sleep(retry.retry_delay) {
                    info!("Lifecycle cancelled during backoff");
                    return LifecycleOutcome::Cancelled;
                }
            }

            if retry.is_exhausted(self.failures) {
                error!("Giving up after {} failures: {}", self.failures, err);
                self.transition(LifecycleState::Failed);
                return LifecycleOutcome::Failed {
                    attempts: self.failures,
                    last_error: err.to_string(),
                };
            }
        }
    }

    /// 一次完整的 扫描 → 连接 → 配置 → 流式传输
    fn run_session(&mut self) -> SessionExit {
        let device = match self.scan() {
            Ok(device) => device,
            Err(exit) => return exit,
        };

        self.transition(LifecycleState::Connecting);
        self.metrics.connect_attempts.fetch_add(1, Ordering::Relaxed);
        info!("Connecting to {}", device);
        let mut session = match self.transport.connect(
            &device,
            self.config.connect_timeout,
            self.cancel.receiver(),
        ) {
            Ok(session) => session,
            Err(TransportError::Cancelled) => return SessionExit::Cancelled,
            Err(e) => return e.into(),
        };
        if self.cancel.is_cancelled() {
            return SessionExit::Cancelled;
        }

        self.transition(LifecycleState::Configuring);
        self.configure(&mut session);

        self.stream(&mut session)
        // session 在此 drop，连接断开
    }

    fn scan(&mut self) -> Result<DeviceInfo, SessionExit> {
        debug!("Scanning for devices: {:?}", self.config.name_prefixes);
        loop {
            if self.cancel.is_cancelled() {
                return Err(SessionExit::Cancelled);
            }

            let devices = self.transport.discover()?;
            if let Some(device) = devices
                .into_iter()
                .find(|d| d.matches_prefix(&self.config.name_prefixes))
            {
                info!("RaceBox device found: {}", device);
                self.emit(LifecycleEvent::DeviceFound(device.clone()));
                return Ok(device);
            }

            trace!("No matching device, next scan in {:?}", self.config.scan_interval);
            if self.cancel.sleep(self.config.scan_interval) {
                return Err(SessionExit::Cancelled);
            }
        }
    }

    /// 尽力协商 MTU，任何错误都只记录日志
    fn configure(&mut self, session: &mut T::Session) {
        match session.mtu() {
            Ok(mtu) => debug!("Current MTU: {}", mtu),
            Err(e) => debug!("Current MTU unavailable: {}", e),
        }

        let desired = self.config.desired_mtu;
        let negotiated = match session.request_mtu(desired).and_then(|_| session.mtu()) {
            Ok(mtu) => {
                info!("Negotiated MTU: {}", mtu);
                Some(mtu)
            },
            Err(TransportError::Unsupported(_)) => {
                info!("MTU negotiation not supported on this platform");
                None
            },
            Err(e) => {
                warn!("MTU negotiation failed: {}", e);
                None
            },
        };
        self.emit(LifecycleEvent::MtuNegotiated(negotiated));
    }

    fn stream(&mut self, session: &mut T::Session) -> SessionExit {
        // 新会话不能拼接上一次连接残留的半帧
        self.pipeline.reset();

        let rx = match session.subscribe() {
            Ok(rx) => rx,
            Err(e) => return e.into(),
        };
        let _subscription = Subscription { session };

        self.transition(LifecycleState::Streaming);

        let idle_timeout = self.config.stream_idle_timeout;
        loop {
            if self.cancel.is_cancelled() {
                return SessionExit::Cancelled;
            }

            let message = match idle_timeout {
                Some(timeout) => crossbeam_channel::select! {
                    recv(self.cancel.receiver()) -> _ => return SessionExit::Cancelled,
                    recv(rx) -> msg => msg,
                    default(timeout) => {
                        return SessionExit::Failed(DriverError::IdleTimeout(timeout));
                    },
                },
                None => crossbeam_channel::select! {
                    recv(self.cancel.receiver()) -> _ => return SessionExit::Cancelled,
                    recv(rx) -> msg => msg,
                },
            };

            match message {
                Ok(Ok(chunk)) => {
                    self.pipeline.process_chunk(&chunk, &mut *self.sink);
                },
                Ok(Err(e)) => return e.into(),
                Err(_) => return SessionExit::Failed(DriverError::ChannelClosed),
            }
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        debug!("Lifecycle state: {} -> {}", from, to);
        self.emit(LifecycleEvent::StateChanged { from, to });
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(tx) = &self.events {
            // 观察者已退出时丢弃
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use bytes::Bytes;
    use racebox_protocol::{PAYLOAD_LEN, RaceboxFrame, Record};
    use racebox_transport::mock::{MockScript, MockTransport};
    use std::time::Duration;

    fn device() -> DeviceInfo {
        DeviceInfo::new("RaceBox Mini 0123456789", "00:11:22:33:44:55")
    }

    fn fast_config(max_retries: u32) -> LifecycleConfig {
        LifecycleConfig {
            scan_interval: Duration::from_millis(1),
            retry: RetryPolicy {
                max_retries,
                retry_delay: Duration::from_millis(1),
            },
            ..LifecycleConfig::default()
        }
    }

    fn lifecycle(
        transport: MockTransport,
        config: LifecycleConfig,
    ) -> ConnectionLifecycle<MockTransport> {
        ConnectionLifecycle::new(
            transport,
            config,
            Box::new(|_record: Record| {}),
            DisplayFlag::new(true),
            CancelToken::new(),
            Arc::new(StreamMetrics::new()),
        )
    }

    #[test]
    fn test_zero_retries_fails_on_first_error() {
        let transport = MockTransport::new(device());
        let stats = transport.stats();
        let mut lifecycle = lifecycle(transport, fast_config(0));

        let outcome = lifecycle.run();
        assert!(matches!(outcome, LifecycleOutcome::Failed { attempts: 1, .. }));
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
        assert_eq!(stats.connect_attempts(), 1);
        assert_eq!(lifecycle.metrics().snapshot().backoffs, 0);
    }

    #[test]
    fn test_unsupported_mtu_is_not_fatal() {
        let frame = RaceboxFrame::from_payload(&[0u8; PAYLOAD_LEN]);
        let transport = MockTransport::new(device()).with_script(MockScript::Stream {
            chunks: vec![Bytes::copy_from_slice(frame.as_bytes())],
            end: racebox_transport::mock::StreamEnd::Close,
            mtu_supported: false,
        });
        let mut lifecycle = lifecycle(transport, fast_config(0));
        let events = lifecycle.subscribe_events();

        let outcome = lifecycle.run();
        let last_error = match outcome {
            LifecycleOutcome::Failed { last_error, .. } => last_error,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(last_error, "Notification channel closed");

        let events: Vec<_> = events.try_iter().collect();
        assert!(events.contains(&LifecycleEvent::MtuNegotiated(None)));
        assert!(events.contains(&LifecycleEvent::StateChanged {
            from: LifecycleState::Configuring,
            to: LifecycleState::Streaming,
        }));
        assert_eq!(lifecycle.metrics().snapshot().records_decoded, 1);
    }

    #[test]
    fn test_cancel_before_run() {
        let transport = MockTransport::new(device());
        let stats = transport.stats();
        let mut lifecycle = lifecycle(transport, fast_config(3));
        lifecycle.cancel_token().cancel();

        assert_eq!(lifecycle.run(), LifecycleOutcome::Cancelled);
        assert_eq!(stats.connect_attempts(), 0);
    }

    #[test]
    fn test_discovery_skips_non_matching_devices() {
        let other = DeviceInfo::new("Heart Rate Monitor", "AA:AA");
        let transport = MockTransport::new(device())
            .with_discover_sequence(vec![vec![other.clone()], vec![], vec![other]]);
        let stats = transport.stats();
        let mut lifecycle = lifecycle(transport, fast_config(0));
        let events = lifecycle.subscribe_events();

        lifecycle.run();

        assert_eq!(stats.discover_calls(), 4);
        let found: Vec<_> = events
            .try_iter()
            .filter_map(|e| match e {
                LifecycleEvent::DeviceFound(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(found, vec![device()]);
    }
}
