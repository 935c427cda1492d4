//! 生命周期线程句柄
//!
//! 持有后台线程、取消令牌和共享状态。Drop 时自动取消并等待线程退出。

use crate::cancel::CancelToken;
use crate::display::DisplayFlag;
use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, StreamMetrics};
use crate::state::{LifecycleEvent, LifecycleOutcome};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::error;

/// Drop 时等待线程退出的最长时间
const DROP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout<T> {
    fn join_timeout(self, timeout: Duration) -> Result<T, DriverError>;
}

impl<T: Send + 'static> JoinTimeout<T> for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<T, DriverError> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责 join，本线程只做带超时的等待
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(DriverError::LifecycleThread(
                "lifecycle thread panicked".to_string(),
            )),
            // 超时后看门狗线程继续运行，进程退出时由 OS 回收
            Err(RecvTimeoutError::Timeout) => Err(DriverError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(DriverError::LifecycleThread(
                "watchdog thread exited unexpectedly".to_string(),
            )),
        }
    }
}

/// 后台生命周期句柄
pub struct LifecycleHandle {
    thread: Option<JoinHandle<LifecycleOutcome>>,
    cancel: CancelToken,
    display: DisplayFlag,
    metrics: Arc<StreamMetrics>,
    events: Option<Receiver<LifecycleEvent>>,
}

impl LifecycleHandle {
    pub(crate) fn new(
        thread: JoinHandle<LifecycleOutcome>,
        cancel: CancelToken,
        display: DisplayFlag,
        metrics: Arc<StreamMetrics>,
        events: Option<Receiver<LifecycleEvent>>,
    ) -> Self {
        Self {
            thread: Some(thread),
            cancel,
            display,
            metrics,
            events,
        }
    }

    /// 请求取消（非阻塞）
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 显示开关（可克隆后交给输入线程）
    pub fn display(&self) -> &DisplayFlag {
        &self.display
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 事件接收端（仅在 builder 启用事件时存在）
    pub fn events(&self) -> Option<&Receiver<LifecycleEvent>> {
        self.events.as_ref()
    }

    /// 生命周期线程是否已退出
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// 等待生命周期结束
    pub fn join(mut self) -> Result<LifecycleOutcome, DriverError> {
        let thread = self.take_thread()?;
        thread
            .join()
            .map_err(|_| DriverError::LifecycleThread("lifecycle thread panicked".to_string()))
    }

    /// 带超时的等待；超时返回 `DriverError::Timeout`，线程继续运行
    pub fn join_timeout(mut self, timeout: Duration) -> Result<LifecycleOutcome, DriverError> {
        let thread = self.take_thread()?;
        thread.join_timeout(timeout)
    }

    fn take_thread(&mut self) -> Result<JoinHandle<LifecycleOutcome>, DriverError> {
        self.thread
            .take()
            .ok_or_else(|| DriverError::LifecycleThread("already joined".to_string()))
    }
}

impl Drop for LifecycleHandle {
    fn drop(&mut self) {
        self.cancel.cancel();

        if let Some(thread) = self.thread.take()
            && let Err(e) = thread.join_timeout(DROP_JOIN_TIMEOUT)
        {
            error!(
                "Lifecycle thread failed to shut down within {:?}: {}",
                DROP_JOIN_TIMEOUT, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_timeout_returns_value() {
        let thread = spawn(|| 42);
        assert_eq!(thread.join_timeout(Duration::from_secs(1)).unwrap(), 42);
    }

    #[test]
    fn test_join_timeout_expires() {
        let thread = spawn(|| std::thread::sleep(Duration::from_millis(300)));
        assert!(matches!(
            thread.join_timeout(Duration::from_millis(10)),
            Err(DriverError::Timeout)
        ));
    }

    #[test]
    fn test_join_timeout_reports_panic() {
        let thread = spawn(|| -> u32 { panic!("boom") });
        assert!(matches!(
            thread.join_timeout(Duration::from_secs(1)),
            Err(DriverError::LifecycleThread(_))
        ));
    }

    #[test]
    fn test_drop_cancels_thread() {
        let cancel = CancelToken::new();
        let waiter = cancel.clone();
        let thread = spawn(move || {
            waiter.sleep(Duration::from_secs(60));
            LifecycleOutcome::Cancelled
        });

        let handle = LifecycleHandle::new(
            thread,
            cancel.clone(),
            DisplayFlag::default(),
            Arc::new(StreamMetrics::new()),
            None,
        );
        drop(handle);
        assert!(cancel.is_cancelled());
    }
}
