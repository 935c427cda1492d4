//! 协作式取消
//!
//! `CancelToken` 内部持有一个永不发送消息的 crossbeam 通道。取消时释放发送端，
//! 所有 `select!` 在该接收端上的等待立即返回，因此扫描间隔、退避延迟、
//! 通知接收都能及时响应取消。

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct CancelInner {
    cancelled: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

/// 取消令牌（可克隆，所有克隆共享同一状态）
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// 触发取消；重复调用无副作用
    pub fn cancel(&self) {
        // Release: 取消前的写入对观察到取消的线程可见
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.sender.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// 取消信号接收端（取消后变为 disconnected），供 `select!` 使用
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }

    /// 可取消的等待
    ///
    /// 返回 `true` 表示等待期间（或之前）已被取消。
    pub fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        crossbeam_channel::select! {
            recv(self.inner.receiver) -> _ => true,
            default(duration) => self.is_cancelled(),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_sleep_runs_full_duration_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let start = Instant::now();
        let thread = std::thread::spawn(move || sleeper.sleep(Duration::from_secs(10)));

        std::thread::sleep(Duration::from_millis(20));
        token.cancel();

        assert!(thread.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.sleep(Duration::from_secs(10)));
        assert!(token.receiver().recv().is_err());
    }
}
