//! Mock 传输层（无硬件依赖，用于测试）
//!
//! 每次 `connect()` 按顺序消费一个 [`MockScript`]，脚本用完后使用默认脚本。
//! 订阅时所有数据事件一次性写入通道，不启动线程，测试结果确定。

use crate::{DeviceInfo, Notification, Session, Transport, TransportError};
use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// 单次连接的脚本
#[derive(Debug, Clone)]
pub enum MockScript {
    /// 连接被拒绝
    Refuse,
    /// 连接超时
    Timeout,
    /// 连接挂起，直到 `timeout` 到期或被中止
    Stall,
    /// 连接成功，订阅后依次投递数据，最后按 `end` 结束
    Stream {
        chunks: Vec<Bytes>,
        end: StreamEnd,
        /// 是否支持 MTU 协商
        mtu_supported: bool,
    },
}

impl MockScript {
    /// 投递数据后保持连接，直到取消订阅
    pub fn hold(chunks: Vec<Bytes>) -> Self {
        Self::Stream {
            chunks,
            end: StreamEnd::Hold,
            mtu_supported: true,
        }
    }

    /// 投递数据后报告链路错误
    pub fn fail_after(chunks: Vec<Bytes>) -> Self {
        Self::Stream {
            chunks,
            end: StreamEnd::Error,
            mtu_supported: true,
        }
    }
}

/// 数据流结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// 通道中投递一个错误
    Error,
    /// 直接关闭通道
    Close,
    /// 保持通道打开
    Hold,
}

/// 调用统计（测试断言用）
#[derive(Debug, Default)]
pub struct MockStats {
    pub discover_calls: AtomicU32,
    pub connect_attempts: AtomicU32,
    pub subscribes: AtomicU32,
    pub unsubscribes: AtomicU32,
    pub mtu_requests: AtomicU32,
}

impl MockStats {
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn subscribes(&self) -> u32 {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> u32 {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn discover_calls(&self) -> u32 {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

/// Mock 传输层
pub struct MockTransport {
    /// 扫描结果：每次 discover 弹出一项，用完后一直返回 `devices`
    discover_results: VecDeque<Vec<DeviceInfo>>,
    devices: Vec<DeviceInfo>,
    scripts: VecDeque<MockScript>,
    default_script: MockScript,
    stats: Arc<MockStats>,
}

impl MockTransport {
    /// 创建只有一个设备的 Mock，默认脚本为拒绝连接
    pub fn new(device: DeviceInfo) -> Self {
        Self {
            discover_results: VecDeque::new(),
            devices: vec![device],
            scripts: VecDeque::new(),
            default_script: MockScript::Refuse,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// 追加一次连接脚本
    pub fn with_script(mut self, script: MockScript) -> Self {
        self.scripts.push_back(script);
        self
    }

    /// 脚本用完后使用的默认脚本
    pub fn with_default_script(mut self, script: MockScript) -> Self {
        self.default_script = script;
        self
    }

    /// 前若干次扫描返回的结果（用于模拟设备晚出现）
    pub fn with_discover_sequence(mut self, results: Vec<Vec<DeviceInfo>>) -> Self {
        self.discover_results = results.into();
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn discover(&mut self) -> Result<Vec<DeviceInfo>, TransportError> {
        self.stats.discover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .discover_results
            .pop_front()
            .unwrap_or_else(|| self.devices.clone()))
    }

    fn connect(
        &mut self,
        _device: &DeviceInfo,
        timeout: Duration,
        abort: &Receiver<()>,
    ) -> Result<Self::Session, TransportError> {
        self.stats.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());

        match script {
            MockScript::Refuse => Err(TransportError::Device("connection refused".into())),
            MockScript::Timeout => Err(TransportError::Timeout),
            MockScript::Stall => crossbeam_channel::select! {
                recv(abort) -> _ => Err(TransportError::Cancelled),
                default(timeout) => Err(TransportError::Timeout),
            },
            MockScript::Stream {
                chunks,
                end,
                mtu_supported,
            } => Ok(MockSession {
                chunks,
                end,
                mtu_supported,
                mtu: crate::DEFAULT_MTU,
                held_tx: None,
                subscribed: false,
                stats: self.stats.clone(),
            }),
        }
    }
}

/// Mock 会话
pub struct MockSession {
    chunks: Vec<Bytes>,
    end: StreamEnd,
    mtu_supported: bool,
    mtu: u16,
    /// `StreamEnd::Hold` 时持有发送端，取消订阅时释放
    held_tx: Option<Sender<Notification>>,
    subscribed: bool,
    stats: Arc<MockStats>,
}

impl Session for MockSession {
    fn mtu(&mut self) -> Result<u16, TransportError> {
        if self.mtu_supported {
            Ok(self.mtu)
        } else {
            Err(TransportError::Unsupported("mtu"))
        }
    }

    fn request_mtu(&mut self, mtu: u16) -> Result<(), TransportError> {
        self.stats.mtu_requests.fetch_add(1, Ordering::SeqCst);
        if !self.mtu_supported {
            return Err(TransportError::Unsupported("request_mtu"));
        }
        self.mtu = mtu;
        Ok(())
    }

    fn subscribe(&mut self) -> Result<Receiver<Notification>, TransportError> {
        self.stats.subscribes.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = crossbeam_channel::unbounded();

        for chunk in self.chunks.drain(..) {
            // 接收端在此处不可能已关闭
            let _ = tx.send(Ok(chunk));
        }

        match self.end {
            StreamEnd::Error => {
                let _ = tx.send(Err(TransportError::Disconnected));
            },
            StreamEnd::Close => {},
            StreamEnd::Hold => self.held_tx = Some(tx),
        }

        self.subscribed = true;
        Ok(rx)
    }

    fn unsubscribe(&mut self) -> Result<(), TransportError> {
        if self.subscribed {
            self.subscribed = false;
            self.held_tx = None;
            self.stats.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
