//! 文件回放传输层
//!
//! 将录制的原始字节流（设备通知的直接拼接）作为一个虚拟设备提供。
//! 数据按 MTU 切片、按固定间隔投递，行为与真实 BLE 通知一致：
//! 分片边界与帧边界无关。

use crate::{
    ATT_HEADER_LEN, DEFAULT_MTU, DeviceError, DeviceErrorKind, DeviceInfo, Notification, Session,
    Transport, TransportError,
};
use bytes::Bytes;
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace};

/// 回放配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// 虚拟设备名称（需匹配生命周期配置中的名称前缀）
    pub device_name: String,
    /// 两次通知之间的间隔
    pub chunk_interval: Duration,
    /// 数据播放完毕后从头循环
    pub looping: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            device_name: "RaceBox Mini Replay".to_string(),
            chunk_interval: Duration::from_millis(4),
            looping: false,
        }
    }
}

enum Source {
    File(PathBuf),
    Memory(Bytes),
}

/// 文件回放传输层
pub struct ReplayTransport {
    source: Source,
    config: ReplayConfig,
}

impl ReplayTransport {
    /// 从录制文件回放
    pub fn from_file(path: impl Into<PathBuf>, config: ReplayConfig) -> Self {
        Self {
            source: Source::File(path.into()),
            config,
        }
    }

    /// 从内存数据回放
    pub fn from_bytes(data: impl Into<Bytes>, config: ReplayConfig) -> Self {
        Self {
            source: Source::Memory(data.into()),
            config,
        }
    }

    fn address(&self) -> String {
        match &self.source {
            Source::File(path) => path.display().to_string(),
            Source::Memory(_) => "memory".to_string(),
        }
    }
}

impl Transport for ReplayTransport {
    type Session = ReplaySession;

    fn discover(&mut self) -> Result<Vec<DeviceInfo>, TransportError> {
        if let Source::File(path) = &self.source
            && !path.exists()
        {
            // 文件不存在时表现为“没有设备”，由扫描循环继续等待
            debug!("Replay file {} not found", path.display());
            return Ok(Vec::new());
        }
        Ok(vec![DeviceInfo::new(
            self.config.device_name.clone(),
            self.address(),
        )])
    }

    fn connect(
        &mut self,
        _device: &DeviceInfo,
        _timeout: Duration,
        abort: &Receiver<()>,
    ) -> Result<Self::Session, TransportError> {
        if crate::is_aborted(abort) {
            return Err(TransportError::Cancelled);
        }
        let data = match &self.source {
            Source::File(path) => Bytes::from(std::fs::read(path)?),
            Source::Memory(data) => data.clone(),
        };

        if data.is_empty() {
            return Err(DeviceError::new(DeviceErrorKind::Rejected, "replay source is empty").into());
        }

        Ok(ReplaySession {
            data,
            config: self.config.clone(),
            mtu: DEFAULT_MTU,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }
}

/// 回放会话
pub struct ReplaySession {
    data: Bytes,
    config: ReplayConfig,
    mtu: u16,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySession {
    fn chunk_size(&self) -> usize {
        self.mtu.saturating_sub(ATT_HEADER_LEN).max(1) as usize
    }
}

impl Session for ReplaySession {
    fn mtu(&mut self) -> Result<u16, TransportError> {
        Ok(self.mtu)
    }

    fn request_mtu(&mut self, mtu: u16) -> Result<(), TransportError> {
        self.mtu = mtu.max(DEFAULT_MTU);
        Ok(())
    }

    fn subscribe(&mut self) -> Result<Receiver<Notification>, TransportError> {
        self.unsubscribe()?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let data = self.data.clone();
        let chunk_size = self.chunk_size();
        let interval = self.config.chunk_interval;
        let looping = self.config.looping;
        let stop = Arc::new(AtomicBool::new(false));
        self.stop = stop.clone();

        let worker = std::thread::Builder::new()
            .name("racebox-replay".into())
            .spawn(move || {
                'replay: loop {
                    let mut offset = 0;
                    while offset < data.len() {
                        if stop.load(Ordering::Relaxed) {
                            break 'replay;
                        }
                        let end = (offset + chunk_size).min(data.len());
                        if tx.send(Ok(data.slice(offset..end))).is_err() {
                            break 'replay;
                        }
                        offset = end;
                        std::thread::sleep(interval);
                    }
                    if !looping {
                        break;
                    }
                    trace!("Replay wrapped around");
                }
                // tx 在此释放，接收端看到通道关闭
            })?;

        self.worker = Some(worker);
        Ok(rx)
    }

    fn unsubscribe(&mut self) -> Result<(), TransportError> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        let _ = self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fast_config() -> ReplayConfig {
        ReplayConfig {
            chunk_interval: Duration::ZERO,
            ..ReplayConfig::default()
        }
    }

    #[test]
    fn test_memory_replay_delivers_all_bytes() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut transport = ReplayTransport::from_bytes(data.clone(), fast_config());

        let devices = transport.discover().unwrap();
        assert_eq!(devices.len(), 1);

        let mut session = transport
            .connect(&devices[0], Duration::ZERO, &crossbeam_channel::never())
            .unwrap();
        let rx = session.subscribe().unwrap();

        let mut received = Vec::new();
        for notification in rx.iter() {
            let chunk = notification.unwrap();
            assert!(chunk.len() <= (DEFAULT_MTU - ATT_HEADER_LEN) as usize);
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, data);
    }

    #[test]
    fn test_mtu_controls_chunk_size() {
        let mut transport = ReplayTransport::from_bytes(vec![0u8; 1000], fast_config());
        let device = transport.discover().unwrap().remove(0);
        let mut session = transport
            .connect(&device, Duration::ZERO, &crossbeam_channel::never())
            .unwrap();

        session.request_mtu(247).unwrap();
        assert_eq!(session.mtu().unwrap(), 247);

        let rx = session.subscribe().unwrap();
        let first = rx.recv().unwrap().unwrap();
        assert_eq!(first.len(), 244);
    }

    #[test]
    fn test_file_replay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();

        let mut transport = ReplayTransport::from_file(file.path(), fast_config());
        let device = transport.discover().unwrap().remove(0);
        assert_eq!(device.address, file.path().display().to_string());

        let mut session = transport
            .connect(&device, Duration::ZERO, &crossbeam_channel::never())
            .unwrap();
        let rx = session.subscribe().unwrap();
        let received: Vec<u8> = rx.iter().flat_map(|n| n.unwrap().to_vec()).collect();
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_missing_file_yields_no_devices() {
        let mut transport = ReplayTransport::from_file("/nonexistent/capture.bin", fast_config());
        assert!(transport.discover().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_looping_replay() {
        let config = ReplayConfig {
            looping: true,
            chunk_interval: Duration::from_millis(1),
            ..ReplayConfig::default()
        };
        let mut transport = ReplayTransport::from_bytes(vec![0u8; 64], config);
        let device = transport.discover().unwrap().remove(0);
        let mut session = transport
            .connect(&device, Duration::ZERO, &crossbeam_channel::never())
            .unwrap();

        let rx = session.subscribe().unwrap();
        assert!(rx.recv().is_ok());

        session.unsubscribe().unwrap();
        // 剩余消息读完后通道关闭
        while let Ok(n) = rx.recv() {
            assert!(n.is_ok());
        }
    }
}
