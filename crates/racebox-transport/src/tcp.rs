//! TCP 桥接传输层
//!
//! 连接到一个转发 BLE 通知原始字节的 TCP 服务（例如运行在树莓派上的
//! 蓝牙网关）。每次 `read` 得到的字节作为一个通知投递，分片边界任意。

use crate::{DeviceInfo, Notification, Session, Transport, TransportError};
use bytes::Bytes;
use crossbeam_channel::Receiver;
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 读取超时，决定停止标志的检查频率
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 单次读取缓冲区大小
const READ_BUFFER_SIZE: usize = 512;

/// TCP 桥接传输层
pub struct TcpBridgeTransport {
    address: String,
    device_name: String,
}

impl TcpBridgeTransport {
    /// `address` 形如 `host:port`；`device_name` 需匹配名称前缀
    pub fn new(address: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            device_name: device_name.into(),
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, TransportError> {
        Ok(self.address.to_socket_addrs()?.collect())
    }
}

impl Transport for TcpBridgeTransport {
    type Session = TcpBridgeSession;

    fn discover(&mut self) -> Result<Vec<DeviceInfo>, TransportError> {
        match self.resolve() {
            Ok(addrs) if !addrs.is_empty() => Ok(vec![DeviceInfo::new(
                self.device_name.clone(),
                self.address.clone(),
            )]),
            Ok(_) => Ok(Vec::new()),
            Err(e) => {
                debug!("Bridge address {} not resolvable: {}", self.address, e);
                Ok(Vec::new())
            },
        }
    }

    fn connect(
        &mut self,
        _device: &DeviceInfo,
        timeout: Duration,
        abort: &Receiver<()>,
    ) -> Result<Self::Session, TransportError> {
        if crate::is_aborted(abort) {
            return Err(TransportError::Cancelled);
        }
        let addrs = self.resolve()?;

        // connect_timeout 不可中断，放到工作线程上执行；中止时放弃结果，
        // 工作线程最迟在超时后自行退出
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        std::thread::Builder::new()
            .name("racebox-tcp-connect".into())
            .spawn(move || {
                let _ = result_tx.send(connect_any(&addrs, timeout));
            })?;

        let stream = crossbeam_channel::select! {
            recv(result_rx) -> result => result.map_err(|_| TransportError::Disconnected)??,
            recv(abort) -> _ => {
                debug!("Bridge connect aborted");
                return Err(TransportError::Cancelled);
            },
        };

        stream.set_nodelay(true)?;
        Ok(TcpBridgeSession {
            stream,
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
        })
    }
}

/// 依次尝试所有解析出的地址
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream, TransportError> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => {
                debug!("Connected to bridge {}", addr);
                return Ok(stream);
            },
            Err(e) if e.kind() == ErrorKind::TimedOut => last_err = Some(TransportError::Timeout),
            Err(e) => last_err = Some(e.into()),
        }
    }
    Err(last_err.unwrap_or(TransportError::Disconnected))
}

/// TCP 桥接会话
pub struct TcpBridgeSession {
    stream: TcpStream,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Session for TcpBridgeSession {
    fn subscribe(&mut self) -> Result<Receiver<Notification>, TransportError> {
        self.unsubscribe()?;

        let mut stream = self.stream.try_clone()?;
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        self.stop = stop.clone();

        let reader = std::thread::Builder::new()
            .name("racebox-tcp-rx".into())
            .spawn(move || {
                let mut buf = [0u8; READ_BUFFER_SIZE];
                while !stop.load(Ordering::Relaxed) {
                    match stream.read(&mut buf) {
                        Ok(0) => {
                            let _ = tx.send(Err(TransportError::Disconnected));
                            break;
                        },
                        Ok(n) => {
                            trace!("Bridge notification: {} bytes", n);
                            if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                                break;
                            }
                        },
                        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                            continue;
                        },
                        Err(e) => {
                            if !stop.load(Ordering::Relaxed) {
                                warn!("Bridge read error: {}", e);
                                let _ = tx.send(Err(e.into()));
                            }
                            break;
                        },
                    }
                }
            })?;

        self.reader = Some(reader);
        Ok(rx)
    }

    fn unsubscribe(&mut self) -> Result<(), TransportError> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        Ok(())
    }
}

impl Drop for TcpBridgeSession {
    fn drop(&mut self) {
        let _ = self.unsubscribe();
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    #[test]
    fn test_bridge_forwards_bytes_then_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            conn.write_all(&[0xB5, 0x62, 0xFF, 0x01]).unwrap();
            // 连接在此关闭
        });

        let mut transport = TcpBridgeTransport::new(addr.to_string(), "RaceBox Mini Bridge");
        let device = transport.discover().unwrap().remove(0);
        assert_eq!(device.name, "RaceBox Mini Bridge");

        let mut session = transport
            .connect(&device, Duration::from_secs(1), &crossbeam_channel::never())
            .unwrap();
        let rx = session.subscribe().unwrap();
        server.join().unwrap();

        let mut received = Vec::new();
        let mut disconnected = false;
        for notification in rx.iter() {
            match notification {
                Ok(chunk) => received.extend_from_slice(&chunk),
                Err(TransportError::Disconnected) => {
                    disconnected = true;
                    break;
                },
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(received, vec![0xB5, 0x62, 0xFF, 0x01]);
        assert!(disconnected);
    }

    #[test]
    fn test_connect_refused() {
        // 绑定后立即释放，端口大概率无人监听
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let mut transport = TcpBridgeTransport::new(addr.to_string(), "RaceBox Mini Bridge");
        let device = DeviceInfo::new("RaceBox Mini Bridge", addr.to_string());
        assert!(
            transport
                .connect(&device, Duration::from_millis(200), &crossbeam_channel::never())
                .is_err()
        );
    }

    #[test]
    fn test_connect_aborted_before_start() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let mut transport = TcpBridgeTransport::new(addr.to_string(), "RaceBox Mini Bridge");
        let device = DeviceInfo::new("RaceBox Mini Bridge", addr.to_string());
        let (abort_tx, abort_rx) = crossbeam_channel::bounded::<()>(0);
        drop(abort_tx);

        let result = transport.connect(&device, Duration::from_secs(10), &abort_rx);
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[test]
    fn test_unresolvable_address_yields_no_devices() {
        let mut transport = TcpBridgeTransport::new("not an address", "RaceBox Mini Bridge");
        assert!(transport.discover().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_joins_reader() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_millis(500));
            drop(conn);
        });

        let mut transport = TcpBridgeTransport::new(addr.to_string(), "RaceBox Mini Bridge");
        let device = transport.discover().unwrap().remove(0);
        let mut session = transport
            .connect(&device, Duration::from_secs(1), &crossbeam_channel::never())
            .unwrap();
        let rx = session.subscribe().unwrap();
        session.unsubscribe().unwrap();
        assert!(rx.try_recv().is_err());
        drop(session);
        server.join().unwrap();
    }
}
