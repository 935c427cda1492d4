//! 终端渲染

use crate::config::DisplaySection;
use parking_lot::Mutex;
use racebox_driver::{LifecycleEvent, LifecycleState, RecordSink};
use racebox_protocol::Record;
use std::fmt::Write;
use std::sync::Arc;

const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// 格式化一条记录（多行文本）
pub fn format_record(record: &Record) -> String {
    let motion = &record.motion;
    let location = &record.location;
    let mut out = String::new();

    // 写入 String 不会失败
    let _ = writeln!(out, "Motion Data:");
    let _ = writeln!(out, "Acceleration (g):");
    let _ = writeln!(
        out,
        "  X: {:7.3} | Y: {:7.3} | Z: {:7.3}",
        motion.acc_x, motion.acc_y, motion.acc_z
    );
    let _ = writeln!(out, "Rotation (deg/s):");
    let _ = writeln!(
        out,
        "  X: {:7.2} | Y: {:7.2} | Z: {:7.2}",
        motion.rot_x, motion.rot_y, motion.rot_z
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "GPS Data ({}, Satellites: {}):",
        location.fix_status, location.satellites
    );
    let _ = writeln!(
        out,
        "Position: {:10.6}°, {:10.6}°",
        location.latitude, location.longitude
    );
    let _ = writeln!(out, "Speed: {:6.1} km/h", location.speed_kmh);
    let _ = writeln!(out, "Altitude (WGS): {:6.1} m", location.altitude_wgs);
    let _ = write!(out, "Altitude (MSL): {:6.1} m", location.altitude_msl);
    out
}

/// 格式化生命周期事件；不需要提示的事件返回 None
pub fn format_event(event: &LifecycleEvent) -> Option<String> {
    match event {
        LifecycleEvent::StateChanged { to, .. } => match to {
            LifecycleState::Scanning => Some("Scanning for RaceBox devices...".to_string()),
            LifecycleState::Connecting => Some("Connecting to device...".to_string()),
            LifecycleState::Streaming => {
                Some("Connected successfully! Press 'q' + Enter to start/stop data display".to_string())
            },
            LifecycleState::Disconnected => Some("Disconnected".to_string()),
            LifecycleState::Failed => Some("Giving up: retry limit reached".to_string()),
            LifecycleState::Configuring => None,
        },
        LifecycleEvent::DeviceFound(device) => Some(format!("RaceBox device found: {}", device)),
        LifecycleEvent::MtuNegotiated(Some(mtu)) => Some(format!("Negotiated MTU: {}", mtu)),
        LifecycleEvent::MtuNegotiated(None) => {
            Some("MTU negotiation not supported on this platform".to_string())
        },
        LifecycleEvent::Backoff {
            attempt,
            delay,
            reason,
        } => Some(format!(
            "Connection lost ({}), retry {} in {:.1}s",
            reason,
            attempt,
            delay.as_secs_f64()
        )),
    }
}

/// 终端渲染器（在生命周期线程上调用）
pub struct TerminalRenderer {
    options: DisplaySection,
    /// 当前连接的设备名称，由主线程在收到 DeviceFound 时更新
    device_name: Arc<Mutex<Option<String>>>,
}

impl TerminalRenderer {
    pub fn new(options: DisplaySection) -> Self {
        Self {
            options,
            device_name: Arc::new(Mutex::new(None)),
        }
    }

    pub fn device_name(&self) -> Arc<Mutex<Option<String>>> {
        self.device_name.clone()
    }

    fn render(&self, record: &Record) -> String {
        let mut out = String::new();
        if self.options.clear_screen {
            out.push_str(CLEAR_SCREEN);
        }
        if let Some(name) = self.device_name.lock().as_deref() {
            let _ = writeln!(out, "Connected to: {}", name);
            let _ = writeln!(out, "{}", "-".repeat(50));
        }
        out.push_str(&format_record(record));
        if self.options.show_controls {
            out.push_str("\n\nControls:\nq + Enter - Toggle data display\nCtrl+C - Exit program");
        }
        out
    }
}

impl RecordSink for TerminalRenderer {
    fn show(&mut self, record: &Record) {
        println!("{}", self.render(record));
    }
}
