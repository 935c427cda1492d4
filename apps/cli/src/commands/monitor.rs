//! 监控命令
//!
//! 运行连接生命周期并在终端显示记录。`q` + Enter 切换显示，Ctrl+C 退出。

use crate::config::RaceboxConfig;
use crate::display::{TerminalRenderer, format_event};
use crate::input;
use anyhow::{Context, Result, bail};
use clap::Args;
use racebox_driver::{
    CancelToken, DisplayFlag, LifecycleBuilder, LifecycleEvent, LifecycleOutcome,
};
use racebox_transport::{ReplayConfig, ReplayTransport, TcpBridgeTransport, Transport};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 配置文件路径（默认 ~/.config/racebox/config.toml）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 回放录制的原始字节流文件
    #[arg(long, conflicts_with = "bridge")]
    pub replay: Option<PathBuf>,

    /// 回放间隔（毫秒/分片）
    #[arg(long, default_value_t = 4, requires = "replay")]
    pub replay_interval_ms: u64,

    /// 循环回放
    #[arg(long, requires = "replay")]
    pub loop_replay: bool,

    /// BLE-TCP 桥接地址（host:port）
    #[arg(long)]
    pub bridge: Option<String>,

    /// 桥接设备名称（需匹配名称前缀）
    #[arg(long, default_value = "RaceBox Mini Bridge", requires = "bridge")]
    pub bridge_name: String,

    /// 启动时即显示数据
    #[arg(long)]
    pub display: bool,
}

impl MonitorCommand {
    pub fn execute(&self) -> Result<()> {
        let config = RaceboxConfig::load(self.config.as_deref())?;

        if let Some(path) = &self.replay {
            let replay_config = ReplayConfig {
                chunk_interval: Duration::from_millis(self.replay_interval_ms),
                looping: self.loop_replay,
                ..ReplayConfig::default()
            };
            self.run(&config, ReplayTransport::from_file(path, replay_config))
        } else if let Some(addr) = &self.bridge {
            self.run(&config, TcpBridgeTransport::new(addr, &self.bridge_name))
        } else {
            bail!("未指定数据源：使用 --replay FILE 或 --bridge HOST:PORT");
        }
    }

    fn run<T: Transport + 'static>(&self, config: &RaceboxConfig, transport: T) -> Result<()> {
        let cancel = CancelToken::new();
        let handler_cancel = cancel.clone();
        ctrlc::set_handler(move || {
            println!("\n收到退出信号，正在关闭...");
            handler_cancel.cancel();
        })
        .context("设置 Ctrl+C 处理器失败")?;

        let display = DisplayFlag::new(config.display.start_enabled || self.display);
        input::spawn_toggle_thread(display.clone())?;

        let renderer = TerminalRenderer::new(config.display.clone());
        let device_name = renderer.device_name();

        println!("Starting RaceBox monitor...");
        let handle = LifecycleBuilder::new()
            .config(config.lifecycle_config())
            .display(display)
            .cancel_token(cancel)
            .with_events()
            .spawn(transport, renderer)?;

        // 事件通道在生命周期线程退出时关闭
        if let Some(events) = handle.events().cloned() {
            for event in events.iter() {
                if let LifecycleEvent::DeviceFound(device) = &event {
                    *device_name.lock() = Some(device.name.clone());
                }
                if let Some(line) = format_event(&event) {
                    println!("{}", line);
                }
            }
        }

        let metrics = handle.metrics();
        let outcome = handle.join()?;
        info!(
            "Frames: {} assembled, {} rejected ({:.1}%); {} noise bytes ({:.1}%)",
            metrics.frames_assembled,
            metrics.frames_rejected,
            metrics.reject_rate(),
            metrics.bytes_discarded,
            metrics.noise_rate()
        );

        match outcome {
            LifecycleOutcome::Cancelled => {
                println!("Application stopped by user.");
                Ok(())
            },
            failed @ LifecycleOutcome::Failed { .. } => bail!("Lifecycle {}", failed),
        }
    }
}
