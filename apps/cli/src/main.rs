//! # RaceBox CLI
//!
//! Command-line monitor and debug tool for RaceBox telemetry devices.
//!
//! ```bash
//! # 写入默认配置
//! racebox-cli config init
//!
//! # 通过 BLE-TCP 桥接监控设备（q + Enter 切换显示）
//! racebox-cli monitor --bridge 192.168.1.20:7000
//!
//! # 回放抓包文件
//! racebox-cli monitor --replay capture.bin --display
//!
//! # 解码单个帧
//! racebox-cli decode B562FF015000...
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod display;
mod input;

use commands::{ConfigCommand, DecodeCommand, MonitorCommand};

/// RaceBox CLI - 遥测数据监控工具
#[derive(Parser, Debug)]
#[command(name = "racebox-cli")]
#[command(about = "Command-line monitor and debug tool for RaceBox telemetry devices", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 监控设备数据流
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 解码单个十六进制帧
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("racebox_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor { args } => args.execute(),
        Commands::Decode { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
