//! 解码命令
//!
//! 解码单个十六进制编码的数据帧，用于离线调试抓包数据。

use crate::display::format_record;
use anyhow::{Context, Result};
use clap::Args;
use racebox_protocol::{DecoderConfig, RecordDecoder};

/// 解码命令参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// 十六进制帧（允许空格）
    #[arg(required = true)]
    pub hex: Vec<String>,

    /// 校验 UBX 校验和
    #[arg(long)]
    pub verify_checksum: bool,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

impl DecodeCommand {
    pub fn execute(&self) -> Result<()> {
        let text: String = self.hex.concat().split_whitespace().collect();
        let bytes = hex::decode(&text).context("无效的十六进制输入")?;

        let decoder = RecordDecoder::with_config(DecoderConfig {
            verify_checksum: self.verify_checksum,
            ..DecoderConfig::default()
        });
        let record = decoder.decode(&bytes).context("帧被拒绝")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!("{}", format_record(&record));
        }
        Ok(())
    }
}
