//! 配置管理命令

use crate::config::{RaceboxConfig, default_config_path};
use anyhow::{Result, bail};
use clap::Subcommand;
use std::path::PathBuf;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前生效的配置
    Show {
        /// 配置文件路径（默认 ~/.config/racebox/config.toml）
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// 写入默认配置文件
    Init {
        /// 配置文件路径（默认 ~/.config/racebox/config.toml）
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { path } => Self::show_(path),
            ConfigCommand::Init { path, force } => Self::init_(path, force),
        }
    }

    fn show_(path: Option<PathBuf>) -> Result<()> {
        let config = RaceboxConfig::load(path.as_deref())?;
        let source = match path {
            Some(path) => path.display().to_string(),
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    path.display().to_string()
                } else {
                    "(defaults)".to_string()
                }
            },
        };

        println!("# source: {}", source);
        print!("{}", config.to_toml()?);
        Ok(())
    }

    fn init_(path: Option<PathBuf>, force: bool) -> Result<()> {
        let path = match path {
            Some(path) => path,
            None => default_config_path()?,
        };
        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }

        RaceboxConfig::default().save(&path)?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
