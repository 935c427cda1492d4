//! CLI 配置文件
//!
//! 默认位置：`~/.config/racebox/config.toml`（由 `dirs::config_dir()` 决定）。
//! 所有字段都有默认值，配置文件可以只写需要覆盖的部分。
//!
//! ```toml
//! [device]
//! name_prefixes = ["RaceBox Mini ", "RaceBox Mini S ", "RaceBox Micro "]
//! max_retries = 3
//! retry_delay_ms = 5000
//! sampling_rate = 0
//!
//! [bluetooth]
//! scan_interval_ms = 1000
//! connect_timeout_ms = 10000
//! desired_mtu = 247
//! idle_timeout_ms = 0
//!
//! [display]
//! start_enabled = false
//! clear_screen = true
//! show_controls = true
//! ```

use anyhow::{Context, Result};
use racebox_driver::config::DEFAULT_NAME_PREFIXES;
use racebox_driver::{DisplayThrottle, LifecycleConfig, RetryPolicy};
use racebox_protocol::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("racebox");
    path.push("config.toml");
    Ok(path)
}

/// 设备相关配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    /// 设备名称前缀
    pub name_prefixes: Vec<String>,
    /// 最大重试次数（整个运行期间累计）
    pub max_retries: u32,
    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,
    /// 显示频率（Hz），0 表示每条记录都显示
    pub sampling_rate: u32,
    /// 校验 UBX 校验和
    pub verify_checksum: bool,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name_prefixes: DEFAULT_NAME_PREFIXES.iter().map(|s| s.to_string()).collect(),
            max_retries: 3,
            retry_delay_ms: 5000,
            sampling_rate: 0,
            verify_checksum: false,
        }
    }
}

/// 链路相关配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothSection {
    pub scan_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub desired_mtu: u16,
    /// 无数据超时（毫秒），0 表示不检测
    pub idle_timeout_ms: u64,
}

impl Default for BluetoothSection {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1000,
            connect_timeout_ms: 10_000,
            desired_mtu: 247,
            idle_timeout_ms: 0,
        }
    }
}

/// 终端显示配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// 启动时是否显示数据
    pub start_enabled: bool,
    /// 每条记录前清屏
    pub clear_screen: bool,
    /// 显示按键提示
    pub show_controls: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            start_enabled: false,
            clear_screen: true,
            show_controls: true,
        }
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceboxConfig {
    pub device: DeviceSection,
    pub bluetooth: BluetoothSection,
    pub display: DisplaySection,
}

impl RaceboxConfig {
    /// 加载配置；未指定路径且默认文件不存在时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置失败")
    }

    /// 写入配置文件（自动创建目录）
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }
        fs::write(path, self.to_toml()?).context("写入配置文件失败")?;
        Ok(())
    }

    /// 转换为生命周期配置
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            name_prefixes: self.device.name_prefixes.clone(),
            scan_interval: Duration::from_millis(self.bluetooth.scan_interval_ms),
            connect_timeout: Duration::from_millis(self.bluetooth.connect_timeout_ms),
            desired_mtu: self.bluetooth.desired_mtu,
            retry: RetryPolicy {
                max_retries: self.device.max_retries,
                retry_delay: Duration::from_millis(self.device.retry_delay_ms),
            },
            stream_idle_timeout: (self.bluetooth.idle_timeout_ms > 0)
                .then(|| Duration::from_millis(self.bluetooth.idle_timeout_ms)),
            display_interval: DisplayThrottle::from_rate_hz(self.device.sampling_rate).interval(),
            decoder: DecoderConfig {
                verify_checksum: self.device.verify_checksum,
                ..DecoderConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_lifecycle_default() {
        let config = RaceboxConfig::default();
        assert_eq!(config.lifecycle_config(), LifecycleConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RaceboxConfig::from_toml(
            r#"
[device]
max_retries = 7

[display]
clear_screen = false
"#,
        )
        .unwrap();

        assert_eq!(config.device.max_retries, 7);
        assert_eq!(config.device.retry_delay_ms, 5000);
        assert!(!config.display.clear_screen);
        assert!(config.display.show_controls);
        assert_eq!(config.bluetooth, BluetoothSection::default());
    }

    #[test]
    fn test_lifecycle_conversion() {
        let mut config = RaceboxConfig::default();
        config.device.sampling_rate = 25;
        config.device.verify_checksum = true;
        config.bluetooth.idle_timeout_ms = 1500;

        let lifecycle = config.lifecycle_config();
        assert_eq!(lifecycle.display_interval, Duration::from_millis(40));
        assert_eq!(lifecycle.stream_idle_timeout, Some(Duration::from_millis(1500)));
        assert!(lifecycle.decoder.verify_checksum);

        config.device.sampling_rate = 0;
        assert_eq!(config.lifecycle_config().display_interval, Duration::ZERO);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(RaceboxConfig::from_toml("[device]\nmax_retries = \"many\"").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RaceboxConfig::default();
        config.device.name_prefixes = vec!["RaceBox Micro ".to_string()];
        config.save(&path).unwrap();

        assert_eq!(RaceboxConfig::from_file(&path).unwrap(), config);
    }
}
