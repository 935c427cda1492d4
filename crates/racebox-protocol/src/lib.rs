//! # RaceBox Protocol
//!
//! RaceBox 数据流协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 帧格式与字段偏移常量
//! - `checksum`: UBX Fletcher-8 校验和
//! - `assembler`: 字节流重组（`FrameAssembler`）
//! - `decoder`: 数据帧解码（`RecordDecoder`）
//!
//! ## 字节序
//!
//! 协议使用 Intel (LSB) 低位在前（小端字节序），有符号字段为二进制补码。
//! 本模块提供了字节序转换工具函数。

pub mod assembler;
pub mod checksum;
pub mod constants;
pub mod decoder;

// 重新导出常用类型
pub use assembler::{FrameAssembler, Frames};
pub use checksum::ubx_checksum;
pub use constants::*;
pub use decoder::*;

/// RaceBox 数据帧（UBX 封装，固定 88 字节）
///
/// # 帧格式
///
/// ```text
/// ┌────────┬───────┬────┬────────┬──────────────────┬──────────┐
/// │ B5 62  │ class │ id │ len LE │ payload (80 B)   │ CK_A CK_B│
/// └────────┴───────┴────┴────────┴──────────────────┴──────────┘
///   0..2     2       3    4..6     6..86              86..88
/// ```
///
/// # 设计特性
///
/// - **Copy trait**：固定大小数组，无堆分配
/// - **构造即校验**：`from_slice()` 保证长度与起始标记正确
/// - **保留原始字节**：解码后的 `Record` 持有原始帧，便于诊断
///
/// # 示例
///
/// ```rust
/// use racebox_protocol::{RaceboxFrame, PAYLOAD_LEN};
///
/// let frame = RaceboxFrame::from_payload(&[0u8; PAYLOAD_LEN]);
/// assert_eq!(&frame.as_bytes()[..2], &[0xB5, 0x62]);
/// assert!(frame.has_valid_checksum());
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RaceboxFrame {
    data: [u8; FRAME_LEN],
}

impl RaceboxFrame {
    /// 从字节切片构造帧
    ///
    /// # 错误
    /// - `ProtocolError::InvalidLength`: 长度不等于 `FRAME_LEN`
    /// - `ProtocolError::InvalidMarker`: 前两个字节不是 `0xB5 0x62`
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }

        if bytes[..MARKER.len()] != MARKER {
            return Err(ProtocolError::InvalidMarker {
                found: [bytes[0], bytes[1]],
            });
        }

        let mut data = [0u8; FRAME_LEN];
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// 由 80 字节负载构建完整帧（填充 UBX 头部和校验和）
    ///
    /// 用于回放数据生成和测试。
    pub fn from_payload(payload: &[u8; PAYLOAD_LEN]) -> Self {
        let mut data = [0u8; FRAME_LEN];
        data[..MARKER.len()].copy_from_slice(&MARKER);
        data[CLASS_OFFSET] = RACEBOX_CLASS;
        data[MSG_ID_OFFSET] = RACEBOX_DATA_MSG_ID;
        data[LENGTH_OFFSET..HEADER_LEN].copy_from_slice(&(PAYLOAD_LEN as u16).to_le_bytes());
        data[HEADER_LEN..CHECKSUM_OFFSET].copy_from_slice(payload);
        let ck = ubx_checksum(&data[CLASS_OFFSET..CHECKSUM_OFFSET]);
        data[CHECKSUM_OFFSET..].copy_from_slice(&ck);
        Self { data }
    }

    /// 组帧器内部使用：调用方已保证长度和起始标记
    pub(crate) fn from_array(data: [u8; FRAME_LEN]) -> Self {
        debug_assert_eq!(data[..MARKER.len()], MARKER);
        Self { data }
    }

    /// 完整帧字节
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.data
    }

    /// 负载（80 字节，字段偏移均相对于此切片）
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_LEN..CHECKSUM_OFFSET]
    }

    /// 消息类别
    pub fn class(&self) -> u8 {
        self.data[CLASS_OFFSET]
    }

    /// 消息 ID
    pub fn msg_id(&self) -> u8 {
        self.data[MSG_ID_OFFSET]
    }

    /// 头部声明的负载长度
    pub fn declared_payload_len(&self) -> u16 {
        u16::from_le_bytes([self.data[LENGTH_OFFSET], self.data[LENGTH_OFFSET + 1]])
    }

    /// 帧尾携带的校验和
    pub fn checksum(&self) -> [u8; 2] {
        [self.data[CHECKSUM_OFFSET], self.data[CHECKSUM_OFFSET + 1]]
    }

    /// 按帧内容重新计算的校验和
    pub fn computed_checksum(&self) -> [u8; 2] {
        ubx_checksum(&self.data[CLASS_OFFSET..CHECKSUM_OFFSET])
    }

    /// 校验和是否匹配
    pub fn has_valid_checksum(&self) -> bool {
        self.checksum() == self.computed_checksum()
    }
}

impl std::fmt::Debug for RaceboxFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceboxFrame")
            .field("class", &format_args!("0x{:02X}", self.class()))
            .field("msg_id", &format_args!("0x{:02X}", self.msg_id()))
            .field("len", &self.declared_payload_len())
            .field("checksum", &format_args!("{:02X?}", self.checksum()))
            .finish()
    }
}

impl AsRef<[u8]> for RaceboxFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<&[u8]> for RaceboxFrame {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

// serde 不支持长度 > 32 的数组，按字节串序列化
#[cfg(feature = "serde")]
impl serde::Serialize for RaceboxFrame {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.data)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RaceboxFrame {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = serde::Deserialize::deserialize(deserializer)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid start marker: {found:02X?}")]
    InvalidMarker { found: [u8; 2] },

    #[error("Truncated field at payload offset {offset} (width {width})")]
    Truncated { offset: usize, width: usize },

    #[error("Checksum mismatch: frame carries {actual:02X?}, computed {expected:02X?}")]
    ChecksumMismatch { expected: [u8; 2], actual: [u8; 2] },

    #[error("Value out of range for field {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

// ============================================================================
// 字节序转换工具函数
// ============================================================================

/// 小端字节序转 i32
pub fn bytes_to_i32_le(bytes: [u8; 4]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// 从负载中读取 i32（越界返回 `Truncated`）
pub fn read_i32_le(payload: &[u8], offset: usize) -> Result<i32, ProtocolError> {
    payload
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(bytes_to_i32_le)
        .ok_or(ProtocolError::Truncated { offset, width: 4 })
}

/// 从负载中读取 i16（越界返回 `Truncated`）
pub fn read_i16_le(payload: &[u8], offset: usize) -> Result<i16, ProtocolError> {
    payload
        .get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(bytes_to_i16_le)
        .ok_or(ProtocolError::Truncated { offset, width: 2 })
}

/// 从负载中读取 u8（越界返回 `Truncated`）
pub fn read_u8(payload: &[u8], offset: usize) -> Result<u8, ProtocolError> {
    payload
        .get(offset)
        .copied()
        .ok_or(ProtocolError::Truncated { offset, width: 1 })
}
