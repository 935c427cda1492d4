//! 数据帧解码
//!
//! 将一帧 RaceBox 数据消息解码为 `Record`（运动数据 + 定位数据）。
//! 所有失败都以 `ProtocolError` 返回，不会 panic；调用方记录日志后继续处理下一帧。

use crate::*;

/// 定位状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixStatus {
    /// 未定位（状态字节 != 3）
    #[default]
    NoFix,
    /// 3D 定位（状态字节 == 3）
    Fix3D,
}

impl FixStatus {
    /// 从状态字节转换
    pub fn from_raw(value: u8) -> Self {
        if value == FIX_STATUS_3D {
            Self::Fix3D
        } else {
            Self::NoFix
        }
    }

    pub fn is_fixed(self) -> bool {
        self == Self::Fix3D
    }
}

impl std::fmt::Display for FixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixStatus::NoFix => write!(f, "no fix"),
            FixStatus::Fix3D => write!(f, "3D fix"),
        }
    }
}

/// 运动数据（IMU）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionData {
    /// X 轴加速度（g）
    pub acc_x: f64,
    /// Y 轴加速度（g）
    pub acc_y: f64,
    /// Z 轴加速度（g）
    pub acc_z: f64,
    /// X 轴角速度（deg/s）
    pub rot_x: f64,
    /// Y 轴角速度（deg/s）
    pub rot_y: f64,
    /// Z 轴角速度（deg/s）
    pub rot_z: f64,
}

impl MotionData {
    /// 从负载解析运动数据
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let acc = |offset| read_i16_le(payload, offset).map(|v| v as f64 / ACC_SCALE);
        let rot = |offset| read_i16_le(payload, offset).map(|v| v as f64 / ROT_SCALE);

        Ok(Self {
            acc_x: acc(ACC_X_OFFSET)?,
            acc_y: acc(ACC_Y_OFFSET)?,
            acc_z: acc(ACC_Z_OFFSET)?,
            rot_x: rot(ROT_X_OFFSET)?,
            rot_y: rot(ROT_Y_OFFSET)?,
            rot_z: rot(ROT_Z_OFFSET)?,
        })
    }
}

/// 定位数据（GNSS）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationData {
    /// 纬度（度）
    pub latitude: f64,
    /// 经度（度）
    pub longitude: f64,
    /// 地速（km/h）
    pub speed_kmh: f64,
    /// 参与解算的卫星数
    pub satellites: u8,
    /// 定位状态
    pub fix_status: FixStatus,
    /// WGS84 椭球高（米）
    pub altitude_wgs: f64,
    /// 海拔高度 MSL（米）
    pub altitude_msl: f64,
}

impl LocationData {
    /// 从负载解析定位数据
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let coordinate = |offset| read_i32_le(payload, offset).map(|v| v as f64 / COORDINATE_SCALE);
        let altitude = |offset| read_i32_le(payload, offset).map(|v| v as f64 / ALTITUDE_SCALE);

        let speed_ms = read_i32_le(payload, SPEED_OFFSET)? as f64 / SPEED_SCALE;

        Ok(Self {
            latitude: coordinate(LATITUDE_OFFSET)?,
            longitude: coordinate(LONGITUDE_OFFSET)?,
            speed_kmh: speed_ms * MS_TO_KMH,
            satellites: read_u8(payload, SATELLITES_OFFSET)?,
            fix_status: FixStatus::from_raw(read_u8(payload, FIX_STATUS_OFFSET)?),
            altitude_wgs: altitude(ALTITUDE_WGS_OFFSET)?,
            altitude_msl: altitude(ALTITUDE_MSL_OFFSET)?,
        })
    }

    /// 检查经纬度是否在合法范围内
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ProtocolError::OutOfRange {
                field: "latitude",
                value: self.latitude,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ProtocolError::OutOfRange {
                field: "longitude",
                value: self.longitude,
            });
        }
        Ok(())
    }
}

/// 解码结果：一帧对应一条记录
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    pub motion: MotionData,
    pub location: LocationData,
    /// 原始帧（诊断用）
    pub raw: RaceboxFrame,
}

/// 解码器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
    /// 校验 UBX 校验和（默认关闭）
    pub verify_checksum: bool,
    /// 拒绝超出范围的经纬度
    pub validate_coordinates: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            verify_checksum: false,
            validate_coordinates: true,
        }
    }
}

/// 数据帧解码器
///
/// 无内部状态：同一帧解码任意次结果相同。
///
/// # 示例
///
/// ```rust
/// use racebox_protocol::{RecordDecoder, ProtocolError};
///
/// let decoder = RecordDecoder::new();
/// let result = decoder.decode(&[0xB5, 0x62, 0x00]);
/// assert!(matches!(result, Err(ProtocolError::InvalidLength { .. })));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDecoder {
    config: DecoderConfig,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 解码任意字节切片（先校验长度和起始标记）
    pub fn decode(&self, bytes: &[u8]) -> Result<Record, ProtocolError> {
        let frame = RaceboxFrame::from_slice(bytes)?;
        self.decode_frame(&frame)
    }

    /// 解码已组好的帧
    pub fn decode_frame(&self, frame: &RaceboxFrame) -> Result<Record, ProtocolError> {
        if self.config.verify_checksum && !frame.has_valid_checksum() {
            return Err(ProtocolError::ChecksumMismatch {
                expected: frame.computed_checksum(),
                actual: frame.checksum(),
            });
        }

        let payload = frame.payload();
        let motion = MotionData::parse(payload)?;
        let location = LocationData::parse(payload)?;

        if self.config.validate_coordinates {
            location.validate()?;
        }

        Ok(Record {
            motion,
            location,
            raw: *frame,
        })
    }
}

impl TryFrom<&RaceboxFrame> for Record {
    type Error = ProtocolError;

    fn try_from(frame: &RaceboxFrame) -> Result<Self, Self::Error> {
        RecordDecoder::new().decode_frame(frame)
    }
}

impl TryFrom<&[u8]> for Record {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        RecordDecoder::new().decode(bytes)
    }
}
