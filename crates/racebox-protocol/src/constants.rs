//! 协议常量定义
//!
//! 帧结构遵循 u-blox UBX 封装；RaceBox 数据消息为 class 0xFF / id 0x01，
//! 负载固定 80 字节。

/// 起始标记第一字节
pub const SYNC_CHAR_1: u8 = 0xB5;
/// 起始标记第二字节
pub const SYNC_CHAR_2: u8 = 0x62;
/// 帧起始标记
pub const MARKER: [u8; 2] = [SYNC_CHAR_1, SYNC_CHAR_2];

pub const CLASS_OFFSET: usize = 2;
pub const MSG_ID_OFFSET: usize = 3;
pub const LENGTH_OFFSET: usize = 4;

/// 头部长度：marker(2) + class(1) + id(1) + len(2)
pub const HEADER_LEN: usize = 6;
/// RaceBox 数据消息负载长度
pub const PAYLOAD_LEN: usize = 80;
pub const CHECKSUM_LEN: usize = 2;
pub const CHECKSUM_OFFSET: usize = HEADER_LEN + PAYLOAD_LEN;
/// 完整帧长度（88 字节）
pub const FRAME_LEN: usize = HEADER_LEN + PAYLOAD_LEN + CHECKSUM_LEN;

pub const RACEBOX_CLASS: u8 = 0xFF;
pub const RACEBOX_DATA_MSG_ID: u8 = 0x01;

// ============================================================================
// 负载字段偏移（相对于负载起始位置）
// ============================================================================

pub const FIX_STATUS_OFFSET: usize = 20;
pub const SATELLITES_OFFSET: usize = 23;
pub const LONGITUDE_OFFSET: usize = 24;
pub const LATITUDE_OFFSET: usize = 28;
pub const ALTITUDE_WGS_OFFSET: usize = 32;
pub const ALTITUDE_MSL_OFFSET: usize = 36;
pub const SPEED_OFFSET: usize = 48;
pub const ACC_X_OFFSET: usize = 68;
pub const ACC_Y_OFFSET: usize = 70;
pub const ACC_Z_OFFSET: usize = 72;
pub const ROT_X_OFFSET: usize = 74;
pub const ROT_Y_OFFSET: usize = 76;
pub const ROT_Z_OFFSET: usize = 78;

// ============================================================================
// 单位换算
// ============================================================================

/// 经纬度：1e-7 度
pub const COORDINATE_SCALE: f64 = 10_000_000.0;
/// 高度：毫米 → 米
pub const ALTITUDE_SCALE: f64 = 1_000.0;
/// 速度：mm/s → m/s
pub const SPEED_SCALE: f64 = 1_000.0;
/// m/s → km/h
pub const MS_TO_KMH: f64 = 3.6;
/// 加速度：milli-g → g
pub const ACC_SCALE: f64 = 1_000.0;
/// 角速度：centi-deg/s → deg/s
pub const ROT_SCALE: f64 = 100.0;

/// 定位状态字节：3 表示 3D 定位
pub const FIX_STATUS_3D: u8 = 3;
