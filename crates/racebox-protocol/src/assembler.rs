//! 字节流组帧器
//!
//! 传输层的通知分片与帧边界无关：一次通知可能包含半帧、一帧或多帧，
//! 也可能夹杂噪声字节。`FrameAssembler` 缓存收到的字节，
//! 在找到起始标记且长度足够时切出完整帧。
//!
//! # 重同步
//!
//! 缓冲区开头不是起始标记时，丢弃开头字节直到出现标记（或只剩 1 字节，
//! 该字节可能是被切开的标记前半部分）。
//!
//! # 缓冲区
//!
//! 使用 `BytesMut` 作为带读游标的缓冲区：`advance()` 和 `split_to()` 只移动游标，
//! 丢弃字节不会触发整体搬移。
//!
//! # 示例
//!
//! ```rust
//! use racebox_protocol::{FrameAssembler, RaceboxFrame, PAYLOAD_LEN};
//!
//! let frame = RaceboxFrame::from_payload(&[0u8; PAYLOAD_LEN]);
//! let bytes = frame.as_bytes();
//!
//! let mut assembler = FrameAssembler::new();
//! assert_eq!(assembler.add_data(&bytes[..40]).count(), 0);
//!
//! let frames: Vec<_> = assembler.add_data(&bytes[40..]).collect();
//! assert_eq!(frames, vec![frame]);
//! ```

use crate::{FRAME_LEN, MARKER, RaceboxFrame};
use bytes::{Buf, BytesMut};
use std::iter::FusedIterator;

/// 初始缓冲容量（足够容纳多个 BLE 通知）
const INITIAL_CAPACITY: usize = 1024;

/// 字节流组帧器
///
/// 缓冲区在整个连接期间保持，仅在重连时通过 `reset()` 清空。
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: BytesMut,
    /// 累计丢弃的噪声字节数
    discarded_bytes: u64,
    /// 累计输出的帧数
    frames_emitted: u64,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            discarded_bytes: 0,
            frames_emitted: 0,
        }
    }

    /// 追加一段数据，返回本次可提取帧的惰性迭代器
    ///
    /// 迭代器未消费完的帧保留在缓冲区中，下一次调用时继续输出，不会丢失或重复。
    /// 空切片不改变任何状态。
    pub fn add_data(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(chunk);
        Frames { assembler: self }
    }

    /// 尝试从缓冲区提取下一帧
    pub fn next_frame(&mut self) -> Option<RaceboxFrame> {
        loop {
            if self.buffer.len() < MARKER.len() {
                return None;
            }

            if self.buffer[..MARKER.len()] != MARKER {
                // 等价于逐字节丢弃：直接跳到下一个候选标记，找不到时保留最后 1 字节
                let skip = find_marker(&self.buffer).unwrap_or(self.buffer.len() - 1);
                self.buffer.advance(skip);
                self.discarded_bytes += skip as u64;
                continue;
            }

            if self.buffer.len() < FRAME_LEN {
                return None;
            }

            let raw = self.buffer.split_to(FRAME_LEN);
            let mut data = [0u8; FRAME_LEN];
            data.copy_from_slice(&raw);
            self.frames_emitted += 1;
            return Some(RaceboxFrame::from_array(data));
        }
    }

    /// 清空缓冲区（重连时调用）
    ///
    /// 统计计数不清零。
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// 当前缓存的字节数
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// 累计丢弃的噪声字节数
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded_bytes
    }

    /// 累计输出的帧数
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }
}

/// 查找起始标记位置
fn find_marker(buffer: &[u8]) -> Option<usize> {
    buffer.windows(MARKER.len()).position(|w| w == MARKER)
}

/// `FrameAssembler::add_data()` 返回的帧迭代器
pub struct Frames<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for Frames<'_> {
    type Item = RaceboxFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.assembler.next_frame()
    }
}

// 迭代器独占 assembler，返回 None 后缓冲区不会再增长
impl FusedIterator for Frames<'_> {}
