//! Pipeline 数据流模块
//!
//! 负责把传输层的字节分片依次送入组帧器和解码器，再按显示开关转发记录。
//! 不做任何阻塞操作，所有等待都在生命周期循环中完成。

use crate::display::{DisplayFlag, DisplayThrottle, RecordSink};
use crate::metrics::StreamMetrics;
use racebox_protocol::{FrameAssembler, RecordDecoder};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{debug, trace};

/// 组帧 + 解码 + 显示过滤
pub struct StreamPipeline {
    assembler: FrameAssembler,
    decoder: RecordDecoder,
    display: DisplayFlag,
    throttle: DisplayThrottle,
    metrics: Arc<StreamMetrics>,
}

impl StreamPipeline {
    pub fn new(
        decoder: RecordDecoder,
        display: DisplayFlag,
        throttle: DisplayThrottle,
        metrics: Arc<StreamMetrics>,
    ) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            decoder,
            display,
            throttle,
            metrics,
        }
    }

    /// 处理一个通知分片
    ///
    /// 记录总是被解码；显示开关关闭时直接丢弃，不缓存。
    pub fn process_chunk<S: RecordSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut S) {
        let discarded_before = self.assembler.discarded_bytes();
        self.metrics
            .bytes_received
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);

        for frame in self.assembler.add_data(chunk) {
            self.metrics.frames_assembled.fetch_add(1, Ordering::Relaxed);

            let record = match self.decoder.decode_frame(&frame) {
                Ok(record) => record,
                Err(e) => {
                    debug!("Dropping frame: {}", e);
                    self.metrics.frames_rejected.fetch_add(1, Ordering::Relaxed);
                    continue;
                },
            };
            self.metrics.records_decoded.fetch_add(1, Ordering::Relaxed);

            if self.display.is_enabled() && self.throttle.should_show(Instant::now()) {
                sink.show(&record);
                self.metrics.records_displayed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let discarded = self.assembler.discarded_bytes() - discarded_before;
        if discarded > 0 {
            trace!("Discarded {} noise bytes", discarded);
            self.metrics
                .bytes_discarded
                .fetch_add(discarded, Ordering::Relaxed);
        }
    }

    /// 清空组帧缓冲区（新会话开始时调用）
    pub fn reset(&mut self) {
        if self.assembler.buffered_len() > 0 {
            debug!(
                "Clearing {} buffered bytes from previous session",
                self.assembler.buffered_len()
            );
        }
        self.assembler.reset();
    }

    pub fn buffered_len(&self) -> usize {
        self.assembler.buffered_len()
    }

    pub fn display(&self) -> &DisplayFlag {
        &self.display
    }
}
