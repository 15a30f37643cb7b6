//! 编码结果报告 (JSON).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use lanya_codec::encoders::sbc::split_frames;
use lanya_codec::{SbcEncoder, SbcMode};
use serde::Serialize;

/// 编码结果
#[derive(Debug, Serialize)]
pub struct EncodeReport {
    /// "sbc" 或 "msbc"
    pub codec: &'static str,
    pub sample_rate: u32,
    pub channels: usize,
    pub channel_mode: &'static str,
    pub subbands: usize,
    pub blocks: usize,
    pub allocation: &'static str,
    pub bitpool: u8,
    /// 单帧长度 (字节)
    pub frame_length: usize,
    pub frames: usize,
    pub bytes: usize,
    /// 末帧补零的采样数 (交错)
    pub padded_samples: usize,
    /// 时长 (秒)
    pub duration: f64,
    /// 实际码率 (bits/s)
    pub bitrate: u32,
    /// 复核输出时 CRC 不一致的帧数
    pub crc_errors: usize,
}

impl EncodeReport {
    /// 由编码器与输出码流生成报告, 码流会被重新切帧校验
    pub fn new(encoder: &SbcEncoder, stream: &[u8], padded_samples: usize) -> Result<Self> {
        let frames = split_frames(stream).context("复核输出码流失败")?;
        let crc_errors = frames.iter().filter(|(info, _)| !info.crc_ok).count();

        let params = encoder.params();
        let sample_rate = params.frequency.hz();
        let duration =
            (frames.len() * encoder.samples_per_frame()) as f64 / f64::from(sample_rate);
        Ok(Self {
            codec: match params.mode {
                SbcMode::Standard => "sbc",
                SbcMode::Msbc => "msbc",
            },
            sample_rate,
            channels: params.channels(),
            channel_mode: params.channel_mode.name(),
            subbands: params.subbands,
            blocks: params.blocks,
            allocation: params.allocation.name(),
            bitpool: params.bitpool,
            frame_length: params.frame_length(),
            frames: frames.len(),
            bytes: stream.len(),
            padded_samples,
            duration,
            bitrate: params.bitrate(),
            crc_errors,
        })
    }

    /// 写入 JSON 文件
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("无法创建报告文件 '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("写入报告文件 '{}' 失败", path.display()))?;
        writer.flush()?;
        Ok(())
    }
}
