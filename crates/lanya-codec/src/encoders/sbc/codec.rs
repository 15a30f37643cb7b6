//! SBC 编码器的 `Encoder` trait 实现.
//!
//! 接收任意长度的 PCM 帧, 内部缓冲到整帧后编码, 每个 SBC 帧输出一个数据包.

use std::collections::VecDeque;

use bytes::Bytes;
use lanya_core::{LanyaError, LanyaResult};
use log::{debug, warn};

use super::codec_info::SbcCodecInfo;
use super::config::{ChannelMode, DEFAULT_BITRATE_KBPS, SamplingFrequency, SbcConfig};
use super::{SbcEncoder, fit_bitpool_range};
use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::encoder::Encoder;
use crate::frame::{AudioFrame, NOPTS_VALUE};
use crate::packet::Packet;

/// SBC / mSBC 编码器 (数据包接口)
pub struct SbcCodec {
    /// 编码器标识 (Sbc 或 Msbc)
    codec_id: CodecId,
    /// 底层编码器, `open()` 之前为 None
    encoder: Option<SbcEncoder>,
    /// 不足一帧的交错采样
    pending: Vec<i16>,
    /// 待取出的数据包
    packets: VecDeque<Packet>,
    /// 下一个数据包的时间戳 (采样)
    next_pts: i64,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl SbcCodec {
    /// 创建未打开的编码器
    pub fn new(codec_id: CodecId) -> Self {
        Self {
            codec_id,
            encoder: None,
            pending: Vec::new(),
            packets: VecDeque::new(),
            next_pts: 0,
            flushing: false,
        }
    }

    /// 创建 SBC 编码器实例
    pub fn create() -> LanyaResult<Box<dyn Encoder>> {
        Ok(Box::new(Self::new(CodecId::Sbc)))
    }

    /// 创建 mSBC 编码器实例
    pub fn create_msbc() -> LanyaResult<Box<dyn Encoder>> {
        Ok(Box::new(Self::new(CodecId::Msbc)))
    }

    /// 底层编码器 (已打开时)
    pub fn encoder(&self) -> Option<&SbcEncoder> {
        self.encoder.as_ref()
    }

    fn open_msbc(params: &CodecParameters) -> LanyaResult<SbcEncoder> {
        if let Some(audio) = params.audio() {
            if audio.sample_rate != 16000 || audio.channels != 1 {
                return Err(LanyaError::InvalidArgument(format!(
                    "mSBC 只支持 16000 Hz 单声道, 实际 {} Hz {} 声道",
                    audio.sample_rate, audio.channels,
                )));
            }
        }
        Ok(SbcEncoder::msbc())
    }

    fn open_sbc(params: &CodecParameters) -> LanyaResult<SbcEncoder> {
        let bitrate_kbps = match params.bit_rate {
            0 => DEFAULT_BITRATE_KBPS,
            bps => u32::try_from(bps / 1000).unwrap_or(u32::MAX),
        };

        if !params.extra_data.is_empty() {
            let info = SbcCodecInfo::parse(&params.extra_data)?;
            let config = info.to_config(bitrate_kbps);
            if let Some(audio) = params.audio() {
                if audio.sample_rate != config.frequency.hz()
                    || audio.channels as usize != config.channel_mode.channels()
                {
                    return Err(LanyaError::InvalidArgument(format!(
                        "音频参数 {} Hz {} 声道与 SBC 编码信息 {} Hz {} 不一致",
                        audio.sample_rate,
                        audio.channels,
                        config.frequency.hz(),
                        config.channel_mode,
                    )));
                }
            }

            let fit = fit_bitpool_range(&config, info.min_bitpool, info.max_bitpool)?;
            let bitpool = fit.bitpool.clamp(info.min_bitpool, info.max_bitpool);
            if !fit.in_range {
                warn!(
                    "无法通过调整码率满足比特池范围 {}..={}, 直接使用比特池 {}",
                    info.min_bitpool, info.max_bitpool, bitpool,
                );
            }
            let config = SbcConfig {
                bitrate_kbps: fit.bitrate_kbps,
                ..config
            };
            return Ok(SbcEncoder::with_bitpool(config, bitpool));
        }

        let audio = params
            .audio()
            .ok_or_else(|| LanyaError::InvalidArgument("SBC 编码器需要音频参数".into()))?;
        let frequency = SamplingFrequency::from_hz(audio.sample_rate).ok_or_else(|| {
            LanyaError::Unsupported(format!("SBC 不支持采样率 {} Hz", audio.sample_rate))
        })?;
        let channel_mode = match audio.channels {
            1 => ChannelMode::Mono,
            2 => ChannelMode::JointStereo,
            n => {
                return Err(LanyaError::Unsupported(format!("SBC 不支持 {} 声道", n)));
            }
        };

        Ok(SbcEncoder::new(SbcConfig {
            frequency,
            channel_mode,
            bitrate_kbps,
            ..SbcConfig::default()
        }))
    }

    /// 把缓冲区中的整帧采样编码为数据包
    fn drain_frames(&mut self) -> LanyaResult<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(LanyaError::NotInitialized("请先调用 open()".into()));
        };
        let per_frame = encoder.pcm_samples_per_frame();
        let frame_count = self.pending.len() / per_frame;
        if frame_count == 0 {
            return Ok(());
        }

        let mut out = Vec::new();
        let summary = encoder.encode(&self.pending, frame_count, &mut out)?;
        self.pending.drain(..summary.samples_consumed);

        let data = Bytes::from(out);
        let frame_len = encoder.frame_length();
        let duration = encoder.samples_per_frame() as i64;
        for i in 0..frame_count {
            let mut pkt = Packet::from_data(data.slice(i * frame_len..(i + 1) * frame_len));
            pkt.pts = self.next_pts;
            pkt.duration = duration;
            self.next_pts += duration;
            self.packets.push_back(pkt);
        }
        Ok(())
    }
}

impl Encoder for SbcCodec {
    fn codec_id(&self) -> CodecId {
        self.codec_id
    }

    fn name(&self) -> &str {
        self.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> LanyaResult<()> {
        let encoder = match self.codec_id {
            CodecId::Msbc => Self::open_msbc(params)?,
            CodecId::Sbc => Self::open_sbc(params)?,
        };

        debug!(
            "打开 {} 编码器: {} Hz, {} 声道, 比特池={}, 帧长={} 字节",
            self.codec_id,
            encoder.params().frequency.hz(),
            encoder.channels(),
            encoder.bitpool(),
            encoder.frame_length(),
        );

        self.encoder = Some(encoder);
        self.pending.clear();
        self.packets.clear();
        self.next_pts = 0;
        self.flushing = false;
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> LanyaResult<()> {
        let Some(encoder) = self.encoder.as_ref() else {
            return Err(LanyaError::NotInitialized("请先调用 open()".into()));
        };
        if self.flushing {
            return Err(LanyaError::InvalidArgument(
                "编码器已刷新, 需要重新 open()".into(),
            ));
        }

        let Some(frame) = frame else {
            self.flushing = true;
            let per_frame = encoder.pcm_samples_per_frame();
            if !self.pending.is_empty() {
                let padding = per_frame - self.pending.len() % per_frame;
                warn!("末尾不足一帧, 补零 {} 个采样", padding);
                self.pending.resize(self.pending.len() + padding, 0);
            }
            return self.drain_frames();
        };

        if frame.channels as usize != encoder.channels() {
            return Err(LanyaError::InvalidArgument(format!(
                "声道数不匹配: 编码器 {}, 输入帧 {}",
                encoder.channels(),
                frame.channels,
            )));
        }
        let sample_rate = encoder.params().frequency.hz();
        if frame.sample_rate != 0 && frame.sample_rate != sample_rate {
            return Err(LanyaError::InvalidArgument(format!(
                "采样率不匹配: 编码器 {} Hz, 输入帧 {} Hz",
                sample_rate, frame.sample_rate,
            )));
        }

        if self.pending.is_empty() && frame.pts != NOPTS_VALUE {
            self.next_pts = frame.pts;
        }
        self.pending.extend_from_slice(frame.interleaved());
        self.drain_frames()
    }

    fn receive_packet(&mut self) -> LanyaResult<Packet> {
        if self.encoder.is_none() {
            return Err(LanyaError::NotInitialized("请先调用 open()".into()));
        }
        if let Some(pkt) = self.packets.pop_front() {
            return Ok(pkt);
        }
        if self.flushing {
            return Err(LanyaError::Eof);
        }
        Err(LanyaError::NeedMoreData)
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.reset();
        }
        self.pending.clear();
        self.packets.clear();
        self.next_pts = 0;
        self.flushing = false;
    }
}
