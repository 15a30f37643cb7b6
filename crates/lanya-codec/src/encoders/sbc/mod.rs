//! SBC / mSBC 编码器.
//!
//! 每帧处理流程:
//! 1. 多相分析滤波: 交错 PCM -> 子带采样 (`analysis`, `dct`)
//! 2. 比例因子, 联合立体声时按子带选择和/差编码 (`scale_factor`)
//! 3. 比特分配 (`bit_alloc`)
//! 4. 量化、打包与 CRC (`packer`)
//!
//! 编码器实例持有全部状态 (滤波器历史与写指针), 多个实例互不影响.

mod analysis;
pub mod bit_alloc;
mod codec;
pub mod codec_info;
pub mod config;
mod dct;
pub mod frame_info;
mod packer;
mod scale_factor;
mod tables;

use lanya_core::{LanyaError, LanyaResult};
use log::{debug, trace, warn};

use self::analysis::{AnalysisFilter, SubbandSamples};
use self::config::{MAX_BLOCKS, MAX_CHANNELS, MAX_SUBBANDS};

pub use self::bit_alloc::{BitAllocation, allocate};
pub use self::codec::SbcCodec;
pub use self::codec_info::SbcCodecInfo;
pub use self::config::{
    AllocationMethod, BitpoolFit, BlockCount, ChannelMode, FrameParams, SamplingFrequency,
    SbcConfig, SbcMode, Subbands, bitrate_for, derive_bitpool, fit_bitpool_range, frame_length,
};
pub use self::frame_info::{SbcFrameInfo, split_frames};
pub use self::scale_factor::ScaleFactors;

/// 一次 `encode` 调用的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSummary {
    /// 编码的帧数
    pub frames: usize,
    /// 写入输出缓冲区的字节数
    pub bytes_written: usize,
    /// 消耗的交错 PCM 采样数
    pub samples_consumed: usize,
}

/// SBC 编码器
pub struct SbcEncoder {
    /// 帧参数
    params: FrameParams,
    /// 分析滤波器
    filter: AnalysisFilter,
    /// 当前帧的子带采样
    samples: SubbandSamples,
}

impl SbcEncoder {
    /// 按配置创建编码器, 比特池由码率推导
    pub fn new(config: SbcConfig) -> Self {
        let bitpool = derive_bitpool(&config);
        Self::from_params(config.frame_params(bitpool))
    }

    /// 按配置与显式比特池创建编码器 (超出格式上限时截断)
    pub fn with_bitpool(config: SbcConfig, bitpool: u8) -> Self {
        if bitpool > config.max_bitpool() {
            warn!(
                "比特池 {} 超出 {} 模式上限, 截断为 {}",
                bitpool,
                config.channel_mode,
                config.max_bitpool(),
            );
        }
        Self::from_params(config.frame_params(bitpool))
    }

    /// 创建 mSBC 编码器
    pub fn msbc() -> Self {
        Self::from_params(FrameParams::msbc())
    }

    fn from_params(params: FrameParams) -> Self {
        let filter = AnalysisFilter::new(params.subbands, params.channels());
        debug!(
            "初始化 SBC 编码器: {:?}, {} Hz, {}, {} 子带, {} 块, {}, 比特池={}, 帧长={} 字节, 写指针上限={}",
            params.mode,
            params.frequency.hz(),
            params.channel_mode,
            params.subbands,
            params.blocks,
            params.allocation.name(),
            params.bitpool,
            params.frame_length(),
            filter.max_shift(),
        );
        Self {
            params,
            filter,
            samples: [[[0; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS],
        }
    }

    /// 帧参数
    pub fn params(&self) -> &FrameParams {
        &self.params
    }

    /// 编码模式
    pub fn mode(&self) -> SbcMode {
        self.params.mode
    }

    /// 实际使用的比特池
    pub fn bitpool(&self) -> u8 {
        self.params.bitpool
    }

    /// 帧头第 2 字节
    pub fn header_byte(&self) -> u8 {
        self.params.header_byte()
    }

    /// 帧长度 (字节)
    pub fn frame_length(&self) -> usize {
        self.params.frame_length()
    }

    /// 声道数
    pub fn channels(&self) -> usize {
        self.params.channels()
    }

    /// 每声道每帧采样数
    pub fn samples_per_frame(&self) -> usize {
        self.params.samples_per_frame()
    }

    /// 每帧交错 PCM 采样数
    pub fn pcm_samples_per_frame(&self) -> usize {
        self.params.pcm_samples_per_frame()
    }

    /// 清空滤波器历史, 从新的码流开始
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// 编码 `frame_count` 帧, 追加到 `out`
    ///
    /// `pcm` 为交错 S16 采样, 长度至少为 `frame_count * pcm_samples_per_frame()`,
    /// 否则返回 `InvalidInput` 且不写入任何数据.
    pub fn encode(
        &mut self,
        pcm: &[i16],
        frame_count: usize,
        out: &mut Vec<u8>,
    ) -> LanyaResult<EncodeSummary> {
        let per_frame = self.pcm_samples_per_frame();
        let needed = frame_count
            .checked_mul(per_frame)
            .filter(|&n| n <= pcm.len())
            .ok_or_else(|| {
                LanyaError::InvalidInput(format!(
                    "编码 {} 帧需要 {} x {} 个 PCM 采样, 实际 {} 个",
                    frame_count,
                    frame_count,
                    per_frame,
                    pcm.len(),
                ))
            })?;

        out.reserve(frame_count * self.frame_length());
        let mut bytes_written = 0;
        for frame_pcm in pcm[..needed].chunks_exact(per_frame) {
            bytes_written += self.encode_one(frame_pcm, out);
        }

        trace!("编码 {} 帧, {} 字节", frame_count, bytes_written);
        Ok(EncodeSummary {
            frames: frame_count,
            bytes_written,
            samples_consumed: needed,
        })
    }

    /// 编码单帧
    pub fn encode_frame(&mut self, pcm: &[i16]) -> LanyaResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.frame_length());
        self.encode(pcm, 1, &mut out)?;
        Ok(out)
    }

    fn encode_one(&mut self, pcm: &[i16], out: &mut Vec<u8>) -> usize {
        self.filter.analyze(pcm, self.params.blocks, &mut self.samples);
        let scale = scale_factor::compute(&self.params, &mut self.samples);
        let bits = allocate(&self.params, &scale.scale_factors);
        packer::pack_frame(&self.params, &self.samples, &scale, &bits, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanya_core::bitreader::BitReader;

    /// 交错正弦测试信号
    fn sine_pcm(frames: usize, per_frame: usize, channels: usize, amplitude: f64) -> Vec<i16> {
        let len = frames * per_frame;
        (0..len)
            .map(|i| {
                let t = (i / channels) as f64;
                let ch = (i % channels) as f64;
                let x = (t * 0.0627 * (ch + 1.0)).sin() * 0.7 + (t * 0.31).sin() * 0.3;
                (x * amplitude) as i16
            })
            .collect()
    }

    #[test]
    fn test_默认编码器参数() {
        let enc = SbcEncoder::new(SbcConfig::default());
        assert_eq!(enc.mode(), SbcMode::Standard);
        assert_eq!(enc.bitpool(), 53);
        assert_eq!(enc.frame_length(), 119);
        assert_eq!(enc.header_byte(), 0xBD);
        assert_eq!(enc.samples_per_frame(), 128);
        assert_eq!(enc.pcm_samples_per_frame(), 256);
        assert_eq!(enc.channels(), 2);
    }

    #[test]
    fn test_显式比特池截断() {
        let config = SbcConfig {
            channel_mode: ChannelMode::Mono,
            subbands: Subbands::Four,
            ..SbcConfig::default()
        };
        let enc = SbcEncoder::with_bitpool(config, 200);
        assert_eq!(enc.bitpool(), 64);
        let enc = SbcEncoder::with_bitpool(config, 20);
        assert_eq!(enc.bitpool(), 20);
    }

    #[test]
    fn test_输入不足返回错误() {
        let mut enc = SbcEncoder::new(SbcConfig::default());
        let mut out = vec![0xEE];
        let err = enc.encode(&[0; 511], 2, &mut out).unwrap_err();
        assert!(matches!(err, LanyaError::InvalidInput(_)));
        assert_eq!(out, vec![0xEE]);
        assert!(enc.encode(&[0; 10], usize::MAX, &mut out).is_err());
    }

    #[test]
    fn test_零帧() {
        let mut enc = SbcEncoder::new(SbcConfig::default());
        let mut out = Vec::new();
        let summary = enc.encode(&[], 0, &mut out).unwrap();
        assert_eq!(summary, EncodeSummary::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_编码统计与帧结构() {
        let mut enc = SbcEncoder::new(SbcConfig::default());
        let pcm = sine_pcm(3, 256, 2, 20000.0);
        let mut out = Vec::new();
        let summary = enc.encode(&pcm, 3, &mut out).unwrap();
        assert_eq!(
            summary,
            EncodeSummary {
                frames: 3,
                bytes_written: 357,
                samples_consumed: 768
            }
        );
        assert_eq!(out.len(), 357);
        for (info, bytes) in split_frames(&out).unwrap() {
            assert_eq!(bytes[0], 0x9C);
            assert_eq!(bytes[1], 0xBD);
            assert_eq!(bytes[2], 53);
            assert!(info.crc_ok);
        }
    }

    #[test]
    fn test_逐帧与批量编码一致() {
        let pcm = sine_pcm(6, 256, 2, 16000.0);
        let mut batch = Vec::new();
        SbcEncoder::new(SbcConfig::default())
            .encode(&pcm, 6, &mut batch)
            .unwrap();

        let mut enc = SbcEncoder::new(SbcConfig::default());
        let mut single = Vec::new();
        for frame in pcm.chunks_exact(256) {
            single.extend(enc.encode_frame(frame).unwrap());
        }
        assert_eq!(batch, single);
    }

    #[test]
    fn test_重置后输出可复现() {
        let pcm = sine_pcm(4, 256, 2, 12000.0);
        let mut enc = SbcEncoder::new(SbcConfig::default());
        let mut first = Vec::new();
        enc.encode(&pcm, 4, &mut first).unwrap();
        enc.reset();
        let mut second = Vec::new();
        enc.encode(&pcm, 4, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_静音帧采样取中点() {
        let mut enc = SbcEncoder::new(SbcConfig::default());
        let mut out = Vec::new();
        enc.encode(&[0; 512], 2, &mut out).unwrap();
        let (first, second) = out.split_at(119);
        assert_eq!(first, second);

        // 联合标志与比例因子全为 0
        assert_eq!(&first[..4], &[0x9C, 0xBD, 53, 0x7D]);
        assert!(first[4..13].iter().all(|&b| b == 0));

        let info = SbcFrameInfo::parse(first).unwrap();
        let bits = info.bit_allocation();
        assert_eq!(bits[0], [4, 4, 4, 3, 3, 3, 3, 3]);
        assert_eq!(bits[1], [4, 4, 3, 3, 3, 3, 3, 3]);
        // 每个采样量化为 2^(bits-1) - 1: 0111 0111 0111 011 ...
        assert_eq!(&first[13..17], &[0x77, 0x76, 0xDB, 0x6E]);
    }

    #[test]
    fn test_msbc帧() {
        let mut enc = SbcEncoder::msbc();
        assert_eq!(enc.mode(), SbcMode::Msbc);
        assert_eq!(enc.frame_length(), 57);
        assert_eq!(enc.pcm_samples_per_frame(), 120);

        let pcm = sine_pcm(2, 120, 1, 8000.0);
        let mut out = Vec::new();
        enc.encode(&pcm, 2, &mut out).unwrap();
        assert_eq!(out.len(), 114);
        for (info, bytes) in split_frames(&out).unwrap() {
            assert_eq!(&bytes[..3], &[0xAD, 0x00, 0x00]);
            assert!(info.crc_ok);
            assert_eq!(info.params, FrameParams::msbc());
        }
    }

    #[test]
    fn test_各种配置的帧长度() {
        for subbands in [Subbands::Four, Subbands::Eight] {
            for blocks in [
                BlockCount::Four,
                BlockCount::Eight,
                BlockCount::Twelve,
                BlockCount::Sixteen,
            ] {
                for mode in [
                    ChannelMode::Mono,
                    ChannelMode::DualChannel,
                    ChannelMode::Stereo,
                    ChannelMode::JointStereo,
                ] {
                    let config = SbcConfig {
                        frequency: SamplingFrequency::F48000,
                        channel_mode: mode,
                        subbands,
                        blocks,
                        allocation: AllocationMethod::Snr,
                        bitrate_kbps: 200,
                    };
                    let mut enc = SbcEncoder::new(config);
                    let per_frame = enc.pcm_samples_per_frame();
                    let pcm = sine_pcm(2, per_frame, mode.channels(), 25000.0);
                    let mut out = Vec::new();
                    let summary = enc.encode(&pcm, 2, &mut out).unwrap();
                    assert_eq!(summary.bytes_written, 2 * enc.frame_length());

                    let frames = split_frames(&out).unwrap();
                    assert_eq!(frames.len(), 2);
                    for (info, _) in frames {
                        assert_eq!(info.params, *enc.params());
                        assert!(info.crc_ok);
                    }
                }
            }
        }
    }

    /// 从帧中读回量化采样并反量化, 与编码器内部的子带采样比较
    fn assert_reconstructs(config: SbcConfig) {
        let mut enc = SbcEncoder::new(config);
        let per_frame = enc.pcm_samples_per_frame();
        let pcm = sine_pcm(3, per_frame, config.channel_mode.channels(), 24000.0);

        // 独立的滤波器与比例因子计算, 得到期望的子带采样
        let params = *enc.params();
        let mut filter = AnalysisFilter::new(params.subbands, params.channels());
        let mut expected: SubbandSamples = [[[0; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS];

        for frame_pcm in pcm.chunks_exact(per_frame) {
            let frame = enc.encode_frame(frame_pcm).unwrap();
            filter.analyze(frame_pcm, params.blocks, &mut expected);
            let scale = scale_factor::compute(&params, &mut expected);

            let info = SbcFrameInfo::parse(&frame).unwrap();
            assert_eq!(info.scale_factors, scale.scale_factors);
            assert_eq!(info.join, scale.join);
            let bits = info.bit_allocation();

            let header_bits = 32 + params.join_bits() + 4 * params.subbands * params.channels();
            let mut br = BitReader::new(&frame);
            br.skip_bits(header_bits).unwrap();
            for block in expected.iter().take(params.blocks) {
                for ch in 0..params.channels() {
                    for sb in 0..params.subbands {
                        let nbits = bits[ch][sb];
                        if nbits == 0 {
                            continue;
                        }
                        let index = br.read_bits(u32::from(nbits)).unwrap();
                        let levels = f64::from((1u32 << nbits) - 1);
                        let full_scale = f64::from(1u32 << (scale.scale_factors[ch][sb] + 15));
                        let decoded = ((f64::from(index) + 0.5) * 2.0 / levels - 1.0) * full_scale;
                        let error = (decoded - f64::from(block[ch][sb])).abs();
                        assert!(
                            error <= full_scale / levels + 1.0,
                            "子带 {sb} 声道 {ch}: 误差 {error}, 量化步长 {}",
                            2.0 * full_scale / levels,
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_量化采样可还原() {
        assert_reconstructs(SbcConfig::default());
        assert_reconstructs(SbcConfig {
            channel_mode: ChannelMode::Mono,
            subbands: Subbands::Four,
            blocks: BlockCount::Eight,
            ..SbcConfig::default()
        });
        assert_reconstructs(SbcConfig {
            channel_mode: ChannelMode::DualChannel,
            allocation: AllocationMethod::Snr,
            ..SbcConfig::default()
        });
    }

    #[test]
    fn test_编码器可跨线程移动() {
        fn assert_send<T: Send>() {}
        assert_send::<SbcEncoder>();
    }
}
