//! A2DP SBC 编码信息元素.
//!
//! 4 字节, 每个字段用独立的位表示一个取值:
//!
//! ```text
//! 字节 0: [采样率 4: 16k 32k 44.1k 48k][声道模式 4: 单 双 立体 联合]
//! 字节 1: [块数 4: 4 8 12 16][子带 2: 4 8][分配方式 2: SNR 响度]
//! 字节 2: 最小比特池
//! 字节 3: 最大比特池
//! ```
//!
//! 能力协商时一个字段可以置多个位; 作为最终配置时每个字段必须恰好置一位.

use lanya_core::{LanyaError, LanyaResult};

use super::config::{
    AllocationMethod, BlockCount, ChannelMode, SamplingFrequency, SbcConfig, Subbands,
};

/// 信息元素长度
pub const SBC_CODEC_INFO_LEN: usize = 4;
/// 比特池下限
pub const MIN_BITPOOL: u8 = 2;
/// 比特池上限
pub const MAX_BITPOOL: u8 = 250;

const FREQUENCY_BITS: [(u8, SamplingFrequency); 4] = [
    (0x80, SamplingFrequency::F16000),
    (0x40, SamplingFrequency::F32000),
    (0x20, SamplingFrequency::F44100),
    (0x10, SamplingFrequency::F48000),
];

const CHANNEL_MODE_BITS: [(u8, ChannelMode); 4] = [
    (0x08, ChannelMode::Mono),
    (0x04, ChannelMode::DualChannel),
    (0x02, ChannelMode::Stereo),
    (0x01, ChannelMode::JointStereo),
];

const BLOCK_BITS: [(u8, BlockCount); 4] = [
    (0x80, BlockCount::Four),
    (0x40, BlockCount::Eight),
    (0x20, BlockCount::Twelve),
    (0x10, BlockCount::Sixteen),
];

const SUBBAND_BITS: [(u8, Subbands); 2] = [(0x08, Subbands::Four), (0x04, Subbands::Eight)];

const ALLOCATION_BITS: [(u8, AllocationMethod); 2] = [
    (0x02, AllocationMethod::Snr),
    (0x01, AllocationMethod::Loudness),
];

/// 协商后的 SBC 编码配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbcCodecInfo {
    /// 采样率
    pub frequency: SamplingFrequency,
    /// 声道模式
    pub channel_mode: ChannelMode,
    /// 块数
    pub blocks: BlockCount,
    /// 子带数
    pub subbands: Subbands,
    /// 分配方式
    pub allocation: AllocationMethod,
    /// 对端接受的最小比特池
    pub min_bitpool: u8,
    /// 对端接受的最大比特池
    pub max_bitpool: u8,
}

impl SbcCodecInfo {
    /// 解析 4 字节信息元素
    pub fn parse(data: &[u8]) -> LanyaResult<Self> {
        let [b0, b1, min_bitpool, max_bitpool] = <[u8; SBC_CODEC_INFO_LEN]>::try_from(data)
            .map_err(|_| {
                LanyaError::InvalidData(format!(
                    "SBC 编码信息元素应为 {} 字节, 实际 {} 字节",
                    SBC_CODEC_INFO_LEN,
                    data.len(),
                ))
            })?;

        let info = Self {
            frequency: single_bit(b0 & 0xF0, &FREQUENCY_BITS, "采样率")?,
            channel_mode: single_bit(b0 & 0x0F, &CHANNEL_MODE_BITS, "声道模式")?,
            blocks: single_bit(b1 & 0xF0, &BLOCK_BITS, "块数")?,
            subbands: single_bit(b1 & 0x0C, &SUBBAND_BITS, "子带数")?,
            allocation: single_bit(b1 & 0x03, &ALLOCATION_BITS, "分配方式")?,
            min_bitpool,
            max_bitpool,
        };

        let range = MIN_BITPOOL..=MAX_BITPOOL;
        let valid = range.contains(&min_bitpool)
            && range.contains(&max_bitpool)
            && min_bitpool <= max_bitpool;
        if !valid {
            return Err(LanyaError::InvalidData(format!(
                "无效的比特池范围: {}..={}",
                min_bitpool, max_bitpool,
            )));
        }
        Ok(info)
    }

    /// 序列化为 4 字节信息元素
    pub fn to_bytes(&self) -> [u8; SBC_CODEC_INFO_LEN] {
        [
            bit_of(&FREQUENCY_BITS, self.frequency) | bit_of(&CHANNEL_MODE_BITS, self.channel_mode),
            bit_of(&BLOCK_BITS, self.blocks)
                | bit_of(&SUBBAND_BITS, self.subbands)
                | bit_of(&ALLOCATION_BITS, self.allocation),
            self.min_bitpool,
            self.max_bitpool,
        ]
    }

    /// 以指定码率生成编码配置
    pub fn to_config(&self, bitrate_kbps: u32) -> SbcConfig {
        SbcConfig {
            frequency: self.frequency,
            channel_mode: self.channel_mode,
            subbands: self.subbands,
            blocks: self.blocks,
            allocation: self.allocation,
            bitrate_kbps,
        }
    }
}

fn single_bit<T: Copy>(bits: u8, table: &[(u8, T)], field: &str) -> LanyaResult<T> {
    if bits.count_ones() != 1 {
        return Err(LanyaError::InvalidData(format!(
            "{}字段必须恰好设置一位, 实际为 0x{:02X}",
            field, bits,
        )));
    }
    table
        .iter()
        .find(|(bit, _)| *bit == bits)
        .map(|(_, value)| *value)
        .ok_or_else(|| LanyaError::InvalidData(format!("未知的{}取值 0x{:02X}", field, bits)))
}

fn bit_of<T: PartialEq>(table: &[(u8, T)], value: T) -> u8 {
    table
        .iter()
        .find(|(_, v)| *v == value)
        .map_or(0, |(bit, _)| *bit)
}
