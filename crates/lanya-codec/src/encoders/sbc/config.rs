//! SBC 帧参数与比特池推导.
//!
//! 头字段的取值都用枚举表达, 非法组合无法构造. 比特池由目标码率推导,
//! 推导结果永远落在格式允许的范围内.

use std::fmt;

use lanya_core::{LanyaError, LanyaResult};
use log::{debug, warn};

/// A2DP 源端默认码率 (kbps)
pub const DEFAULT_BITRATE_KBPS: u32 = 328;
/// 非 EDR 链路的最大码率 (kbps)
pub const NON_EDR_MAX_BITRATE_KBPS: u32 = 229;
/// 比特池协商时的码率步长 (kbps)
pub const BITRATE_STEP_KBPS: u32 = 5;

/// 标准 SBC 同步字
pub const SBC_SYNC_WORD: u8 = 0x9C;
/// mSBC 同步字
pub const MSBC_SYNC_WORD: u8 = 0xAD;
/// mSBC 固定块数
pub const MSBC_BLOCKS: usize = 15;
/// mSBC 固定比特池
pub const MSBC_BITPOOL: u8 = 26;

/// 最大子带数
pub const MAX_SUBBANDS: usize = 8;
/// 最大声道数
pub const MAX_CHANNELS: usize = 2;
/// 最大块数
pub const MAX_BLOCKS: usize = 16;

// ============================================================
// 头字段枚举
// ============================================================

/// 采样率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingFrequency {
    /// 16 kHz
    F16000,
    /// 32 kHz
    F32000,
    /// 44.1 kHz
    F44100,
    /// 48 kHz
    F48000,
}

impl SamplingFrequency {
    /// 采样率 (Hz)
    pub const fn hz(self) -> u32 {
        match self {
            Self::F16000 => 16000,
            Self::F32000 => 32000,
            Self::F44100 => 44100,
            Self::F48000 => 48000,
        }
    }

    /// 按 Hz 查找
    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            16000 => Some(Self::F16000),
            32000 => Some(Self::F32000),
            44100 => Some(Self::F44100),
            48000 => Some(Self::F48000),
            _ => None,
        }
    }

    /// 帧头编码 (2 位)
    pub const fn header_code(self) -> u8 {
        match self {
            Self::F16000 => 0,
            Self::F32000 => 1,
            Self::F44100 => 2,
            Self::F48000 => 3,
        }
    }

    /// 由帧头编码还原 (只取低 2 位)
    pub const fn from_header_code(code: u8) -> Self {
        match code & 0x03 {
            0 => Self::F16000,
            1 => Self::F32000,
            2 => Self::F44100,
            _ => Self::F48000,
        }
    }
}

/// 声道模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// 单声道
    Mono,
    /// 双声道 (两个独立声道, 各自分配比特)
    DualChannel,
    /// 立体声 (两个声道共享比特池)
    Stereo,
    /// 联合立体声 (可按子带切换和/差编码)
    JointStereo,
}

impl ChannelMode {
    /// 声道数
    pub const fn channels(self) -> usize {
        match self {
            Self::Mono => 1,
            _ => 2,
        }
    }

    /// 帧头编码 (2 位)
    pub const fn header_code(self) -> u8 {
        match self {
            Self::Mono => 0,
            Self::DualChannel => 1,
            Self::Stereo => 2,
            Self::JointStereo => 3,
        }
    }

    /// 由帧头编码还原 (只取低 2 位)
    pub const fn from_header_code(code: u8) -> Self {
        match code & 0x03 {
            0 => Self::Mono,
            1 => Self::DualChannel,
            2 => Self::Stereo,
            _ => Self::JointStereo,
        }
    }

    /// 两个声道是否共享一个比特池
    pub const fn shares_bitpool(self) -> bool {
        matches!(self, Self::Stereo | Self::JointStereo)
    }

    /// 短名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mono => "mono",
            Self::DualChannel => "dual",
            Self::Stereo => "stereo",
            Self::JointStereo => "joint",
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 子带数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subbands {
    /// 4 子带
    Four,
    /// 8 子带
    Eight,
}

impl Subbands {
    /// 子带数
    pub const fn count(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// 按数值查找
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            4 => Some(Self::Four),
            8 => Some(Self::Eight),
            _ => None,
        }
    }

    /// 帧头编码 (1 位)
    pub const fn header_code(self) -> u8 {
        match self {
            Self::Four => 0,
            Self::Eight => 1,
        }
    }
}

/// 每帧块数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCount {
    /// 4 块
    Four,
    /// 8 块
    Eight,
    /// 12 块
    Twelve,
    /// 16 块
    Sixteen,
}

impl BlockCount {
    /// 块数
    pub const fn count(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
            Self::Twelve => 12,
            Self::Sixteen => 16,
        }
    }

    /// 按数值查找
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            4 => Some(Self::Four),
            8 => Some(Self::Eight),
            12 => Some(Self::Twelve),
            16 => Some(Self::Sixteen),
            _ => None,
        }
    }

    /// 帧头编码 (2 位)
    pub const fn header_code(self) -> u8 {
        match self {
            Self::Four => 0,
            Self::Eight => 1,
            Self::Twelve => 2,
            Self::Sixteen => 3,
        }
    }

    /// 由帧头编码还原 (只取低 2 位)
    pub const fn from_header_code(code: u8) -> Self {
        match code & 0x03 {
            0 => Self::Four,
            1 => Self::Eight,
            2 => Self::Twelve,
            _ => Self::Sixteen,
        }
    }
}

/// 比特分配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationMethod {
    /// 响度 (按心理声学偏移表加权)
    Loudness,
    /// 信噪比 (直接按比例因子)
    Snr,
}

impl AllocationMethod {
    /// 帧头编码 (1 位)
    pub const fn header_code(self) -> u8 {
        match self {
            Self::Loudness => 0,
            Self::Snr => 1,
        }
    }

    /// 短名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Loudness => "loudness",
            Self::Snr => "snr",
        }
    }
}

/// 编码模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SbcMode {
    /// 标准 A2DP SBC
    #[default]
    Standard,
    /// HFP 宽带语音 mSBC
    Msbc,
}

// ============================================================
// 编码配置
// ============================================================

/// SBC 编码配置
///
/// 比特池不在此处指定, 由 `bitrate_kbps` 推导, 或通过
/// `SbcEncoder::with_bitpool` 显式给出.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbcConfig {
    /// 采样率
    pub frequency: SamplingFrequency,
    /// 声道模式
    pub channel_mode: ChannelMode,
    /// 子带数
    pub subbands: Subbands,
    /// 每帧块数
    pub blocks: BlockCount,
    /// 比特分配方式
    pub allocation: AllocationMethod,
    /// 目标码率 (kbps)
    pub bitrate_kbps: u32,
}

impl Default for SbcConfig {
    fn default() -> Self {
        Self {
            frequency: SamplingFrequency::F44100,
            channel_mode: ChannelMode::JointStereo,
            subbands: Subbands::Eight,
            blocks: BlockCount::Sixteen,
            allocation: AllocationMethod::Loudness,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
        }
    }
}

impl SbcConfig {
    /// 当前配置允许的最大比特池
    pub fn max_bitpool(&self) -> u8 {
        max_bitpool_for(self.channel_mode, self.subbands.count())
    }

    /// 以指定比特池生成帧参数 (超出上限时截断)
    pub fn frame_params(&self, bitpool: u8) -> FrameParams {
        FrameParams {
            mode: SbcMode::Standard,
            frequency: self.frequency,
            channel_mode: self.channel_mode,
            allocation: self.allocation,
            subbands: self.subbands.count(),
            blocks: self.blocks.count(),
            bitpool: bitpool.min(self.max_bitpool()),
        }
    }
}

fn max_bitpool_for(channel_mode: ChannelMode, subbands: usize) -> u8 {
    if channel_mode.shares_bitpool() {
        (32 * subbands).min(255) as u8
    } else {
        (16 * subbands) as u8
    }
}

// ============================================================
// 帧参数
// ============================================================

/// 单帧的全部数值参数
///
/// 标准 SBC 由 `SbcConfig::frame_params` 得到, mSBC 由 `FrameParams::msbc` 得到.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParams {
    /// 编码模式
    pub mode: SbcMode,
    /// 采样率
    pub frequency: SamplingFrequency,
    /// 声道模式
    pub channel_mode: ChannelMode,
    /// 比特分配方式
    pub allocation: AllocationMethod,
    /// 子带数 (4 或 8)
    pub subbands: usize,
    /// 每帧块数 (4/8/12/16, mSBC 为 15)
    pub blocks: usize,
    /// 比特池
    pub bitpool: u8,
}

impl FrameParams {
    /// mSBC 固定参数: 单声道, 16 kHz, 8 子带, 15 块, 响度分配, 比特池 26
    pub const fn msbc() -> Self {
        Self {
            mode: SbcMode::Msbc,
            frequency: SamplingFrequency::F16000,
            channel_mode: ChannelMode::Mono,
            allocation: AllocationMethod::Loudness,
            subbands: 8,
            blocks: MSBC_BLOCKS,
            bitpool: MSBC_BITPOOL,
        }
    }

    /// 声道数
    pub const fn channels(&self) -> usize {
        self.channel_mode.channels()
    }

    /// 每声道每帧采样数
    pub const fn samples_per_frame(&self) -> usize {
        self.blocks * self.subbands
    }

    /// 每帧交错 PCM 采样数
    pub const fn pcm_samples_per_frame(&self) -> usize {
        self.samples_per_frame() * self.channels()
    }

    /// 同步字
    pub const fn sync_word(&self) -> u8 {
        match self.mode {
            SbcMode::Standard => SBC_SYNC_WORD,
            SbcMode::Msbc => MSBC_SYNC_WORD,
        }
    }

    /// 帧头第 2 字节: `[采样率:2][块数:2][声道模式:2][分配方式:1][子带数:1]`
    ///
    /// mSBC 中该字节保留为 0.
    pub fn header_byte(&self) -> u8 {
        if self.mode == SbcMode::Msbc {
            return 0;
        }
        let blocks = BlockCount::from_count(self.blocks).map_or(3, BlockCount::header_code);
        let subbands = u8::from(self.subbands == 8);
        (self.frequency.header_code() << 6)
            | (blocks << 4)
            | (self.channel_mode.header_code() << 2)
            | (self.allocation.header_code() << 1)
            | subbands
    }

    /// 帧头第 3 字节 (比特池, mSBC 中保留为 0)
    pub const fn bitpool_byte(&self) -> u8 {
        match self.mode {
            SbcMode::Standard => self.bitpool,
            SbcMode::Msbc => 0,
        }
    }

    /// 声道模式与子带数允许的最大比特池
    pub fn max_bitpool(&self) -> u8 {
        max_bitpool_for(self.channel_mode, self.subbands)
    }

    /// 联合立体声标志位数
    pub const fn join_bits(&self) -> usize {
        match self.channel_mode {
            ChannelMode::JointStereo => self.subbands,
            _ => 0,
        }
    }

    /// 帧长度 (字节), 含帧头、比例因子与对齐填充
    pub fn frame_length(&self) -> usize {
        let sb = self.subbands;
        let ch = self.channels();
        let blocks = self.blocks;
        let bp = usize::from(self.bitpool);
        let header = 4 + (4 * sb * ch) / 8;
        let payload = match self.channel_mode {
            ChannelMode::Mono | ChannelMode::DualChannel => (blocks * ch * bp).div_ceil(8),
            ChannelMode::Stereo => (blocks * bp).div_ceil(8),
            ChannelMode::JointStereo => (sb + blocks * bp).div_ceil(8),
        };
        header + payload
    }

    /// 实际码率 (bits/s)
    pub fn bitrate(&self) -> u32 {
        let bits = 8 * self.frame_length() as u64 * u64::from(self.frequency.hz());
        (bits / self.samples_per_frame() as u64) as u32
    }
}

// ============================================================
// 比特池推导与协商
// ============================================================

/// 由目标码率推导比特池
///
/// 结果截断到格式允许范围, 负值记为 0, 不会失败.
pub fn derive_bitpool(config: &SbcConfig) -> u8 {
    let sb = config.subbands.count() as i64;
    let blocks = config.blocks.count() as i64;
    let ch = config.channel_mode.channels() as i64;
    let fs = i64::from(config.frequency.hz());
    let rate = i64::from(config.bitrate_kbps);

    let bitpool = match config.channel_mode {
        ChannelMode::Stereo | ChannelMode::JointStereo => {
            let js = i64::from(config.channel_mode == ChannelMode::JointStereo);
            let mut bp = rate * sb * 1000 / fs - (32 + 4 * sb * ch + js * sb) / blocks;
            let frame_len = 4 + (4 * sb * ch) / 8 + (js * sb + blocks * bp) / 8;
            let actual = 8 * frame_len * fs / (sb * blocks * 1000);
            if actual > rate {
                bp -= 1;
            }
            bp.min(if sb == 8 { 255 } else { 128 })
        }
        ChannelMode::Mono | ChannelMode::DualChannel => {
            let bp = sb * rate * 1000 / (fs * ch) - (32 / ch + 4 * sb) / blocks;
            bp.min(16 * sb)
        }
    };

    if bitpool < 0 {
        warn!("码率 {} kbps 过低, 比特池截断为 0", config.bitrate_kbps);
    }
    bitpool.clamp(0, i64::from(config.max_bitpool())) as u8
}

/// 指定比特池下的标准帧长度 (字节)
pub fn frame_length(config: &SbcConfig, bitpool: u8) -> usize {
    config.frame_params(bitpool).frame_length()
}

/// 指定比特池下的实际码率 (bits/s)
pub fn bitrate_for(config: &SbcConfig, bitpool: u8) -> u32 {
    config.frame_params(bitpool).bitrate()
}

/// 比特池协商结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitpoolFit {
    /// 最终码率 (kbps)
    pub bitrate_kbps: u32,
    /// 最终比特池
    pub bitpool: u8,
    /// 比特池是否落在对端要求的范围内
    pub in_range: bool,
}

/// 按对端允许的比特池范围调整码率
///
/// 比特池高于 `max_bitpool` 时每次降低 5 kbps, 低于 `min_bitpool` 时每次提高 5 kbps,
/// 一旦落入范围立即返回. 若搜索方向发生过反转, 或码率无法继续调整, 则停止并标记
/// `in_range = false`.
pub fn fit_bitpool_range(
    config: &SbcConfig,
    min_bitpool: u8,
    max_bitpool: u8,
) -> LanyaResult<BitpoolFit> {
    if min_bitpool > max_bitpool {
        return Err(LanyaError::InvalidArgument(format!(
            "最小比特池 {} 大于最大比特池 {}",
            min_bitpool, max_bitpool,
        )));
    }

    let mut candidate = *config;
    let mut stepped_down = false;
    let mut stepped_up = false;

    loop {
        let bitpool = derive_bitpool(&candidate);
        let fit = BitpoolFit {
            bitrate_kbps: candidate.bitrate_kbps,
            bitpool,
            in_range: (min_bitpool..=max_bitpool).contains(&bitpool),
        };
        if fit.in_range {
            debug!(
                "比特池协商: {} kbps -> 比特池 {} (范围 {}..={})",
                fit.bitrate_kbps, bitpool, min_bitpool, max_bitpool,
            );
            return Ok(fit);
        }

        let next = if bitpool > max_bitpool {
            stepped_down = true;
            candidate.bitrate_kbps.checked_sub(BITRATE_STEP_KBPS)
        } else if bitpool < candidate.max_bitpool() {
            stepped_up = true;
            candidate.bitrate_kbps.checked_add(BITRATE_STEP_KBPS)
        } else {
            // 已达格式上限仍低于 min_bitpool
            None
        };

        match next {
            Some(rate) if !(stepped_down && stepped_up) => candidate.bitrate_kbps = rate,
            _ => {
                warn!(
                    "比特池协商失败: {} kbps -> 比特池 {} 不在 {}..={} 内",
                    fit.bitrate_kbps, bitpool, min_bitpool, max_bitpool,
                );
                return Ok(fit);
            }
        }
    }
}
