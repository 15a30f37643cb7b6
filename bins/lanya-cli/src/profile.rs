//! 编码配置文件.
//!
//! JSON 格式, 所有字段可选. 命令行参数覆盖配置文件中的同名字段.
//!
//! ```json
//! { "bitrate": 229, "subbands": 8, "blocks": 16, "mode": "joint", "alloc": "loudness" }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use lanya_codec::encoders::sbc::codec_info::{MAX_BITPOOL, MIN_BITPOOL};
use lanya_codec::encoders::sbc::config::NON_EDR_MAX_BITRATE_KBPS;
use lanya_codec::encoders::sbc::fit_bitpool_range;
use lanya_codec::{
    AllocationMethod, BlockCount, ChannelMode, SamplingFrequency, SbcConfig, SbcEncoder, Subbands,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// 声道模式 (命令行与配置文件取值)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeArg {
    Mono,
    Dual,
    Stereo,
    Joint,
}

impl From<ModeArg> for ChannelMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Mono => Self::Mono,
            ModeArg::Dual => Self::DualChannel,
            ModeArg::Stereo => Self::Stereo,
            ModeArg::Joint => Self::JointStereo,
        }
    }
}

/// 比特分配方式 (命令行与配置文件取值)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocArg {
    Loudness,
    Snr,
}

impl From<AllocArg> for AllocationMethod {
    fn from(alloc: AllocArg) -> Self {
        match alloc {
            AllocArg::Loudness => Self::Loudness,
            AllocArg::Snr => Self::Snr,
        }
    }
}

/// 编码参数 (配置文件与命令行共用)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeProfile {
    /// 目标码率 (kbps)
    pub bitrate: Option<u32>,
    /// 显式比特池
    pub bitpool: Option<u8>,
    /// 对端允许的最小比特池
    pub min_bitpool: Option<u8>,
    /// 对端允许的最大比特池
    pub max_bitpool: Option<u8>,
    /// 子带数 (4 或 8)
    pub subbands: Option<usize>,
    /// 块数 (4/8/12/16)
    pub blocks: Option<usize>,
    /// 声道模式
    pub mode: Option<ModeArg>,
    /// 分配方式
    pub alloc: Option<AllocArg>,
    /// 使用 mSBC
    pub msbc: bool,
    /// 非 EDR 链路, 码率上限 229 kbps
    pub non_edr: bool,
}

impl EncodeProfile {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("无法打开配置文件 '{}'", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("解析配置文件 '{}' 失败", path.display()))
    }

    /// 用 `overrides` 中已设置的字段覆盖当前值
    pub fn merge(self, overrides: EncodeProfile) -> Self {
        Self {
            bitrate: overrides.bitrate.or(self.bitrate),
            bitpool: overrides.bitpool.or(self.bitpool),
            min_bitpool: overrides.min_bitpool.or(self.min_bitpool),
            max_bitpool: overrides.max_bitpool.or(self.max_bitpool),
            subbands: overrides.subbands.or(self.subbands),
            blocks: overrides.blocks.or(self.blocks),
            mode: overrides.mode.or(self.mode),
            alloc: overrides.alloc.or(self.alloc),
            msbc: overrides.msbc || self.msbc,
            non_edr: overrides.non_edr || self.non_edr,
        }
    }

    /// 按输入音频参数构建编码器
    pub fn build_encoder(&self, sample_rate: u32, channels: u32) -> Result<SbcEncoder> {
        if self.msbc {
            if sample_rate != 16000 || channels != 1 {
                bail!("mSBC 需要 16000 Hz 单声道输入, 实际 {sample_rate} Hz {channels} 声道");
            }
            return Ok(SbcEncoder::msbc());
        }

        let config = self.config(sample_rate, channels)?;

        if let Some(bitpool) = self.bitpool {
            return Ok(SbcEncoder::with_bitpool(config, bitpool));
        }

        if self.min_bitpool.is_none() && self.max_bitpool.is_none() {
            return Ok(SbcEncoder::new(config));
        }

        let min = self.min_bitpool.unwrap_or(MIN_BITPOOL);
        let max = self.max_bitpool.unwrap_or(MAX_BITPOOL);
        let fit = fit_bitpool_range(&config, min, max)?;
        let bitpool = fit.bitpool.clamp(min, max);
        if fit.in_range {
            info!("比特池协商: {} kbps, 比特池 {}", fit.bitrate_kbps, bitpool);
        } else {
            warn!("码率调整无法满足比特池范围 {min}..={max}, 直接使用比特池 {bitpool}");
        }
        let config = SbcConfig {
            bitrate_kbps: fit.bitrate_kbps,
            ..config
        };
        Ok(SbcEncoder::with_bitpool(config, bitpool))
    }

    /// 解析为标准 SBC 配置
    fn config(&self, sample_rate: u32, channels: u32) -> Result<SbcConfig> {
        let defaults = SbcConfig::default();

        let Some(frequency) = SamplingFrequency::from_hz(sample_rate) else {
            bail!("SBC 不支持采样率 {sample_rate} Hz (支持 16000/32000/44100/48000)");
        };

        let channel_mode = match (self.mode, channels) {
            (Some(mode), _) => ChannelMode::from(mode),
            (None, 1) => ChannelMode::Mono,
            (None, 2) => ChannelMode::JointStereo,
            (None, n) => bail!("SBC 不支持 {n} 声道输入"),
        };
        if channel_mode.channels() != channels as usize {
            bail!(
                "声道模式 {channel_mode} 需要 {} 声道, 输入为 {channels} 声道",
                channel_mode.channels(),
            );
        }

        let subbands = match self.subbands {
            Some(n) => Subbands::from_count(n).with_context(|| format!("无效的子带数 {n}"))?,
            None => defaults.subbands,
        };
        let blocks = match self.blocks {
            Some(n) => BlockCount::from_count(n).with_context(|| format!("无效的块数 {n}"))?,
            None => defaults.blocks,
        };
        let allocation = self.alloc.map_or(defaults.allocation, AllocationMethod::from);

        let mut bitrate_kbps = self.bitrate.unwrap_or(defaults.bitrate_kbps);
        if self.non_edr && bitrate_kbps > NON_EDR_MAX_BITRATE_KBPS {
            info!("非 EDR 链路, 码率由 {bitrate_kbps} kbps 降为 {NON_EDR_MAX_BITRATE_KBPS} kbps");
            bitrate_kbps = NON_EDR_MAX_BITRATE_KBPS;
        }

        Ok(SbcConfig {
            frequency,
            channel_mode,
            subbands,
            blocks,
            allocation,
            bitrate_kbps,
        })
    }
}
