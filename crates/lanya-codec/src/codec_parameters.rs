//! 编码器参数.
//!
//! 描述打开编码器时需要的配置, 通常来自 A2DP 协商结果或命令行.

use crate::codec_id::CodecId;

/// 编码器参数
#[derive(Debug, Clone)]
pub struct CodecParameters {
    /// 编码器标识
    pub codec_id: CodecId,
    /// 额外数据
    ///
    /// SBC 编码器接受 4 字节的 A2DP SBC 编码信息元素
    /// (采样率/声道模式, 块数/子带数/分配方式, 最小比特池, 最大比特池).
    pub extra_data: Vec<u8>,
    /// 码率 (bits/s), 0 表示使用编码器默认值
    pub bit_rate: u64,
    /// 媒体类型特定参数
    pub params: CodecParamsType,
}

/// 媒体类型特定参数
#[derive(Debug, Clone)]
pub enum CodecParamsType {
    /// 音频参数
    Audio(AudioCodecParams),
    /// 无特定参数
    None,
}

/// 音频编码器参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCodecParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
}

impl CodecParameters {
    /// 创建音频编码参数
    pub fn new_audio(codec_id: CodecId, sample_rate: u32, channels: u32) -> Self {
        Self {
            codec_id,
            extra_data: Vec::new(),
            bit_rate: 0,
            params: CodecParamsType::Audio(AudioCodecParams {
                sample_rate,
                channels,
            }),
        }
    }

    /// 获取音频参数 (如果是音频流)
    pub fn audio(&self) -> Option<&AudioCodecParams> {
        match &self.params {
            CodecParamsType::Audio(a) => Some(a),
            CodecParamsType::None => None,
        }
    }
}
