//! PCM 音频帧 (Frame).
//!
//! 编码器的输入: 交错排列的有符号 16 位采样.

/// 无效时间戳
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 音频帧
///
/// 所有声道交替排列 (L, R, L, R, ...), 单声道时即为连续采样.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 交错排列的 S16 采样
    pub samples: Vec<i16>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 显示时间戳 (以采样为单位)
    pub pts: i64,
}

impl AudioFrame {
    /// 由交错采样创建音频帧
    ///
    /// 末尾不足一组声道的采样会被忽略.
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u32) -> Self {
        let nb_samples = if channels == 0 {
            0
        } else {
            (samples.len() / channels as usize) as u32
        };
        Self {
            samples,
            nb_samples,
            sample_rate,
            channels,
            pts: NOPTS_VALUE,
        }
    }

    /// 有效采样 (去掉末尾不完整的声道组)
    pub fn interleaved(&self) -> &[i16] {
        let len = self.nb_samples as usize * self.channels as usize;
        &self.samples[..len.min(self.samples.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_采样数按声道计算() {
        let frame = AudioFrame::new(vec![0; 257], 44100, 2);
        assert_eq!(frame.nb_samples, 128);
        assert_eq!(frame.interleaved().len(), 256);
        assert_eq!(frame.pts, NOPTS_VALUE);
    }

    #[test]
    fn test_零声道() {
        let frame = AudioFrame::new(vec![1, 2, 3], 16000, 0);
        assert_eq!(frame.nb_samples, 0);
        assert!(frame.interleaved().is_empty());
    }
}
