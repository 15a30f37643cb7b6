//! 编码器标识符.

use std::fmt;

/// 编码器标识符
///
/// 唯一标识一种编码算法, 与传输方式无关.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// SBC (Low Complexity Subband Coding, A2DP 必选编码)
    Sbc,
    /// mSBC (HFP 1.6 宽带语音)
    Msbc,
}

impl CodecId {
    /// 所有已知标识符
    pub const ALL: [CodecId; 2] = [CodecId::Sbc, CodecId::Msbc];

    /// 获取编码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sbc => "sbc",
            Self::Msbc => "msbc",
        }
    }

    /// 按名称查找标识符 (不区分大小写)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
