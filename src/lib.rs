//! # Lanya (蓝牙)
//!
//! 纯 Rust 实现的蓝牙音频编码库.
//!
//! - **SBC**: A2DP 标准编码, 支持全部采样率、声道模式、子带数与块数组合
//! - **mSBC**: HFP 宽带语音使用的 16 kHz 固定配置
//!
//! # 快速开始
//!
//! ```rust
//! use lanya::codec::{SbcConfig, SbcEncoder};
//!
//! let mut encoder = SbcEncoder::new(SbcConfig::default());
//! let pcm = vec![0i16; encoder.pcm_samples_per_frame() * 4];
//! let mut out = Vec::new();
//! let summary = encoder.encode(&pcm, 4, &mut out).unwrap();
//! assert_eq!(summary.bytes_written, 4 * encoder.frame_length());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `lanya-core` | 错误类型、位读写、CRC |
//! | `lanya-codec` | 编码器框架与 SBC 编码器 |

/// 核心类型与工具
pub use lanya_core as core;

/// 编码器框架与 SBC 编码器
pub use lanya_codec as codec;

/// 获取 Lanya 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置编码器的注册表
pub fn default_codec_registry() -> lanya_codec::CodecRegistry {
    let mut registry = lanya_codec::CodecRegistry::new();
    lanya_codec::register_all(&mut registry);
    registry
}
