//! # lanya-codec
//!
//! Lanya 蓝牙音频编码库, 提供编码器框架与 Packet/Frame 抽象.
//!
//! ## 支持的编码器
//!
//! - **SBC**: A2DP 标准子带编码 (4/8 子带, 4/8/12/16 块, 单声道/双声道/立体声/联合立体声)
//! - **mSBC**: HFP 宽带语音使用的固定配置 SBC
//!
//! ## 使用示例
//!
//! ```rust
//! use lanya_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! lanya_codec::register_all(&mut reg);
//!
//! let encoder = reg.create_encoder(CodecId::Sbc).unwrap();
//! assert_eq!(encoder.name(), "sbc");
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod encoder;
pub mod encoders;
pub mod frame;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{AudioCodecParams, CodecParameters, CodecParamsType};
pub use encoder::Encoder;
pub use encoders::sbc::{
    AllocationMethod, BitpoolFit, BlockCount, ChannelMode, EncodeSummary, FrameParams,
    SamplingFrequency, SbcCodec, SbcCodecInfo, SbcConfig, SbcEncoder, SbcFrameInfo, SbcMode,
    Subbands,
};
pub use frame::AudioFrame;
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置编码器
pub fn register_all(registry: &mut CodecRegistry) {
    encoders::register_all_encoders(registry);
}
