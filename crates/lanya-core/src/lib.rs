//! # lanya-core
//!
//! Lanya 核心库, 提供错误类型、位级读写工具和 SBC 帧校验.
//!
//! 上层的 `lanya-codec` 与命令行工具都依赖本 crate 的基础设施.

pub mod bitreader;
pub mod bitwriter;
pub mod crc;
pub mod error;

// 重导出常用类型
pub use error::{LanyaError, LanyaResult};
