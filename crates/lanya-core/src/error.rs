//! 统一错误类型定义.
//!
//! 所有 Lanya crate 共用的错误类型. 编码数值管线本身不产生错误,
//! 错误只出现在参数校验 (`open`/`encode` 入口) 和文件 I/O 边界.

use thiserror::Error;

/// Lanya 统一错误类型
#[derive(Debug, Error)]
pub enum LanyaError {
    /// 无效参数 (配置层面)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效输入 (调用方违反契约, 如 PCM 缓冲区长度不足)
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 编码器未初始化
    #[error("编码器未初始化: {0}")]
    NotInitialized(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 无效数据 (损坏的码流、文件头等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),
}

/// Lanya 统一 Result 类型
pub type LanyaResult<T> = Result<T, LanyaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_错误信息格式() {
        let err = LanyaError::InvalidInput("需要 256 个采样, 实际 10 个".into());
        assert_eq!(err.to_string(), "无效输入: 需要 256 个采样, 实际 10 个");
        assert_eq!(LanyaError::Eof.to_string(), "已到达流末尾");
    }

    #[test]
    fn test_io错误自动转换() {
        fn open_missing() -> LanyaResult<std::fs::File> {
            Ok(std::fs::File::open("/不存在的路径/lanya.sbc")?)
        }
        assert!(matches!(open_missing(), Err(LanyaError::Io(_))));
    }
}
