//! 编码器 trait 定义.
//!
//! 所有编码器实现必须实现 `Encoder` trait.

use lanya_core::LanyaResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::AudioFrame;
use crate::packet::Packet;

/// 编码器 trait
///
/// 编码流程:
/// 1. 调用 `open()` 配置编码参数
/// 2. 调用 `send_frame()` 送入 PCM 帧
/// 3. 调用 `receive_packet()` 取出压缩数据包, 直到返回 `NeedMoreData`
/// 4. 送入 None 表示编码结束, 剩余采样补零后编码, 随后 `receive_packet()` 返回 `Eof`
pub trait Encoder: Send {
    /// 获取编码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取编码器名称
    fn name(&self) -> &str;

    /// 使用参数配置编码器
    fn open(&mut self, params: &CodecParameters) -> LanyaResult<()>;

    /// 送入一帧 PCM 数据进行编码
    ///
    /// # 参数
    /// - `frame`: PCM 帧. `None` 表示刷新 (flush), 编码缓存中不足一帧的采样.
    ///
    /// # 返回
    /// - `Ok(())`: 帧已接受
    /// - `Err(LanyaError::NotInitialized)`: 尚未调用 `open()`
    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> LanyaResult<()>;

    /// 从编码器取出一个压缩数据包
    ///
    /// # 返回
    /// - `Ok(packet)`: 成功取出一个数据包
    /// - `Err(LanyaError::NeedMoreData)`: 需要送入更多帧
    /// - `Err(LanyaError::Eof)`: 所有数据包已取出
    fn receive_packet(&mut self) -> LanyaResult<Packet>;

    /// 刷新编码器, 清空内部状态
    fn flush(&mut self);
}
