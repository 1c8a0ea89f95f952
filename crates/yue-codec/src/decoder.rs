//! 解码器 trait 定义.
//!
//! 所有解码器实现必须实现 `Decoder` trait.

use yue_core::YueResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::AudioFrame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 定义了解码器的统一接口.
///
/// 解码流程:
/// 1. 调用 `send_packet()` 送入压缩数据
/// 2. 调用 `receive_frame()` 取出解码后的帧
/// 3. 重复以上步骤直到所有数据处理完毕
pub trait Decoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用参数配置解码器
    ///
    /// 对于需要头部信息的编解码器 (如 Vorbis), 容器层提供的
    /// `extra_data` 会在此处被解析.
    fn open(&mut self, _params: &CodecParameters) -> YueResult<()> {
        Ok(())
    }

    /// 送入一个压缩数据包进行解码
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(YueError::Eof)`: 包数据在帧中途耗尽 (流结束的常规情况)
    fn send_packet(&mut self, packet: &Packet) -> YueResult<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Ok(frame)`: 成功取出一帧
    /// - `Err(YueError::NeedMoreData)`: 需要送入更多数据包
    fn receive_frame(&mut self) -> YueResult<AudioFrame>;

    /// 刷新解码器, 清空帧级内部状态 (保留头部配置)
    fn flush(&mut self);

    /// 获取解码器从码流中捕获的元数据 (如 Vorbis comment 注释)
    fn metadata(&self) -> &[(String, String)] {
        &[]
    }
}
