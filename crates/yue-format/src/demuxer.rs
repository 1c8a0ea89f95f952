//! 解封装器 (Demuxer) trait 定义.
//!
//! 定义了从容器格式中顺序读取数据包的接口. 本框架面向流式播放,
//! 不提供 seek 能力.

use yue_codec::Packet;
use yue_core::YueResult;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 解封装器 trait
///
/// 从容器格式中读取压缩数据包. 所有格式的解封装器都实现此 trait.
///
/// 使用流程:
/// 1. 调用 `open()` 打开容器并解析头部
/// 2. 调用 `streams()` 获取流信息
/// 3. 循环调用 `read_packet()` 读取数据包, 直到 `Eof`
pub trait Demuxer: Send {
    /// 获取格式标识
    fn format_id(&self) -> FormatId;

    /// 获取格式名称
    fn name(&self) -> &str;

    /// 打开容器并解析头部信息
    fn open(&mut self, io: &mut IoContext) -> YueResult<()>;

    /// 获取所有流信息
    fn streams(&self) -> &[Stream];

    /// 读取下一个数据包
    ///
    /// # 返回
    /// - `Ok(packet)`: 成功读取一个数据包
    /// - `Err(YueError::Eof)`: 已到达流末尾
    fn read_packet(&mut self, io: &mut IoContext) -> YueResult<Packet>;

    /// 获取容器元数据
    fn metadata(&self) -> &[(String, String)] {
        &[]
    }
}
