//! 流信息定义.
//!
//! 描述容器中的一条逻辑流.

use yue_codec::CodecId;
use yue_core::{ChannelLayout, MediaType, Rational, SampleFormat};

/// 流信息
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在容器中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 编解码器私有数据 (如 Vorbis identification 头包)
    pub extra_data: Vec<u8>,
    /// 流特定参数
    pub params: StreamParams,
    /// 元数据 (标题, 语言等)
    pub metadata: Vec<(String, String)>,
}

/// 流特定参数
#[derive(Debug, Clone)]
pub enum StreamParams {
    /// 音频流参数
    Audio(AudioStreamParams),
    /// 其他 (未识别的逻辑流)
    Other,
}

/// 音频流参数
#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
}
