//! 解码后的音频帧数据 (AudioFrame).
//!
//! 表示解码后的原始音频采样数据.

use yue_core::{ChannelLayout, Rational, SampleFormat};

/// 音频帧
///
/// 包含解码后的原始音频采样数据.
/// 本框架的解码器输出均为交错格式: `data` 中所有声道交替排列.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 音频采样数据 (交错排列)
    pub data: Vec<u8>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
    /// 帧时长 (以 time_base 为单位)
    pub duration: i64,
}

impl AudioFrame {
    /// 创建空的音频帧
    pub fn new(
        nb_samples: u32,
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
    ) -> Self {
        Self {
            data: Vec::new(),
            nb_samples,
            sample_rate,
            sample_format,
            channel_layout,
            pts: yue_core::timestamp::NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
            duration: 0,
        }
    }

    /// 以 i16 采样点视角访问交错数据 (仅 S16 格式有意义)
    pub fn samples_i16(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }
}
