//! 音频采样格式定义.
//!
//! 定义了单个音频采样点的数据类型和排列方式.
//! 本框架的解码输出均为交错 (Interleaved) 格式, 即 LRLRLR...

use std::fmt;

/// 音频采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 未指定
    None,
    /// 有符号 16 位整数, 交错
    S16,
    /// 32 位浮点, 交错
    F32,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::S16 => 2,
            Self::F32 => 4,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::S16 => "s16",
            Self::F32 => "flt",
        };
        write!(f, "{name}")
    }
}
