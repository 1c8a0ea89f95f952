//! # yue-format
//!
//! Yue 背景音乐框架容器格式库, 提供解封装框架.
//!
//! 本 crate 负责从容器格式 (Ogg) 中读取压缩数据包, 交由
//! yue-codec 的解码器解码.

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod io;
pub mod probe;
pub mod registry;
pub mod stream;

// 重导出常用类型
pub use demuxer::Demuxer;
pub use format_id::FormatId;
pub use io::IoContext;
pub use probe::ProbeResult;
pub use registry::FormatRegistry;
pub use stream::Stream;

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    demuxers::register_all_demuxers(registry);
}
