//! # Yue (乐)
//!
//! 纯 Rust 实现的背景音乐流式解码框架.
//!
//! Yue 把 Ogg 容器中的 Vorbis 压缩音频解码为交错 16 位 PCM 采样,
//! 供外部音频后端 (设备缓冲、混音) 消费:
//! - **容器层**: Ogg 页面校验与逻辑包重组
//! - **解码层**: 完整的 Vorbis I 解码链路 (codebook/floor/residue/
//!   coupling/IMDCT/加窗叠加)
//! - **管线层**: `MusicPipeline` 把 I/O → 解封装 → 解码串成一个
//!   顺序拉取的 PCM 帧源
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use yue::MusicPipeline;
//!
//! let mut pipeline = MusicPipeline::open_file("bgm.ogg").unwrap();
//! println!("{} Hz, {} 声道", pipeline.sample_rate(), pipeline.channels());
//! while let Some(frame) = pipeline.next_frame().unwrap() {
//!     // frame.data 为交错 S16 PCM, 交给音频后端
//!     let _ = frame.nb_samples;
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yue-core` | 核心类型与工具 |
//! | `yue-codec` | 音频解码器框架 |
//! | `yue-format` | 容器格式框架 |

mod music;

/// 核心类型与工具
pub use yue_core as core;

/// 音频解码器框架
pub use yue_codec as codec;

/// 容器格式框架
pub use yue_format as format;

pub use music::MusicPipeline;

/// 获取 Yue 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置解码器的注册表
pub fn default_codec_registry() -> yue_codec::CodecRegistry {
    let mut registry = yue_codec::CodecRegistry::new();
    yue_codec::register_all(&mut registry);
    registry
}

/// 创建已注册所有内置容器格式的注册表
pub fn default_format_registry() -> yue_format::FormatRegistry {
    let mut registry = yue_format::FormatRegistry::new();
    yue_format::register_all(&mut registry);
    registry
}
