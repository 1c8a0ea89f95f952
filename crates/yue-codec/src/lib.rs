//! # yue-codec
//!
//! Yue 背景音乐框架解码器库, 提供解码器框架与 Packet/AudioFrame 抽象.
//!
//! 本 crate 定义了解码器注册与解码流程的核心抽象.
//!
//! ## 支持的解码器
//!
//! - **Vorbis**: 完整的 Vorbis I 音频解码链路 (codebook/floor/residue/
//!   coupling/IMDCT/加窗叠加), 输出交错 S16 PCM
//!
//! ## 使用示例
//!
//! ```rust
//! use yue_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! yue_codec::register_all(&mut reg);
//!
//! // 按 CodecId 创建解码器实例
//! let decoder = reg.create_decoder(CodecId::Vorbis).unwrap();
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{AudioCodecParams, CodecParameters, CodecParamsType};
pub use decoder::Decoder;
pub use frame::AudioFrame;
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
