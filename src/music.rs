//! 背景音乐解码管线.
//!
//! 把 I/O → Ogg 解封装 → Vorbis 解码串成一个顺序拉取的 PCM 帧源.
//! 播放、混音与设备输出由外部音频后端负责, 本管线止步于交错 S16
//! PCM 帧.

use log::debug;
use yue_codec::{AudioFrame, CodecParameters, CodecParamsType, Decoder};
use yue_core::{YueError, YueResult};
use yue_format::io::IoContext;
use yue_format::stream::StreamParams;
use yue_format::{Demuxer, FormatId};

/// 背景音乐解码管线
///
/// 一条管线对应一条音乐轨道, 由单一调用方 (通常是音频喂入线程)
/// 顺序驱动; 停止播放即停止调用并丢弃管线.
pub struct MusicPipeline {
    io: IoContext,
    demuxer: Box<dyn Demuxer>,
    decoder: Box<dyn Decoder>,
    sample_rate: u32,
    channels: u32,
    finished: bool,
}

impl std::fmt::Debug for MusicPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicPipeline")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl MusicPipeline {
    /// 从文件路径打开
    pub fn open_file(path: &str) -> YueResult<Self> {
        let io = IoContext::open_read(path)?;
        Self::open(io)
    }

    /// 从任意 I/O 上下文打开
    ///
    /// 解析容器头部并用首个 Vorbis 流初始化解码器.
    pub fn open(mut io: IoContext) -> YueResult<Self> {
        let mut demuxer = crate::default_format_registry().create_demuxer(FormatId::Ogg)?;
        demuxer.open(&mut io)?;

        let stream = demuxer
            .streams()
            .first()
            .ok_or_else(|| YueError::Format("容器中没有可用的音频流".into()))?;

        let (sample_rate, channels, audio_params) = match &stream.params {
            StreamParams::Audio(a) => (
                a.sample_rate,
                a.channel_layout.channels,
                yue_codec::AudioCodecParams {
                    sample_rate: a.sample_rate,
                    channel_layout: a.channel_layout,
                    sample_format: a.sample_format,
                    frame_size: 0,
                },
            ),
            _ => return Err(YueError::Format("首个流不是音频流".into())),
        };

        let codec_id = stream.codec_id;
        let extra_data = stream.extra_data.clone();
        let mut decoder = crate::default_codec_registry().create_decoder(codec_id)?;
        decoder.open(&CodecParameters {
            codec_id,
            extra_data,
            bit_rate: 0,
            params: CodecParamsType::Audio(audio_params),
        })?;

        // Vorbis 在 BOS 包之外还有 comment/setup 两个头包,
        // 在此一次性喂入, 使解码器进入稳态
        for _ in 0..2 {
            let packet = match demuxer.read_packet(&mut io) {
                Ok(p) => p,
                Err(YueError::Eof) => {
                    return Err(YueError::Format("Vorbis 头包不完整".into()));
                }
                Err(e) => return Err(e),
            };
            decoder.send_packet(&packet)?;
        }

        debug!("音乐管线就绪: {codec_id} ({sample_rate} Hz, {channels}ch)");

        Ok(Self {
            io,
            demuxer,
            decoder,
            sample_rate,
            channels,
            finished: false,
        })
    }

    /// 采样率 (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// 声道数
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// 解码器捕获的元数据 (如 Vorbis comment 中的曲目信息)
    pub fn metadata(&self) -> &[(String, String)] {
        self.decoder.metadata()
    }

    /// 拉取下一帧交错 S16 PCM.
    ///
    /// 返回 `Ok(None)` 表示轨道播放结束 (流末尾), 这是常规情况;
    /// 其余错误表示容器或码流损坏.
    pub fn next_frame(&mut self) -> YueResult<Option<AudioFrame>> {
        loop {
            match self.decoder.receive_frame() {
                Ok(frame) => return Ok(Some(frame)),
                Err(YueError::NeedMoreData) => {}
                Err(e) => return Err(e),
            }
            if self.finished {
                return Ok(None);
            }

            match self.demuxer.read_packet(&mut self.io) {
                Ok(packet) => match self.decoder.send_packet(&packet) {
                    Ok(()) => {}
                    Err(YueError::Eof) => {
                        // 包内位流在帧中途耗尽: 视为轨道结束
                        self.finished = true;
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                },
                Err(YueError::Eof) => {
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yue_format::io::MemoryBackend;

    #[test]
    fn test_非ogg输入打开失败() {
        let io = IoContext::new(Box::new(MemoryBackend::from_data(
            b"RIFF....WAVEfmt ....................".to_vec(),
        )));
        assert!(MusicPipeline::open(io).is_err());
    }

    #[test]
    fn test_mp3输入给出专门错误() {
        let mut data = b"ID3\x03\x00".to_vec();
        data.extend_from_slice(&[0u8; 60]);
        let io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
        let err = MusicPipeline::open(io).expect_err("应报 MP3 错误");
        assert!(matches!(err, YueError::Format(msg) if msg.contains("MP3")));
    }
}
