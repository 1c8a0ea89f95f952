//! Vorbis 音频解码器.
//!
//! 完整的 Vorbis I 解码链路:
//! - 三个头包 (identification/comment/setup) 解析与校验
//! - setup 中 codebook/floor/residue/mapping/mode 的完整构建
//! - 音频包: floor 解码 → residue 解码 → 耦合反变换 → floor 曲线
//!   合成 → IMDCT → 加窗叠加, 输出交错 S16 PCM
//!
//! 解码器状态机严格按 identification → comment → setup → audio
//! 顺序推进, 任何头包类型或同步标识不符都是该流的终止性错误.
//! 帧解码阶段的位流耗尽 (`Eof`) 是流结束的常规情况, 不视为损坏.

mod bitreader;
mod codebook;
mod floor;
mod headers;
mod imdct;
mod mapping;
mod residue;
mod setup;
#[cfg(test)]
pub(crate) mod testutil;
mod window;

use log::debug;
use yue_core::{Rational, SampleFormat, YueError, YueResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::decoder::Decoder;
use crate::frame::AudioFrame;
use crate::packet::Packet;

use self::bitreader::LsbBitReader;
use self::headers::{
    IdentHeader, channel_layout, check_setup_header, parse_comment_header,
    parse_identification_header,
};
use self::imdct::ImdctState;
use self::setup::{VorbisSetup, parse_setup};
use self::window::{BlockWindow, compute_window, output_channel_order, output_frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStage {
    Identification,
    Comment,
    Setup,
    Audio,
}

/// Vorbis 解码器
#[derive(Clone)]
pub struct VorbisDecoder {
    opened: bool,
    stage: HeaderStage,
    ident: Option<IdentHeader>,
    metadata: Vec<(String, String)>,
    pipeline: Option<FramePipeline>,
    pending: Option<AudioFrame>,
}

impl VorbisDecoder {
    /// 创建 Vorbis 解码器 (工厂函数)
    pub fn create() -> YueResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new()))
    }

    /// 创建具体类型的解码器实例
    pub fn new() -> Self {
        Self {
            opened: false,
            stage: HeaderStage::Identification,
            ident: None,
            metadata: Vec::new(),
            pipeline: None,
            pending: None,
        }
    }

    fn parse_identification(&mut self, packet: &[u8]) -> YueResult<()> {
        let ident = parse_identification_header(packet)?;
        debug!(
            "Vorbis identification: {}ch, {} Hz, blocksizes {:?}",
            ident.channels, ident.sample_rate, ident.block_sizes,
        );
        self.ident = Some(ident);
        self.stage = HeaderStage::Comment;
        Ok(())
    }

    fn parse_comment(&mut self, packet: &[u8]) -> YueResult<()> {
        self.metadata = parse_comment_header(packet)?;
        self.stage = HeaderStage::Setup;
        Ok(())
    }

    fn parse_setup_header(&mut self, packet: &[u8]) -> YueResult<()> {
        let ident = self
            .ident
            .as_ref()
            .ok_or_else(|| YueError::InvalidData("Vorbis setup 前缺少 identification 头".into()))?;

        let payload = check_setup_header(packet)?;
        let setup = parse_setup(payload, usize::from(ident.channels))?;
        debug!(
            "Vorbis setup: {} codebooks, {} floors, {} residues, {} mappings, {} modes",
            setup.codebooks.len(),
            setup.floors.len(),
            setup.residues.len(),
            setup.mappings.len(),
            setup.modes.len(),
        );

        self.pipeline = Some(FramePipeline::new(ident, setup));
        self.stage = HeaderStage::Audio;
        Ok(())
    }

    fn handle_audio_packet(&mut self, packet: &[u8]) -> YueResult<()> {
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| YueError::Codec("Vorbis 头信息未就绪".into()))?;
        self.pending = pipeline.decode_packet(packet)?;
        Ok(())
    }
}

impl Default for VorbisDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for VorbisDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Vorbis
    }

    fn name(&self) -> &str {
        "vorbis"
    }

    fn open(&mut self, params: &CodecParameters) -> YueResult<()> {
        self.opened = true;
        self.stage = HeaderStage::Identification;
        self.ident = None;
        self.metadata.clear();
        self.pipeline = None;
        self.pending = None;

        // 容器层把 identification 头包作为 extra_data 提供时直接消费
        if !params.extra_data.is_empty() {
            self.parse_identification(&params.extra_data)?;
        }
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> YueResult<()> {
        if !self.opened {
            return Err(YueError::Codec("Vorbis 解码器未打开".into()));
        }
        if packet.is_empty() {
            return Ok(());
        }

        let data = packet.data.as_ref();
        match self.stage {
            HeaderStage::Identification => {
                // BOS 包可能与 extra_data 重复, 容忍重复的 identification
                self.parse_identification(data)
            }
            HeaderStage::Comment => self.parse_comment(data),
            HeaderStage::Setup => self.parse_setup_header(data),
            HeaderStage::Audio => self.handle_audio_packet(data),
        }
    }

    fn receive_frame(&mut self) -> YueResult<AudioFrame> {
        self.pending.take().ok_or(YueError::NeedMoreData)
    }

    fn flush(&mut self) {
        self.pending = None;
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.reset();
        }
    }

    fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }
}

/// 音频帧解码管线: setup 配置 + 每帧工作缓冲.
///
/// 频谱/时域缓冲按前后两帧双缓冲, 每帧翻转 `active` 下标交换角色;
/// 各声道切片始终是缓冲的视图而非独立分配.
#[derive(Clone)]
struct FramePipeline {
    channels: usize,
    sample_rate: u32,
    block_sizes: [usize; 2],
    setup: VorbisSetup,
    imdct: [ImdctState; 2],
    windows: [BlockWindow; 2],
    /// 双缓冲的各声道频谱/时域数据 (长块尺寸)
    values: [Vec<Vec<f32>>; 2],
    /// 当前帧写入的缓冲下标
    active: usize,
    prev_block_size: usize,
    channel_order: Vec<usize>,
    /// 已输出的采样计数 (每声道), 作为帧 pts
    samples_out: i64,
}

impl FramePipeline {
    fn new(ident: &IdentHeader, setup: VorbisSetup) -> Self {
        let channels = usize::from(ident.channels);
        let block_sizes = ident.block_sizes;
        let long = block_sizes[1];

        Self {
            channels,
            sample_rate: ident.sample_rate,
            block_sizes,
            setup,
            imdct: [ImdctState::new(block_sizes[0]), ImdctState::new(block_sizes[1])],
            windows: [compute_window(block_sizes[0]), compute_window(block_sizes[1])],
            values: [
                vec![vec![0.0f32; long]; channels],
                vec![vec![0.0f32; long]; channels],
            ],
            active: 0,
            prev_block_size: 0,
            channel_order: output_channel_order(channels),
            samples_out: 0,
        }
    }

    fn reset(&mut self) {
        self.prev_block_size = 0;
        self.samples_out = 0;
        for buf in &mut self.values {
            for ch in buf.iter_mut() {
                ch.fill(0.0);
            }
        }
    }

    /// 解码一个音频包.
    ///
    /// 第一个成功解码的帧只建立重叠基准, 返回 `None` (无输出样本);
    /// 之后每帧输出 `(prev/4 + cur/4) * channels` 个交错样本.
    fn decode_packet(&mut self, data: &[u8]) -> YueResult<Option<AudioFrame>> {
        let mut br = LsbBitReader::new(data);

        if br.read_flag()? {
            return Err(YueError::InvalidData("Vorbis 音频包首位必须为 0".into()));
        }

        let mode_idx = br.read_bits(self.setup.mode_num_bits)? as usize;
        let mode = self
            .setup
            .modes
            .get(mode_idx)
            .ok_or_else(|| YueError::InvalidData(format!("Vorbis mode 索引越界: {mode_idx}")))?;
        let mapping = &self.setup.mappings[usize::from(mode.mapping)];

        let long_block = mode.block_flag;
        let cur_n = self.block_sizes[usize::from(long_block)];
        let n2 = cur_n / 2;

        // 长块携带前后块窗形标志, 重叠尺寸由相邻块自身决定, 不使用
        if long_block {
            let _ = br.read_bits(2)?;
        }

        // 双缓冲翻转: 上一帧数据成为 prev, 本帧写入 active
        self.active ^= 1;
        let active = self.active;
        for ch in self.values[active].iter_mut() {
            ch[..cur_n].fill(0.0);
        }

        // floor 解码 (逐声道)
        let mut has_floor = vec![false; self.channels];
        let mut y_lists: Vec<Option<Vec<i32>>> = vec![None; self.channels];
        for ch in 0..self.channels {
            let submap = usize::from(mapping.mux[ch]);
            let floor_idx = usize::from(mapping.floor_index[submap]);
            let decoded =
                self.setup.floors[floor_idx].decode_frame(&mut br, &self.setup.codebooks)?;
            has_floor[ch] = decoded.is_some();
            y_lists[ch] = decoded;
        }

        // 非零向量传播: 耦合对中任一声道有能量则两侧都需解码
        let mut has_residue = has_floor.clone();
        for step in 0..mapping.coupling_steps {
            let mag = usize::from(mapping.magnitude[step]);
            let ang = usize::from(mapping.angle[step]);
            if has_residue[mag] || has_residue[ang] {
                has_residue[mag] = true;
                has_residue[ang] = true;
            }
        }

        // residue 解码 (逐子映射)
        for submap in 0..mapping.submaps {
            let mut submap_channels = Vec::new();
            let mut do_not_decode = Vec::new();
            for ch in 0..self.channels {
                if usize::from(mapping.mux[ch]) != submap {
                    continue;
                }
                submap_channels.push(ch);
                do_not_decode.push(!has_residue[ch]);
            }

            let residue_idx = usize::from(mapping.residue_index[submap]);
            self.setup.residues[residue_idx].decode_frame(
                &mut br,
                &self.setup.codebooks,
                &submap_channels,
                &do_not_decode,
                &mut self.values[active],
                n2,
            )?;
        }

        // 耦合反变换 (按声明逆序)
        mapping.inverse_coupling(&mut self.values[active], n2);

        // floor 曲线合成, 乘入 residue 频谱
        for ch in 0..self.channels {
            let Some(y_list) = &y_lists[ch] else {
                continue;
            };
            let submap = usize::from(mapping.mux[ch]);
            let floor_idx = usize::from(mapping.floor_index[submap]);
            self.setup.floors[floor_idx].synthesis(y_list, &mut self.values[active][ch], n2);
        }

        // IMDCT: 无能量声道输出静音
        for ch in 0..self.channels {
            if !has_floor[ch] {
                self.values[active][ch][..cur_n].fill(0.0);
            } else {
                let input = self.values[active][ch][..n2].to_vec();
                self.imdct[usize::from(long_block)]
                    .calc(&input, &mut self.values[active][ch][..cur_n]);
            }
        }
        // 包尾剩余位随包边界丢弃 (字节对齐语义由包边界保证)

        // 首帧只建立重叠基准
        if self.prev_block_size == 0 {
            self.prev_block_size = cur_n;
            return Ok(None);
        }

        let samples = output_frame(
            &self.values[1 - active],
            &self.values[active],
            self.prev_block_size,
            cur_n,
            self.block_sizes,
            &self.windows,
            &self.channel_order,
        );
        self.prev_block_size = cur_n;

        let nb_samples = (samples.len() / self.channels) as u32;
        let mut frame = AudioFrame::new(
            nb_samples,
            self.sample_rate,
            SampleFormat::S16,
            channel_layout(self.channels as u8),
        );
        frame.pts = self.samples_out;
        frame.time_base = Rational::new(1, self.sample_rate as i32);
        frame.duration = i64::from(nb_samples);
        frame.data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.samples_out += i64::from(nb_samples);

        Ok(Some(frame))
    }
}
