//! Ogg 容器解封装器.
//!
//! 面向流式背景音乐场景: 绑定首个携带 Vorbis identification 包的
//! 逻辑流, 顺序输出逻辑包, 不支持 seek 与多逻辑流并发解复用.
//!
//! # Ogg 页面结构
//! ```text
//! Capture pattern: "OggS" (4 bytes)
//! Version:         1 byte (always 0)
//! Header type:     1 byte (flags: continued=0x01, BOS=0x02, EOS=0x04)
//! Granule pos:     8 bytes (little-endian, codec-specific)
//! Serial number:   4 bytes (identifies logical stream)
//! Page seq no:     4 bytes
//! CRC checksum:    4 bytes
//! Num segments:    1 byte
//! Segment table:   N bytes (each 1 byte, packet sizes)
//! Page data:       sum(segment_table) bytes
//! ```
//!
//! 段表中连续的 255 值段与其后首个非 255 段组合成一个完整 packet;
//! 末段为 255 表示 packet 跨页延续.

use bytes::Bytes;
use log::debug;
use yue_codec::{CodecId, Packet};
use yue_core::{ChannelLayout, MediaType, Rational, SampleFormat, YueError, YueResult};

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::FormatProbe;
use crate::stream::{AudioStreamParams, Stream, StreamParams};

/// Ogg 同步字 (capture pattern)
const OGG_SYNC: &[u8; 4] = b"OggS";
/// Ogg CRC-32 多项式
const OGG_CRC_POLY: u32 = 0x04C11DB7;

/// 页面头部标志
const FLAG_CONTINUED: u8 = 0x01;
const FLAG_BOS: u8 = 0x02;
const FLAG_EOS: u8 = 0x04;

/// 已解析的 Ogg 页面
struct OggPage {
    /// 头部标志
    header_type: u8,
    /// 粒度位置
    granule_position: i64,
    /// 逻辑流序列号
    serial_number: u32,
    /// 页面序号 (用于断点检测)
    page_sequence: u32,
    /// 段表
    segment_table: Vec<u8>,
    /// 页面数据
    data: Vec<u8>,
}

impl OggPage {
    /// 是否为 BOS (beginning of stream) 页面
    fn is_bos(&self) -> bool {
        self.header_type & FLAG_BOS != 0
    }

    /// 是否为 EOS (end of stream) 页面
    fn is_eos(&self) -> bool {
        self.header_type & FLAG_EOS != 0
    }

    /// 是否为续延页面 (前一个 packet 的延续)
    fn is_continued(&self) -> bool {
        self.header_type & FLAG_CONTINUED != 0
    }

    /// 从段表中提取 packet 边界
    ///
    /// 返回 (offset, length, is_complete) 列表
    fn extract_packets(&self) -> Vec<(usize, usize, bool)> {
        let mut packets = Vec::new();
        let mut offset = 0usize;
        let mut current_len = 0usize;

        for &seg_size in &self.segment_table {
            current_len += seg_size as usize;
            if seg_size < 255 {
                // packet 完成
                packets.push((offset, current_len, true));
                offset += current_len;
                current_len = 0;
            }
        }

        // 如果最后一个段是 255, 说明 packet 未完成 (跨页面)
        if current_len > 0 {
            packets.push((offset, current_len, false));
        }

        packets
    }
}

/// Ogg 解封装器
pub struct OggDemuxer {
    /// 流信息 (至多一条 Vorbis 流)
    streams: Vec<Stream>,
    /// 绑定的逻辑流序列号
    serial_number: Option<u32>,
    /// 累积的不完整 packet 数据
    partial_packet: Vec<u8>,
    /// 正在丢弃无头续包 (缺少起始片段)
    discarding_orphan_continued: bool,
    /// 上一个粒度位置
    last_granule: i64,
    /// 上一个页面序号
    last_page_sequence: Option<u32>,
    /// 待发送的数据包队列
    packet_queue: Vec<Packet>,
    /// 绑定的逻辑流是否已遇到 EOS
    ended: bool,
    /// 底层输入是否已耗尽
    eof: bool,
}

impl OggDemuxer {
    /// 创建 Ogg 解封装器实例 (工厂函数)
    pub fn create() -> YueResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self {
            streams: Vec::new(),
            serial_number: None,
            partial_packet: Vec::new(),
            discarding_orphan_continued: false,
            last_granule: yue_core::timestamp::NOPTS_VALUE,
            last_page_sequence: None,
            packet_queue: Vec::new(),
            ended: false,
            eof: false,
        }))
    }

    /// 归一化 Ogg granule 值.
    ///
    /// 负值 (常见为 -1) 表示当前页没有可用 granule 时间戳,
    /// 统一映射到框架的 NOPTS 表示.
    fn normalize_granule(granule: i64) -> i64 {
        if granule < 0 {
            yue_core::timestamp::NOPTS_VALUE
        } else {
            granule
        }
    }

    /// 计算 Ogg 页面 CRC-32
    fn ogg_crc32(data: &[u8]) -> u32 {
        let mut crc = 0u32;
        for &byte in data {
            crc ^= u32::from(byte) << 24;
            for _ in 0..8 {
                if crc & 0x8000_0000 != 0 {
                    crc = (crc << 1) ^ OGG_CRC_POLY;
                } else {
                    crc <<= 1;
                }
            }
        }
        crc
    }

    /// 读取并校验一个 Ogg 页面
    fn read_page(io: &mut IoContext) -> YueResult<OggPage> {
        // 读取同步字
        let sync = io.read_tag()?;
        if &sync[0..3] == b"ID3" {
            // ID3 标签开头说明这是 MP3 文件而不是 Ogg/Vorbis
            return Err(YueError::Format(
                "检测到 ID3 标签: 输入是 MP3 而非 Ogg/Vorbis".into(),
            ));
        }
        if &sync != OGG_SYNC {
            return Err(YueError::Format("无效的 Ogg 同步字".into()));
        }

        // 版本号 (必须为 0)
        let version = io.read_u8()?;
        if version != 0 {
            return Err(YueError::Format(format!("不支持的 Ogg 版本: {version}")));
        }

        let header_type = io.read_u8()?;
        let granule_position = io.read_u64_le()? as i64;
        let serial_number = io.read_u32_le()?;
        let page_sequence = io.read_u32_le()?;
        let crc = io.read_u32_le()?;
        let num_segments = io.read_u8()? as usize;

        // 读取段表与页面数据
        let segment_table = io.read_bytes(num_segments)?;
        let data_size: usize = segment_table.iter().map(|&s| s as usize).sum();
        let data = io.read_bytes(data_size)?;

        // Ogg CRC 覆盖整个页面, 其中 CRC 字段本身按 0 参与计算.
        let mut crc_page = Vec::with_capacity(27 + num_segments + data_size);
        crc_page.extend_from_slice(OGG_SYNC);
        crc_page.push(version);
        crc_page.push(header_type);
        crc_page.extend_from_slice(&(granule_position as u64).to_le_bytes());
        crc_page.extend_from_slice(&serial_number.to_le_bytes());
        crc_page.extend_from_slice(&page_sequence.to_le_bytes());
        crc_page.extend_from_slice(&0u32.to_le_bytes());
        crc_page.push(num_segments as u8);
        crc_page.extend_from_slice(&segment_table);
        crc_page.extend_from_slice(&data);
        let crc_calc = Self::ogg_crc32(&crc_page);
        if crc != crc_calc {
            return Err(YueError::Format(format!(
                "Ogg 页面 CRC 校验失败: 读取=0x{crc:08X}, 计算=0x{crc_calc:08X}",
            )));
        }

        Ok(OggPage {
            header_type,
            granule_position,
            serial_number,
            page_sequence,
            segment_table,
            data,
        })
    }

    /// 解析 Vorbis identification 头包中的音频参数
    fn parse_vorbis_header(data: &[u8]) -> Option<(u32, u32)> {
        // packet type (1) + "vorbis" (6) + version (4) + channels (1) + sample_rate (4)
        if data.len() < 16 || data[0] != 1 || &data[1..7] != b"vorbis" {
            return None;
        }
        let channels = u32::from(data[11]);
        let sample_rate = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        Some((sample_rate, channels))
    }

    /// 处理 BOS 页面: 首个 Vorbis 流被绑定, 其余逻辑流忽略
    fn handle_bos_page(&mut self, page: &OggPage) {
        if self.serial_number.is_some() {
            debug!(
                "Ogg: 忽略额外的逻辑流 (serial={}), 仅解复用单条 Vorbis 流",
                page.serial_number,
            );
            return;
        }

        let packets = page.extract_packets();
        let Some(&(offset, length, complete)) = packets.first() else {
            return;
        };
        if !complete {
            return;
        }
        let packet_data = &page.data[offset..offset + length];

        let Some((sample_rate, channels)) = Self::parse_vorbis_header(packet_data) else {
            debug!(
                "Ogg: BOS 页 (serial={}) 不是 Vorbis 流, 跳过",
                page.serial_number,
            );
            return;
        };

        let stream = Stream {
            index: 0,
            media_type: MediaType::Audio,
            codec_id: CodecId::Vorbis,
            time_base: Rational::new(1, sample_rate.max(1) as i32),
            duration: -1,
            extra_data: packet_data.to_vec(),
            params: StreamParams::Audio(AudioStreamParams {
                sample_rate,
                channel_layout: ChannelLayout::from_channels(channels),
                sample_format: SampleFormat::S16,
                bit_rate: 0,
            }),
            metadata: Vec::new(),
        };

        debug!(
            "Ogg: 发现 Vorbis 流 (serial={}, {} Hz, {}ch)",
            page.serial_number, sample_rate, channels,
        );

        self.streams.push(stream);
        self.serial_number = Some(page.serial_number);
        self.last_page_sequence = Some(page.page_sequence);
    }

    /// 处理数据页面, 提取逻辑包
    fn process_page(&mut self, page: OggPage) {
        if self.serial_number != Some(page.serial_number) {
            return; // 其他逻辑流, 跳过
        }
        if self.ended {
            return;
        }

        let mut force_granule_nopts = false;
        if let Some(prev_seq) = self.last_page_sequence
            && page.page_sequence != prev_seq.wrapping_add(1)
        {
            // 页面序号断裂: 清理残包状态避免跨断点拼包,
            // 且本页不传播 granule
            self.partial_packet.clear();
            self.discarding_orphan_continued = page.is_continued();
            force_granule_nopts = true;
        }
        self.last_page_sequence = Some(page.page_sequence);

        // 当前页未标记 continued 但存在残留 partial:
        // 上一页末段恰为 255 且包在页尾结束, 在此处补发
        if !page.is_continued() && !self.partial_packet.is_empty() {
            if self.discarding_orphan_continued {
                debug!(
                    "Ogg: 结束 orphan 丢弃状态, 丢弃 {} 字节残片",
                    self.partial_packet.len(),
                );
                self.partial_packet.clear();
                self.discarding_orphan_continued = false;
            } else {
                let granule = self.last_granule;
                let data = std::mem::take(&mut self.partial_packet);
                debug!("Ogg: 检测到页边界完整包, 补发 {} 字节", data.len());
                self.emit_packet(granule, data);
            }
        }

        let packets = page.extract_packets();
        let last_complete_idx = packets.iter().rposition(|(_, _, complete)| *complete);

        for (i, &(offset, length, complete)) in packets.iter().enumerate() {
            let chunk = &page.data[offset..offset + length];
            let granule = if force_granule_nopts {
                yue_core::timestamp::NOPTS_VALUE
            } else if Some(i) == last_complete_idx {
                Self::normalize_granule(page.granule_position)
            } else {
                yue_core::timestamp::NOPTS_VALUE
            };

            // 第一个 packet 且页面标记为 continued: 接续残片
            if i == 0 && page.is_continued() {
                // 没有前置残片时, 该续包缺少起始数据, 需要整包丢弃
                if self.partial_packet.is_empty() {
                    self.discarding_orphan_continued = !complete;
                    debug!(
                        "Ogg: 遇到无头续包, 丢弃当前片段 (len={length}, complete={complete})",
                    );
                    continue;
                }

                self.partial_packet.extend_from_slice(chunk);
                if complete {
                    let data = std::mem::take(&mut self.partial_packet);
                    self.discarding_orphan_continued = false;
                    self.emit_packet(granule, data);
                }
            } else if complete {
                if self.discarding_orphan_continued {
                    // 仍在丢弃缺失起始片段的续包
                    self.discarding_orphan_continued = false;
                    continue;
                }
                self.emit_packet(granule, chunk.to_vec());
            } else {
                if self.discarding_orphan_continued {
                    continue;
                }
                // packet 未完成, 缓存
                self.partial_packet.extend_from_slice(chunk);
            }
        }

        // 更新粒度位置
        if !force_granule_nopts && page.granule_position >= 0 {
            self.last_granule = page.granule_position;
        }

        if page.is_eos() {
            self.ended = true;
            debug!("Ogg: 逻辑流 (serial={}) 结束", page.serial_number);
        }
    }

    /// 创建并入队一个数据包
    fn emit_packet(&mut self, granule: i64, data: Vec<u8>) {
        let mut pkt = Packet::from_data(Bytes::from(data));
        pkt.stream_index = 0;
        let granule = Self::normalize_granule(granule);
        pkt.pts = granule;
        pkt.dts = granule;
        pkt.is_keyframe = true; // Ogg 不直接提供关键帧信息

        if let Some(stream) = self.streams.first() {
            pkt.time_base = stream.time_base;
        }

        self.packet_queue.push(pkt);
    }
}

impl Demuxer for OggDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Ogg
    }

    fn name(&self) -> &str {
        "ogg"
    }

    fn open(&mut self, io: &mut IoContext) -> YueResult<()> {
        // 读取 BOS 页面直到绑定 Vorbis 流
        loop {
            let page = Self::read_page(io)?;
            if page.is_bos() {
                self.handle_bos_page(&page);
            } else {
                // 第一个非 BOS 页面 - 头部结束, 处理此页面的数据
                self.process_page(page);
                break;
            }
        }

        if self.streams.is_empty() {
            return Err(YueError::Format("Ogg 文件中未找到 Vorbis 流".into()));
        }

        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> YueResult<Packet> {
        loop {
            // 先返回队列中的数据包
            if !self.packet_queue.is_empty() {
                return Ok(self.packet_queue.remove(0));
            }
            if self.eof || self.ended {
                return Err(YueError::Eof);
            }

            match Self::read_page(io) {
                Ok(page) => {
                    if page.is_bos() {
                        self.handle_bos_page(&page);
                    } else {
                        self.process_page(page);
                    }
                }
                Err(YueError::Eof) => {
                    self.eof = true;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Ogg 格式探测器
pub struct OggProbe;

impl FormatProbe for OggProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<crate::probe::ProbeScore> {
        // 魔数匹配
        if data.len() >= 4 && &data[0..4] == OGG_SYNC {
            return Some(crate::probe::SCORE_MAX);
        }
        // 某些文件会在 Ogg 前附带 ID3v2 标签, 尝试从标签后匹配
        if data.len() >= 14 && &data[0..3] == b"ID3" {
            let size = ((data[6] & 0x7F) as usize) << 21
                | ((data[7] & 0x7F) as usize) << 14
                | ((data[8] & 0x7F) as usize) << 7
                | (data[9] & 0x7F) as usize;
            let ogg_offset = 10 + size;
            if data.len() >= ogg_offset + 4 && &data[ogg_offset..ogg_offset + 4] == OGG_SYNC {
                return Some(crate::probe::SCORE_MAX - 2);
            }
        }

        // 扩展名匹配
        if let Some(name) = filename
            && let Some(ext) = name.rsplit('.').next()
        {
            let ext_lower = ext.to_lowercase();
            if matches!(ext_lower.as_str(), "ogg" | "oga") {
                return Some(crate::probe::SCORE_EXTENSION);
            }
        }

        None
    }

    fn format_id(&self) -> FormatId {
        FormatId::Ogg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    /// 构建一个 Ogg 页面 (含正确的 CRC)
    fn build_ogg_page(
        header_type: u8,
        granule: i64,
        serial: u32,
        page_seq: u32,
        packet_data: &[u8],
    ) -> Vec<u8> {
        build_ogg_page_segments(header_type, granule, serial, page_seq, packet_data, true)
    }

    /// 构建 Ogg 页面, `terminate` 控制末段是否闭合 packet
    fn build_ogg_page_segments(
        header_type: u8,
        granule: i64,
        serial: u32,
        page_seq: u32,
        packet_data: &[u8],
        terminate: bool,
    ) -> Vec<u8> {
        let mut page = Vec::new();

        page.extend_from_slice(b"OggS");
        page.push(0); // 版本
        page.push(header_type);
        page.extend_from_slice(&(granule as u64).to_le_bytes());
        page.extend_from_slice(&serial.to_le_bytes());
        page.extend_from_slice(&page_seq.to_le_bytes());
        // CRC 占位 (先填 0, 稍后计算)
        let crc_offset = page.len();
        page.extend_from_slice(&0u32.to_le_bytes());

        // 段表 (空页面不携带任何段, 如纯 EOS 标记页)
        let mut segments = Vec::new();
        let mut remaining = packet_data.len();
        while remaining >= 255 {
            segments.push(255u8);
            remaining -= 255;
        }
        if terminate {
            if !packet_data.is_empty() {
                segments.push(remaining as u8);
            }
        } else {
            assert_eq!(remaining, 0, "未闭合页面的数据长度须为 255 的倍数");
        }

        page.push(segments.len() as u8);
        page.extend_from_slice(&segments);
        page.extend_from_slice(packet_data);

        // 计算 CRC (CRC 字段按 0 参与计算, 当前已为 0)
        let crc = OggDemuxer::ogg_crc32(&page);
        page[crc_offset..crc_offset + 4].copy_from_slice(&crc.to_le_bytes());

        page
    }

    /// 构造 Vorbis identification 头包
    fn build_vorbis_id() -> Vec<u8> {
        let mut vorbis_id = Vec::new();
        vorbis_id.push(1u8); // packet type
        vorbis_id.extend_from_slice(b"vorbis");
        vorbis_id.extend_from_slice(&0u32.to_le_bytes()); // version
        vorbis_id.push(2); // channels
        vorbis_id.extend_from_slice(&44100u32.to_le_bytes()); // sample_rate
        vorbis_id.extend_from_slice(&0i32.to_le_bytes()); // bitrate_max
        vorbis_id.extend_from_slice(&128000i32.to_le_bytes()); // bitrate_nom
        vorbis_id.extend_from_slice(&0i32.to_le_bytes()); // bitrate_min
        vorbis_id.push(0xB8); // blocksize
        vorbis_id.push(1); // framing
        vorbis_id
    }

    /// 手动构造一个简单的 Ogg 文件 (含 Vorbis BOS 页面)
    fn build_minimal_ogg_vorbis() -> Vec<u8> {
        let mut data = Vec::new();
        let serial = 0x12345678;

        data.extend_from_slice(&build_ogg_page(FLAG_BOS, 0, serial, 0, &build_vorbis_id()));

        let audio_data = vec![0u8; 100];
        data.extend_from_slice(&build_ogg_page(0, 1024, serial, 1, &audio_data));

        data.extend_from_slice(&build_ogg_page(FLAG_EOS, 2048, serial, 2, &[]));

        data
    }

    fn open_demuxer(data: Vec<u8>) -> (Box<dyn Demuxer>, IoContext) {
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
        let mut demuxer = OggDemuxer::create().unwrap();
        demuxer.open(&mut io).unwrap();
        (demuxer, io)
    }

    #[test]
    fn test_probe_ogg_magic() {
        let probe = OggProbe;
        assert!(probe.probe(b"OggS", None).is_some());
        assert!(probe.probe(b"RIFF", None).is_none());
        assert_eq!(probe.format_id(), FormatId::Ogg);
    }

    #[test]
    fn test_probe_ogg_id3_prefix() {
        let probe = OggProbe;
        // ID3(size=0) + OggS
        let data = b"ID3\x04\x00\x00\x00\x00\x00\x00OggS";
        assert!(probe.probe(data, None).is_some());
    }

    #[test]
    fn test_probe_ogg_extension() {
        let probe = OggProbe;
        assert!(probe.probe(&[], Some("test.ogg")).is_some());
        assert!(probe.probe(&[], Some("test.oga")).is_some());
        assert!(probe.probe(&[], Some("test.mp3")).is_none());
    }

    #[test]
    fn test_demux_vorbis_single_stream() {
        let (demuxer, _io) = open_demuxer(build_minimal_ogg_vorbis());

        let streams = demuxer.streams();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].codec_id, CodecId::Vorbis);
        assert_eq!(streams[0].media_type, MediaType::Audio);

        match &streams[0].params {
            StreamParams::Audio(a) => {
                assert_eq!(a.sample_rate, 44100);
                assert_eq!(a.channel_layout.channels, 2);
            }
            _ => panic!("期望音频流参数"),
        }
    }

    #[test]
    fn test_id3标签识别为mp3() {
        let mut data = b"ID3\x03\x00".to_vec();
        data.extend_from_slice(&[0u8; 30]);
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(data)));
        let mut demuxer = OggDemuxer::create().unwrap();
        let err = demuxer.open(&mut io).expect_err("应报 MP3 错误");
        assert!(matches!(err, YueError::Format(msg) if msg.contains("MP3")));
    }

    #[test]
    fn test_非ogg签名报错() {
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(
            b"RIFFxxxxxxxxxxxxxxxxxxxxxxxxxxxx".to_vec(),
        )));
        let mut demuxer = OggDemuxer::create().unwrap();
        assert!(demuxer.open(&mut io).is_err());
    }

    #[test]
    fn test_非零版本报错() {
        let mut page = build_ogg_page(FLAG_BOS, 0, 1, 0, &build_vorbis_id());
        page[4] = 1; // 版本字节
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(page)));
        let mut demuxer = OggDemuxer::create().unwrap();
        assert!(demuxer.open(&mut io).is_err());
    }

    #[test]
    fn test_crc校验失败报错() {
        let mut page = build_ogg_page(FLAG_BOS, 0, 1, 0, &build_vorbis_id());
        let last = page.len() - 1;
        page[last] ^= 0xFF; // 破坏页面数据
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(page)));
        let mut demuxer = OggDemuxer::create().unwrap();
        let err = demuxer.open(&mut io).expect_err("应报 CRC 错误");
        assert!(matches!(err, YueError::Format(msg) if msg.contains("CRC")));
    }

    #[test]
    fn test_read_packets_与granule() {
        let (mut demuxer, mut io) = open_demuxer(build_minimal_ogg_vorbis());

        let pkt = demuxer.read_packet(&mut io).unwrap();
        assert_eq!(pkt.stream_index, 0);
        assert_eq!(pkt.size(), 100);
        assert_eq!(pkt.pts, 1024);
        assert_eq!(pkt.time_base, Rational::new(1, 44100));

        // EOS 页无数据, 队列耗尽后返回 Eof
        assert!(matches!(
            demuxer.read_packet(&mut io),
            Err(YueError::Eof)
        ));
    }

    #[test]
    fn test_packet跨页重组() {
        let serial = 0x42;
        let mut data = Vec::new();
        data.extend_from_slice(&build_ogg_page(FLAG_BOS, 0, serial, 0, &build_vorbis_id()));

        // 510 字节 packet: 前 510 字节在页 1 (两个 255 段, 未闭合),
        // 页 2 标记 continued, 以 40 字节段闭合
        let payload: Vec<u8> = (0..550u32).map(|i| (i % 251) as u8).collect();
        data.extend_from_slice(&build_ogg_page_segments(
            0,
            -1,
            serial,
            1,
            &payload[..510],
            false,
        ));
        data.extend_from_slice(&build_ogg_page(
            FLAG_CONTINUED | FLAG_EOS,
            4096,
            serial,
            2,
            &payload[510..],
        ));

        let (mut demuxer, mut io) = open_demuxer(data);
        let pkt = demuxer.read_packet(&mut io).unwrap();
        assert_eq!(pkt.size(), 550);
        assert_eq!(pkt.data.as_ref(), &payload[..]);
        assert_eq!(pkt.pts, 4096);
    }

    #[test]
    fn test_page_extract_packets() {
        // 段表 [100, 50, 255, 200]:
        // 100 < 255 → packet 1 完成 (100 字节)
        // 50 < 255 → packet 2 完成 (50 字节)
        // 255 = 255 → 累积
        // 200 < 255 → packet 3 完成 (255+200=455 字节)
        let page = OggPage {
            header_type: 0,
            granule_position: 100,
            serial_number: 1,
            page_sequence: 0,
            segment_table: vec![100, 50, 255, 200],
            data: vec![0u8; 100 + 50 + 255 + 200],
        };
        let packets = page.extract_packets();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0], (0, 100, true));
        assert_eq!(packets[1], (100, 50, true));
        assert_eq!(packets[2], (150, 455, true));

        // 段表以 255 结尾 → 最后一个 packet 未完成 (跨页面)
        let page2 = OggPage {
            header_type: 0,
            granule_position: 100,
            serial_number: 1,
            page_sequence: 0,
            segment_table: vec![100, 255],
            data: vec![0u8; 100 + 255],
        };
        let packets2 = page2.extract_packets();
        assert_eq!(packets2.len(), 2);
        assert_eq!(packets2[0], (0, 100, true));
        assert_eq!(packets2[1], (100, 255, false));
    }

    #[test]
    fn test_多逻辑流只绑定第一条vorbis流() {
        let mut data = Vec::new();
        // 第一条 BOS 不是 Vorbis
        data.extend_from_slice(&build_ogg_page(FLAG_BOS, 0, 1, 0, b"other codec"));
        // 第二条 BOS 是 Vorbis
        data.extend_from_slice(&build_ogg_page(FLAG_BOS, 0, 2, 0, &build_vorbis_id()));
        // 两条流各一页数据
        data.extend_from_slice(&build_ogg_page(0, 100, 1, 1, &[0xAA; 10]));
        data.extend_from_slice(&build_ogg_page(FLAG_EOS, 200, 2, 1, &[0xBB; 20]));

        let (mut demuxer, mut io) = open_demuxer(data);
        assert_eq!(demuxer.streams().len(), 1);

        let pkt = demuxer.read_packet(&mut io).unwrap();
        assert_eq!(pkt.size(), 20, "应只输出被绑定流的数据包");
        assert!(matches!(
            demuxer.read_packet(&mut io),
            Err(YueError::Eof)
        ));
    }
}
