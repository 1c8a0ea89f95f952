//! 测试用的位流与合成包构造工具.
//!
//! 仅在单元测试内使用: 提供 LSB-first 位写入器, 以及构造最小可解码
//! 的 Vorbis 头包与音频包的辅助函数. 合成 setup 的结构固定为:
//! 1 个标量 codebook (entries=2, 码长全 1), 1 个 floor1 (无分区,
//! x = [0, 128]), 1 个 type-1 residue ([0,128) 分区 32, cascade 全 0),
//! 1 个无耦合 mapping, 短/长两个 mode.

use super::bitreader::LsbBitReader;
use super::codebook::Codebook;

/// LSB-first 位写入器 (与解码端 `LsbBitReader` 互逆)
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    pub(crate) fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_pos: 0,
        }
    }

    /// 写入 value 的低 bits 位, 从最低位开始
    pub(crate) fn write(&mut self, value: u32, bits: u8) {
        for i in 0..bits {
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 != 0 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (self.bit_pos % 8);
            }
            self.bit_pos += 1;
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// 构造全等码长的标量码表 (entries 须为 2 的幂, 码长 log2(entries)).
///
/// 规范分配下条目 i 的码字恰为 i (MSB-first 读法).
pub(crate) fn trivial_scalar_codebook(entries: u32, dims: u32) -> Codebook {
    let len = entries.trailing_zeros().max(1);
    let mut bw = BitWriter::new();
    bw.write(0x564342, 24);
    bw.write(dims, 16);
    bw.write(entries, 24);
    bw.write(0, 1); // ordered = false
    bw.write(0, 1); // sparse = false
    for _ in 0..entries {
        bw.write(len - 1, 5);
    }
    bw.write(0, 4); // lookup_type = 0
    let data = bw.finish();
    let mut br = LsbBitReader::new(&data);
    Codebook::decode_setup(&mut br).expect("构造测试标量码表失败")
}

/// 构造带 type-1 VQ lookup 的码表 (multiplicands 全 0, min/delta 为 0).
pub(crate) fn trivial_vq_codebook(entries: u32, dims: u32) -> Codebook {
    let len = entries.trailing_zeros().max(1);
    let mut bw = BitWriter::new();
    bw.write(0x564342, 24);
    bw.write(dims, 16);
    bw.write(entries, 24);
    bw.write(0, 1);
    bw.write(0, 1);
    for _ in 0..entries {
        bw.write(len - 1, 5);
    }
    bw.write(1, 4); // lookup_type = 1
    bw.write(0, 32); // min_value (打包浮点 0.0)
    bw.write(0, 32); // delta_value
    bw.write(0, 4); // value_bits - 1 → 1
    bw.write(0, 1); // sequence_p = false
    // lookup1_values(entries, dims) 个 1 位 multiplicand
    let lookup_values = super::codebook::lookup1_values(entries, dims);
    for _ in 0..lookup_values {
        bw.write(0, 1);
    }
    let data = bw.finish();
    let mut br = LsbBitReader::new(&data);
    Codebook::decode_setup(&mut br).expect("构造测试 VQ 码表失败")
}

/// 构造 identification 头包
pub(crate) fn build_ident_header(
    channels: u8,
    sample_rate: u32,
    bs0_exp: u8,
    bs1_exp: u8,
) -> Vec<u8> {
    let mut v = Vec::new();
    v.push(0x01);
    v.extend_from_slice(b"vorbis");
    v.extend_from_slice(&0u32.to_le_bytes()); // version
    v.push(channels);
    v.extend_from_slice(&sample_rate.to_le_bytes());
    v.extend_from_slice(&0i32.to_le_bytes()); // bitrate_max
    v.extend_from_slice(&128_000i32.to_le_bytes()); // bitrate_nom
    v.extend_from_slice(&0i32.to_le_bytes()); // bitrate_min
    v.push((bs1_exp << 4) | (bs0_exp & 0x0F));
    v.push(1); // framing
    v
}

/// 构造 comment 头包, 携带给定的 key=value 注释
pub(crate) fn build_comment_header(comments: &[(&str, &str)]) -> Vec<u8> {
    let mut v = Vec::new();
    v.push(0x03);
    v.extend_from_slice(b"vorbis");
    let vendor = b"yue";
    v.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    v.extend_from_slice(vendor);
    v.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for (key, value) in comments {
        let item = format!("{key}={value}");
        v.extend_from_slice(&(item.len() as u32).to_le_bytes());
        v.extend_from_slice(item.as_bytes());
    }
    v.push(1); // framing
    v
}

/// 构造带一条注释的 comment 头包
pub(crate) fn build_comment_packet() -> Vec<u8> {
    build_comment_header(&[("ENCODER", "yue")])
}

/// 构造最小 setup 头包负载 (不含 7 字节包头)
pub(crate) fn build_setup_payload() -> Vec<u8> {
    let mut bw = BitWriter::new();

    // 1 个 codebook: entries=2, dims=1, 码长 [1,1], 无 lookup
    bw.write(0, 8); // codebook_count - 1
    bw.write(0x564342, 24);
    bw.write(1, 16);
    bw.write(2, 24);
    bw.write(0, 1); // ordered = false
    bw.write(0, 1); // sparse = false
    bw.write(0, 5); // 码长 1
    bw.write(0, 5); // 码长 1
    bw.write(0, 4); // lookup_type = 0

    // 1 个 time transform, 值必须为 0
    bw.write(0, 6);
    bw.write(0, 16);

    // 1 个 floor1: 无分区, multiplier=1, x = [0, 128]
    bw.write(0, 6); // floor_count - 1
    bw.write(1, 16); // floor_type = 1
    bw.write(0, 5); // partitions = 0
    bw.write(0, 2); // multiplier - 1 → 1 (range 256)
    bw.write(7, 4); // range_bits → x1 = 128

    // 1 个 residue type 1: [0,128) 分区 32, 1 个分类, cascade 0
    bw.write(0, 6); // residue_count - 1
    bw.write(1, 16); // residue_type = 1
    bw.write(0, 24); // begin
    bw.write(128, 24); // end
    bw.write(31, 24); // partition_size - 1 → 32
    bw.write(0, 6); // classifications - 1 → 1
    bw.write(0, 8); // classbook = 0
    bw.write(0, 3); // cascade 低 3 位
    bw.write(0, 1); // 无扩展位

    // 1 个 mapping type 0: 单子映射, 无耦合
    bw.write(0, 6); // mapping_count - 1
    bw.write(0, 16); // mapping_type = 0
    bw.write(0, 1); // submaps flag → 1 个
    bw.write(0, 1); // coupling flag → 无
    bw.write(0, 2); // reserved
    bw.write(0, 8); // time submap (忽略)
    bw.write(0, 8); // floor_index = 0
    bw.write(0, 8); // residue_index = 0

    // 2 个 mode: 短块与长块
    bw.write(1, 6); // mode_count - 1
    bw.write(0, 1); // block_flag = 0
    bw.write(0, 16); // window_type
    bw.write(0, 16); // transform_type
    bw.write(0, 8); // mapping = 0
    bw.write(1, 1); // block_flag = 1
    bw.write(0, 16);
    bw.write(0, 16);
    bw.write(0, 8);

    bw.write(1, 1); // framing
    bw.finish()
}

/// 构造完整 setup 头包 (含 0x05 + "vorbis" 包头)
pub(crate) fn build_setup_packet() -> Vec<u8> {
    let mut v = vec![0x05];
    v.extend_from_slice(b"vorbis");
    v.extend_from_slice(&build_setup_payload());
    v
}

/// 构造所有声道均无能量的音频包 (仅消费包头与 floor 标志位)
pub(crate) fn build_silent_audio_packet(long_block: bool, channels: usize) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write(0, 1); // 音频包类型位
    bw.write(u32::from(long_block), 1); // mode 索引 (2 个 mode → 1 位)
    if long_block {
        bw.write(0, 2); // 前后窗形标志
    }
    for _ in 0..channels {
        bw.write(0, 1); // floor 无能量
    }
    bw.finish()
}

/// 构造所有声道均有能量的音频包 (floor y=100, residue 分类全 0).
///
/// residue 频谱保持全零, 经 floor 乘法与 IMDCT 后输出仍为静音,
/// 但走完整的解码链路.
pub(crate) fn build_energy_audio_packet(long_block: bool, channels: usize) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write(0, 1);
    bw.write(u32::from(long_block), 1);
    if long_block {
        bw.write(0, 2);
    }
    // floor: 每声道 [能量位 1, y0=100, y1=100] (range 256 → 8 位)
    for _ in 0..channels {
        bw.write(1, 1);
        bw.write(100, 8);
        bw.write(100, 8);
    }
    // residue pass 0 的分类码字: (128-0)/32 = 4 个分区,
    // classbook dims=1 → 每组每声道 1 个标量 (entry0 = 1 位 0)
    for _ in 0..4 {
        for _ in 0..channels {
            bw.write(0, 1);
        }
    }
    bw.finish()
}
