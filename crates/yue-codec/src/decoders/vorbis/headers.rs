//! Vorbis 头包解析: identification 与 comment.
//!
//! 三个头包 (identification/comment/setup) 按固定顺序出现, 包类型
//! 字节分别为 0x01/0x03/0x05, 后接 "vorbis" 标识. 任何类型或标识
//! 不符都是该流的终止性错误.

use yue_core::{ChannelLayout, YueError, YueResult};

/// Vorbis 最大声道数
pub(crate) const VORBIS_MAX_CHANS: u8 = 8;
/// 合法块尺寸范围 [64, 8192] 中的最大值
pub(crate) const VORBIS_MAX_BLOCK_SIZE: u32 = 8192;

#[derive(Debug, Clone)]
pub(crate) struct IdentHeader {
    pub(crate) channels: u8,
    pub(crate) sample_rate: u32,
    /// 短块与长块尺寸 (短 ≤ 长)
    pub(crate) block_sizes: [usize; 2],
}

fn check_packet_magic(packet: &[u8], packet_type: u8, what: &str) -> YueResult<()> {
    if packet.len() < 7 {
        return Err(YueError::InvalidData(format!(
            "Vorbis {what} 头包长度不足: {}",
            packet.len(),
        )));
    }
    if packet[0] != packet_type || &packet[1..7] != b"vorbis" {
        return Err(YueError::InvalidData(format!(
            "Vorbis {what} 头包标识无效",
        )));
    }
    Ok(())
}

fn valid_block_size(size: u32) -> bool {
    size >= 64 && size <= VORBIS_MAX_BLOCK_SIZE && size.is_power_of_two()
}

/// 解析 identification 头包 (类型 0x01).
pub(crate) fn parse_identification_header(packet: &[u8]) -> YueResult<IdentHeader> {
    check_packet_magic(packet, 0x01, "identification")?;
    if packet.len() < 30 {
        return Err(YueError::InvalidData(format!(
            "Vorbis identification 头包长度不足: {}",
            packet.len(),
        )));
    }

    let version = u32::from_le_bytes([packet[7], packet[8], packet[9], packet[10]]);
    if version != 0 {
        return Err(YueError::InvalidData(format!(
            "Vorbis 版本不支持: {version}",
        )));
    }

    let channels = packet[11];
    if channels == 0 || channels > VORBIS_MAX_CHANS {
        return Err(YueError::InvalidData(format!(
            "Vorbis 声道数非法: {channels}",
        )));
    }

    let sample_rate = u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]);
    if sample_rate == 0 {
        return Err(YueError::InvalidData("Vorbis 采样率不能为 0".into()));
    }

    // (16..28) bitrate_maximum / nominal / minimum, 解码不使用
    let bs = packet[28];
    let blocksize0 = 1u32 << (bs & 0x0F);
    let blocksize1 = 1u32 << (bs >> 4);
    if !valid_block_size(blocksize0) || !valid_block_size(blocksize1) || blocksize0 > blocksize1
    {
        return Err(YueError::InvalidData(format!(
            "Vorbis blocksize 非法: bs0={blocksize0}, bs1={blocksize1}",
        )));
    }

    if packet[29] & 0x01 == 0 {
        return Err(YueError::InvalidData(
            "Vorbis identification 头包 framing_flag 非法".into(),
        ));
    }

    Ok(IdentHeader {
        channels,
        sample_rate,
        block_sizes: [blocksize0 as usize, blocksize1 as usize],
    })
}

/// 解析 comment 头包 (类型 0x03), 捕获 key=value 元数据.
///
/// vendor 字符串跳过; 注释项按 UTF-8 (lossy) 解析, 无 '=' 的
/// 非法项忽略.
pub(crate) fn parse_comment_header(packet: &[u8]) -> YueResult<Vec<(String, String)>> {
    check_packet_magic(packet, 0x03, "comment")?;

    let mut pos = 7usize;
    let vendor_len = read_le_u32(packet, &mut pos)? as usize;
    ensure_left(packet, pos, vendor_len, "Vorbis vendor 字段")?;
    pos += vendor_len;

    let mut metadata = Vec::new();
    let comment_count = read_le_u32(packet, &mut pos)? as usize;
    for _ in 0..comment_count {
        let comment_len = read_le_u32(packet, &mut pos)? as usize;
        ensure_left(packet, pos, comment_len, "Vorbis comment 项")?;
        let raw = &packet[pos..pos + comment_len];
        pos += comment_len;

        let text = String::from_utf8_lossy(raw);
        if let Some((key, value)) = text.split_once('=') {
            metadata.push((key.to_ascii_lowercase(), value.to_string()));
        }
    }

    ensure_left(packet, pos, 1, "Vorbis comment framing_flag")?;
    if packet[pos] & 0x01 == 0 {
        return Err(YueError::InvalidData(
            "Vorbis comment 头包 framing_flag 非法".into(),
        ));
    }

    Ok(metadata)
}

/// 校验 setup 头包 (类型 0x05) 的标识, 返回位流负载.
pub(crate) fn check_setup_header(packet: &[u8]) -> YueResult<&[u8]> {
    check_packet_magic(packet, 0x05, "setup")?;
    Ok(&packet[7..])
}

fn ensure_left(data: &[u8], pos: usize, need: usize, what: &str) -> YueResult<()> {
    if pos.saturating_add(need) > data.len() {
        return Err(YueError::InvalidData(format!(
            "{what} 读取越界: pos={pos}, need={need}, len={}",
            data.len(),
        )));
    }
    Ok(())
}

fn read_le_u32(data: &[u8], pos: &mut usize) -> YueResult<u32> {
    ensure_left(data, *pos, 4, "Vorbis u32")?;
    let v = u32::from_le_bytes([data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]]);
    *pos += 4;
    Ok(v)
}

/// 由声道数生成默认布局 (Vorbis 无自定义布局字段)
pub(crate) fn channel_layout(channels: u8) -> ChannelLayout {
    ChannelLayout::from_channels(u32::from(channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::vorbis::testutil::{build_comment_header, build_ident_header};

    #[test]
    fn test_identification_解析成功() {
        let packet = build_ident_header(2, 44100, 8, 11);
        let h = parse_identification_header(&packet).expect("解析失败");
        assert_eq!(h.channels, 2);
        assert_eq!(h.sample_rate, 44100);
        assert_eq!(h.block_sizes, [256, 2048]);
    }

    #[test]
    fn test_identification_标识无效() {
        let mut packet = build_ident_header(2, 44100, 8, 11);
        packet[1] = b'x';
        assert!(parse_identification_header(&packet).is_err());
    }

    #[test]
    fn test_identification_声道数越界() {
        let packet = build_ident_header(0, 44100, 8, 11);
        assert!(parse_identification_header(&packet).is_err());
        let packet = build_ident_header(9, 44100, 8, 11);
        assert!(parse_identification_header(&packet).is_err());
    }

    #[test]
    fn test_identification_blocksize非法() {
        // 短块 > 长块
        let packet = build_ident_header(2, 44100, 11, 8);
        assert!(parse_identification_header(&packet).is_err());
        // 指数 5 → 32 < 64
        let packet = build_ident_header(2, 44100, 5, 8);
        assert!(parse_identification_header(&packet).is_err());
        // 指数 14 → 16384 > 8192
        let packet = build_ident_header(2, 44100, 8, 14);
        assert!(parse_identification_header(&packet).is_err());
    }

    #[test]
    fn test_identification_framing位缺失() {
        let mut packet = build_ident_header(2, 44100, 8, 11);
        let last = packet.len() - 1;
        packet[last] = 0;
        assert!(parse_identification_header(&packet).is_err());
    }

    #[test]
    fn test_comment_解析与元数据捕获() {
        let packet = build_comment_header(&[("ARTIST", "someone"), ("TITLE", "bgm")]);
        let metadata = parse_comment_header(&packet).expect("解析失败");
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0], ("artist".to_string(), "someone".to_string()));
        assert_eq!(metadata[1], ("title".to_string(), "bgm".to_string()));
    }

    #[test]
    fn test_comment_长度越界报错() {
        let mut packet = Vec::new();
        packet.push(0x03);
        packet.extend_from_slice(b"vorbis");
        packet.extend_from_slice(&100u32.to_le_bytes()); // vendor 长度超出包
        assert!(parse_comment_header(&packet).is_err());
    }

    #[test]
    fn test_setup_头包标识校验() {
        let mut packet = vec![0x05];
        packet.extend_from_slice(b"vorbis");
        packet.push(0xAA);
        let payload = check_setup_header(&packet).expect("校验失败");
        assert_eq!(payload, &[0xAA]);

        let mut bad = packet.clone();
        bad[0] = 0x01;
        assert!(check_setup_header(&bad).is_err());
    }
}
