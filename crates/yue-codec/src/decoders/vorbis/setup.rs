//! Vorbis setup 头包解析.
//!
//! setup 包依次携带 codebooks、time transforms、floors、residues、
//! mappings、modes 六组静态配置, 以 framing 位收尾. 所有计数与
//! 索引在解析时校验, 越界字段返回错误而不是溢出.

use yue_core::{YueError, YueResult};

use super::bitreader::{LsbBitReader, ilog};
use super::codebook::Codebook;
use super::floor::Floor;
use super::mapping::Mapping;
use super::residue::Residue;

#[derive(Debug, Clone)]
pub(crate) struct Mode {
    /// 块尺寸选择: false = 短块, true = 长块
    pub(crate) block_flag: bool,
    pub(crate) mapping: u8,
}

#[derive(Debug, Clone)]
pub(crate) struct VorbisSetup {
    pub(crate) codebooks: Vec<Codebook>,
    pub(crate) floors: Vec<Floor>,
    pub(crate) residues: Vec<Residue>,
    pub(crate) mappings: Vec<Mapping>,
    pub(crate) modes: Vec<Mode>,
    /// 音频包头中 mode 索引的位宽: ilog(mode_count - 1)
    pub(crate) mode_num_bits: u8,
}

/// 解析 setup 头包负载 (不含 7 字节包头).
pub(crate) fn parse_setup(payload: &[u8], channels: usize) -> YueResult<VorbisSetup> {
    let mut br = LsbBitReader::new(payload);

    let codebooks = parse_codebooks(&mut br).map_err(|e| wrap(&br, "codebooks", e))?;
    parse_time_transforms(&mut br).map_err(|e| wrap(&br, "time", e))?;
    let floors =
        parse_floors(&mut br, codebooks.len()).map_err(|e| wrap(&br, "floors", e))?;
    let residues =
        parse_residues(&mut br, &codebooks).map_err(|e| wrap(&br, "residues", e))?;
    let mappings = parse_mappings(&mut br, channels, floors.len(), residues.len())
        .map_err(|e| wrap(&br, "mappings", e))?;
    let modes = parse_modes(&mut br, mappings.len()).map_err(|e| wrap(&br, "modes", e))?;

    let framing = br.read_flag()?;
    if !framing {
        return Err(YueError::InvalidData(
            "Vorbis setup 头包 framing_flag 非法".into(),
        ));
    }
    br.align();

    let mode_num_bits = ilog(modes.len() as u32 - 1);
    Ok(VorbisSetup {
        codebooks,
        floors,
        residues,
        mappings,
        modes,
        mode_num_bits,
    })
}

fn wrap(br: &LsbBitReader<'_>, stage: &str, e: YueError) -> YueError {
    YueError::InvalidData(format!(
        "Vorbis setup {stage} 解析失败(bit={}): {e}",
        br.bit_position(),
    ))
}

fn parse_codebooks(br: &mut LsbBitReader<'_>) -> YueResult<Vec<Codebook>> {
    let count = br.read_bits(8)? + 1;
    let mut codebooks = Vec::with_capacity(count as usize);
    for _ in 0..count {
        codebooks.push(Codebook::decode_setup(br)?);
    }
    Ok(codebooks)
}

fn parse_time_transforms(br: &mut LsbBitReader<'_>) -> YueResult<()> {
    let count = br.read_bits(6)? + 1;
    for _ in 0..count {
        let value = br.read_bits(16)?;
        if value != 0 {
            return Err(YueError::InvalidData(
                "Vorbis time domain transform 必须为 0".into(),
            ));
        }
    }
    Ok(())
}

fn parse_floors(br: &mut LsbBitReader<'_>, codebook_count: usize) -> YueResult<Vec<Floor>> {
    let count = br.read_bits(6)? + 1;
    let mut floors = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let floor_type = br.read_bits(16)?;
        if floor_type != 1 {
            return Err(YueError::Unsupported(format!(
                "Vorbis floor_type 不支持: {floor_type}",
            )));
        }
        floors.push(Floor::decode_setup(br, codebook_count)?);
    }
    Ok(floors)
}

fn parse_residues(
    br: &mut LsbBitReader<'_>,
    codebooks: &[Codebook],
) -> YueResult<Vec<Residue>> {
    let count = br.read_bits(6)? + 1;
    let mut residues = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let residue_type = br.read_bits(16)?;
        if residue_type > 2 {
            return Err(YueError::Unsupported(format!(
                "Vorbis residue_type 不支持: {residue_type}",
            )));
        }
        residues.push(Residue::decode_setup(br, residue_type as u8, codebooks)?);
    }
    Ok(residues)
}

fn parse_mappings(
    br: &mut LsbBitReader<'_>,
    channels: usize,
    floor_count: usize,
    residue_count: usize,
) -> YueResult<Vec<Mapping>> {
    let count = br.read_bits(6)? + 1;
    let mut mappings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mapping_type = br.read_bits(16)?;
        if mapping_type != 0 {
            return Err(YueError::Unsupported(format!(
                "Vorbis mapping_type 不支持: {mapping_type}",
            )));
        }
        mappings.push(Mapping::decode_setup(
            br,
            channels,
            floor_count,
            residue_count,
        )?);
    }
    Ok(mappings)
}

fn parse_modes(br: &mut LsbBitReader<'_>, mapping_count: usize) -> YueResult<Vec<Mode>> {
    let count = br.read_bits(6)? + 1;
    let mut modes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let block_flag = br.read_flag()?;
        let window_type = br.read_bits(16)?;
        let transform_type = br.read_bits(16)?;
        if window_type != 0 || transform_type != 0 {
            return Err(YueError::Unsupported(
                "Vorbis mode window/transform 必须为 0".into(),
            ));
        }

        let mapping = br.read_bits(8)?;
        if mapping as usize >= mapping_count {
            return Err(YueError::InvalidData("Vorbis mode mapping 索引越界".into()));
        }
        modes.push(Mode {
            block_flag,
            mapping: mapping as u8,
        });
    }
    Ok(modes)
}
