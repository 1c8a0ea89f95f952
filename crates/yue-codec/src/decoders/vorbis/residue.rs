//! Vorbis residue (type 0/1/2): 分区化的频谱细节系数解码.
//!
//! residue 把 [begin, end) 区间按 partition_size 切分, 先用
//! classbook 为每个分区解码分类号 (按 classifications 进制打包,
//! 高位在前), 再按 8 个 pass 逐层把各分类对应码表的 VQ 向量累加
//! 进频谱. type 2 将子映射内全部声道交织为一条虚拟声道解码后再
//! 解交织.

use yue_core::{YueError, YueResult};

use super::bitreader::LsbBitReader;
use super::codebook::Codebook;

/// 分类数上限 (6 位字段 + 1, 含冗余上界)
pub(crate) const RESIDUE_MAX_CLASSIFICATIONS: usize = 65;
/// 解码 pass 数固定为 8 (cascade 位图宽度)
const RESIDUE_PASSES: usize = 8;

#[derive(Debug, Clone)]
pub(crate) struct Residue {
    pub(crate) residue_type: u8,
    begin: u32,
    end: u32,
    partition_size: u32,
    classifications: u32,
    classbook: u8,
    /// 每分类在各 pass 上是否有码表 (-1 表示跳过)
    books: Vec<[i16; RESIDUE_PASSES]>,
}

impl Residue {
    /// 从 setup 位流解析一个 residue 配置.
    pub(crate) fn decode_setup(
        br: &mut LsbBitReader<'_>,
        residue_type: u8,
        codebooks: &[Codebook],
    ) -> YueResult<Self> {
        let begin = br.read_bits(24)?;
        let end = br.read_bits(24)?;
        let partition_size = br.read_bits(24)? + 1;
        let classifications = br.read_bits(6)? + 1;
        let classbook = br.read_bits(8)? as u8;

        if classifications as usize > RESIDUE_MAX_CLASSIFICATIONS {
            return Err(YueError::InvalidData(format!(
                "Vorbis residue classifications 越界: {classifications}",
            )));
        }
        if usize::from(classbook) >= codebooks.len() {
            return Err(YueError::InvalidData(
                "Vorbis residue classbook 索引越界".into(),
            ));
        }

        let mut cascades = vec![0u32; classifications as usize];
        for cascade in &mut cascades {
            let low_bits = br.read_bits(3)?;
            let high_bits = if br.read_flag()? { br.read_bits(5)? } else { 0 };
            *cascade = (high_bits << 3) | low_bits;
        }

        let mut books = vec![[-1i16; RESIDUE_PASSES]; classifications as usize];
        for (cascade, book_row) in cascades.iter().zip(books.iter_mut()) {
            for (pass, slot) in book_row.iter_mut().enumerate() {
                if cascade & (1 << pass) != 0 {
                    let book = br.read_bits(8)? as i16;
                    if book as usize >= codebooks.len() {
                        return Err(YueError::InvalidData(
                            "Vorbis residue 码表索引越界".into(),
                        ));
                    }
                    // VQ 解码要求码表携带 lookup 表
                    if codebooks[book as usize].lookup_type == 0 {
                        return Err(YueError::InvalidData(
                            "Vorbis residue 码表缺少 VQ lookup".into(),
                        ));
                    }
                    *slot = book;
                }
            }
        }

        Ok(Self {
            residue_type,
            begin,
            end,
            partition_size,
            classifications,
            classbook,
            books,
        })
    }

    /// 解码一帧中一个子映射的 residue 数据.
    ///
    /// - `channels`: 子映射内各声道在 `spectra` 中的下标
    /// - `do_not_decode`: 与 `channels` 对齐的跳过标记 (floor 无能量
    ///   且不被耦合需要的声道)
    /// - `spectra`: 各声道频谱缓冲, 仅写入前 `n2` 个系数
    pub(crate) fn decode_frame(
        &self,
        br: &mut LsbBitReader<'_>,
        codebooks: &[Codebook],
        channels: &[usize],
        do_not_decode: &[bool],
        spectra: &mut [Vec<f32>],
        n2: usize,
    ) -> YueResult<()> {
        if self.residue_type == 2 {
            // type 2 要求子映射内至少一个声道需要解码, 否则整体跳过
            if do_not_decode.iter().all(|&skip| skip) {
                return Ok(());
            }

            let ch = channels.len();
            let mut interleaved = vec![vec![0.0f32; n2 * ch]];
            self.decode_core(
                br,
                codebooks,
                &[0],
                &[false],
                &mut interleaved,
                n2 * ch,
            )?;

            // 解交织回各实际声道
            let combined = &interleaved[0];
            for i in 0..n2 {
                for (j, &target) in channels.iter().enumerate() {
                    spectra[target][i] = combined[i * ch + j];
                }
            }
            Ok(())
        } else {
            self.decode_core(br, codebooks, channels, do_not_decode, spectra, n2)
        }
    }

    /// 8-pass 分类解码主循环.
    ///
    /// `size` 为本次解码的虚拟频谱长度 (type 2 下为 n2 * 声道数).
    /// 规范要求 [begin, end) 先钳位到 size, 头部字段越界不得导致
    /// 越界写入.
    fn decode_core(
        &self,
        br: &mut LsbBitReader<'_>,
        codebooks: &[Codebook],
        channels: &[usize],
        do_not_decode: &[bool],
        spectra: &mut [Vec<f32>],
        size: usize,
    ) -> YueResult<()> {
        let begin = (self.begin as usize).min(size);
        let end = (self.end as usize).min(size);
        let psize = self.partition_size as usize;
        let n_to_read = end.saturating_sub(begin);
        if n_to_read == 0 || psize == 0 {
            return Ok(());
        }
        let partitions_to_read = n_to_read / psize;
        if partitions_to_read == 0 {
            return Ok(());
        }

        let classbook = &codebooks[usize::from(self.classbook)];
        let classwords = classbook.dimensions.max(1) as usize;
        let class_count = self.classifications as usize;

        // 每声道的分区分类号; classword 组可能越过末尾, 预留余量
        let mut classifications =
            vec![vec![0u8; partitions_to_read + classwords]; channels.len()];

        for pass in 0..RESIDUE_PASSES {
            let mut partition_count = 0usize;
            while partition_count < partitions_to_read {
                // pass 0 时按 classword 组解码分类号
                if pass == 0 {
                    for (j, class_vec) in classifications.iter_mut().enumerate() {
                        if do_not_decode[j] {
                            continue;
                        }
                        let mut temp = classbook.decode_scalar(br)? as usize;
                        for i in (0..classwords).rev() {
                            class_vec[i + partition_count] = (temp % class_count) as u8;
                            temp /= class_count;
                        }
                    }
                }

                let mut i = 0usize;
                while i < classwords && partition_count < partitions_to_read {
                    for (j, &target) in channels.iter().enumerate() {
                        if do_not_decode[j] {
                            continue;
                        }

                        let class = usize::from(classifications[j][partition_count]);
                        let book = self.books[class][pass];
                        if book < 0 {
                            continue;
                        }
                        let book = &codebooks[book as usize];
                        let dims = book.dimensions.max(1) as usize;

                        let offset = begin + partition_count * psize;
                        // 切片到声道缓冲末尾: 正常码流只会写满本分区,
                        // 码表维度异常时由 decode_vectors 的边界检查拦截
                        let part = &mut spectra[target][offset..];

                        if self.residue_type == 0 {
                            // 每个码字覆盖整个分区, 以 step 为步长散布
                            let step = psize / dims;
                            for k in 0..step {
                                book.decode_vectors(br, &mut part[k..], step)?;
                            }
                        } else {
                            // type 1/2: 码字按 dims 个系数连续排列
                            let mut k = 0usize;
                            while k < psize {
                                book.decode_vectors(br, &mut part[k..], 1)?;
                                k += dims;
                            }
                        }
                    }
                    partition_count += 1;
                    i += 1;
                }
            }
        }
        Ok(())
    }
}
