//! Vorbis codebook: 规范哈夫曼码表构建与标量/向量解码.
//!
//! codebook 由码长表完全确定 (canonical huffman code): 条目按码长
//! 升序分组, 首个使用条目取码字 0, 其后每个条目取该码长下最小的
//! 可用码字. 码字以 32 位左对齐形式存储, 与解码时逐位累积的候选
//! 码字直接比较.

use yue_core::{YueError, YueResult};

use super::bitreader::{LsbBitReader, float32_unpack, ilog};

/// codebook 同步字 ("BCV" 的小端打包)
const CODEBOOK_SYNC: u32 = 0x56_43_42;

/// 码长上限为 32, 直方图下标 0..=32
const MAX_CODE_LEN: usize = 33;

#[derive(Debug, Clone)]
pub(crate) struct Codebook {
    pub(crate) dimensions: u32,
    pub(crate) entries: u32,
    /// 实际使用的条目数 (sparse 表可小于 entries)
    total_codewords: u32,
    /// 码长直方图: num_codewords[i] 为码长 i 的码字数
    num_codewords: [u32; MAX_CODE_LEN],
    /// 按码长升序分组存放的码字 (32 位左对齐)
    codewords: Vec<u32>,
    /// 与 codewords 平行的条目编号
    values: Vec<u32>,
    // 向量量化 (VQ) 参数
    pub(crate) lookup_type: u8,
    min_value: f32,
    delta_value: f32,
    sequence_p: bool,
    lookup_values: u32,
    multiplicands: Vec<u16>,
}

impl Codebook {
    /// 从 setup 位流解析一个 codebook.
    pub(crate) fn decode_setup(br: &mut LsbBitReader<'_>) -> YueResult<Self> {
        let sync = br.read_bits(24)?;
        if sync != CODEBOOK_SYNC {
            return Err(YueError::InvalidData(format!(
                "Vorbis codebook 同步字错误: 0x{sync:06X}",
            )));
        }

        let dimensions = br.read_bits(16)?;
        let entries = br.read_bits(24)?;
        if dimensions == 0 || entries == 0 {
            return Err(YueError::InvalidData(
                "Vorbis codebook dimensions/entries 不能为 0".into(),
            ));
        }

        let mut lengths = vec![0u8; entries as usize];
        let mut num_codewords = [0u32; MAX_CODE_LEN];
        let mut used_entries = 0u32;

        let ordered = br.read_flag()?;
        if !ordered {
            let sparse = br.read_flag()?;
            for len_slot in lengths.iter_mut() {
                // sparse 表允许跳过未使用的条目 (码长 0)
                if sparse && !br.read_flag()? {
                    *len_slot = 0;
                    continue;
                }
                let len = (br.read_bits(5)? + 1) as u8;
                *len_slot = len;
                num_codewords[len as usize] += 1;
                used_entries += 1;
            }
        } else {
            // ordered 表: 码长非降, 按游程编码每个码长的条目数
            let mut len = (br.read_bits(5)? + 1) as usize;
            let mut entry = 0u32;
            while entry < entries {
                let run_bits = ilog(entries - entry);
                let run_len = br.read_bits(run_bits)?;
                if run_len == 0 || entry + run_len > entries {
                    return Err(YueError::InvalidData(
                        "Vorbis codebook ordered 游程无效".into(),
                    ));
                }
                if len >= MAX_CODE_LEN {
                    return Err(YueError::InvalidData(
                        "Vorbis codebook ordered 码长超出 32".into(),
                    ));
                }
                for slot in lengths[entry as usize..(entry + run_len) as usize].iter_mut() {
                    *slot = len as u8;
                }
                num_codewords[len] = run_len;
                entry += run_len;
                len += 1;
            }
            used_entries = entries;
        }

        let mut book = Self {
            dimensions,
            entries,
            total_codewords: used_entries,
            num_codewords,
            codewords: Vec::new(),
            values: Vec::new(),
            lookup_type: 0,
            min_value: 0.0,
            delta_value: 0.0,
            sequence_p: false,
            lookup_values: 0,
            multiplicands: Vec::new(),
        };
        book.calc_codewords(&lengths)?;

        let lookup_type = br.read_bits(4)? as u8;
        book.lookup_type = lookup_type;
        if lookup_type == 0 {
            // 无 VQ 的 codebook 不读取也不分配 multiplicands
            return Ok(book);
        }
        if lookup_type > 2 {
            return Err(YueError::InvalidData(format!(
                "Vorbis codebook lookup_type 非法: {}",
                lookup_type,
            )));
        }

        book.min_value = float32_unpack(br.read_bits(32)?);
        book.delta_value = float32_unpack(br.read_bits(32)?);
        let value_bits = (br.read_bits(4)? + 1) as u8;
        book.sequence_p = br.read_flag()?;

        book.lookup_values = if lookup_type == 1 {
            lookup1_values(entries, dimensions)
        } else {
            entries
                .checked_mul(dimensions)
                .ok_or_else(|| YueError::InvalidData("Vorbis codebook lookup_values 溢出".into()))?
        };

        let mut multiplicands = Vec::with_capacity(book.lookup_values as usize);
        for _ in 0..book.lookup_values {
            multiplicands.push(br.read_bits(value_bits)? as u16);
        }
        book.multiplicands = multiplicands;
        Ok(book)
    }

    /// 按规范哈夫曼构造计算全部码字.
    ///
    /// 条目按码长分组, 组内按条目序; 每个新条目取当前码长下最小的
    /// 可用码字, 并为更深的码长派生后续可用码字. 没有足够码字可分配
    /// 说明码长表过度指定 (损坏的码流).
    fn calc_codewords(&mut self, lengths: &[u8]) -> YueResult<()> {
        let total = self.total_codewords as usize;
        self.codewords = vec![0u32; total];
        self.values = vec![0u32; total];
        if total == 0 {
            return Ok(());
        }

        // 各码长分组在数组中的起始偏移
        let mut len_offsets = [0usize; MAX_CODE_LEN];
        let mut offset = 0usize;
        for (i, slot) in len_offsets.iter_mut().enumerate() {
            *slot = offset;
            offset += self.num_codewords[i] as usize;
        }

        // 首个使用条目分配码字 0
        let mut iter = lengths.iter().enumerate().filter(|&(_, &len)| len > 0);
        let Some((first_entry, &first_len)) = iter.next() else {
            return Ok(());
        };
        let slot = len_offsets[first_len as usize];
        self.codewords[slot] = 0;
        self.values[slot] = first_entry as u32;
        len_offsets[first_len as usize] += 1;

        // 各码长下一个可分配的码字 (32 位左对齐)
        let mut next_codewords = [0u32; MAX_CODE_LEN];
        for depth in 1..=first_len as usize {
            next_codewords[depth] = 1u32 << (32 - depth);
        }

        for (entry, &len) in iter {
            let len = len as usize;

            // 取最近的仍有可用码字的码长 (最左/最小码字优先)
            let mut root = len;
            while root > 0 && next_codewords[root] == 0 {
                root -= 1;
            }
            if root == 0 {
                return Err(YueError::InvalidData(
                    "Vorbis codebook 码长表过度指定".into(),
                ));
            }

            let codeword = next_codewords[root];
            next_codewords[root] = 0;

            let slot = len_offsets[len];
            self.codewords[slot] = codeword;
            self.values[slot] = entry as u32;
            len_offsets[len] += 1;

            for depth in ((root + 1)..=len).rev() {
                next_codewords[depth] = codeword + (1u32 << (32 - depth));
            }
        }
        Ok(())
    }

    /// 逐位读取并解码一个标量符号, 返回条目编号.
    ///
    /// 解码按深度线性扫描该深度的全部码字, 正确性优先于吞吐.
    /// 码字不存在说明 codebook 损坏或此前的读取已经错位.
    pub(crate) fn decode_scalar(&self, br: &mut LsbBitReader<'_>) -> YueResult<u32> {
        let mut codeword = 0u32;
        let mut offset = 0usize;

        for depth in 1..=32usize {
            codeword |= br.read_bits(1)? << (32 - depth);

            let count = self.num_codewords[depth] as usize;
            for i in offset..offset + count {
                if self.codewords[i] == codeword {
                    return Ok(self.values[i]);
                }
            }
            offset += count;
        }
        Err(YueError::InvalidData(
            "Vorbis codebook 哈夫曼码字不存在".into(),
        ))
    }

    /// 解码一个 VQ 向量, 将 `dimensions` 个幅值按步长 `step`
    /// 累加进输出切片.
    pub(crate) fn decode_vectors(
        &self,
        br: &mut LsbBitReader<'_>,
        v: &mut [f32],
        step: usize,
    ) -> YueResult<()> {
        let lookup_offset = self.decode_scalar(br)? as usize;
        let dims = self.dimensions as usize;
        let mut last = 0.0f32;

        match self.lookup_type {
            1 => {
                // 索引按 lookup_values 进制逐维分解
                let lookup_values = self.lookup_values as usize;
                if lookup_values == 0 {
                    return Err(YueError::InvalidData(
                        "Vorbis codebook lookup_values 非法".into(),
                    ));
                }
                let mut index_divisor = 1usize;
                for i in 0..dims {
                    let offset = (lookup_offset / index_divisor) % lookup_values;
                    let value =
                        f32::from(self.multiplicands[offset]) * self.delta_value + self.min_value
                            + last;

                    let slot = v.get_mut(i * step).ok_or_else(|| {
                        YueError::InvalidData("Vorbis codebook 向量写越界".into())
                    })?;
                    *slot += value;
                    if self.sequence_p {
                        last = value;
                    }
                    index_divisor = index_divisor.saturating_mul(lookup_values);
                }
            }
            2 => {
                let base = lookup_offset * dims;
                for i in 0..dims {
                    let mul = self.multiplicands.get(base + i).copied().ok_or_else(|| {
                        YueError::InvalidData("Vorbis codebook multiplicand 越界".into())
                    })?;
                    let value = f32::from(mul) * self.delta_value + self.min_value + last;

                    let slot = v.get_mut(i * step).ok_or_else(|| {
                        YueError::InvalidData("Vorbis codebook 向量写越界".into())
                    })?;
                    *slot += value;
                    if self.sequence_p {
                        last = value;
                    }
                }
            }
            _ => {
                return Err(YueError::InvalidData(
                    "Vorbis codebook 缺少 VQ lookup 表".into(),
                ));
            }
        }
        Ok(())
    }
}

/// lookup type 1 的 multiplicands 数量:
/// 满足 v^dimensions <= entries 的最大整数 v.
pub(crate) fn lookup1_values(entries: u32, dimensions: u32) -> u32 {
    if entries == 0 || dimensions == 0 {
        return 0;
    }

    let mut lo = 1u32;
    let mut hi = entries.max(1);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if pow_le_entries(mid, dimensions, entries) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

fn pow_le_entries(base: u32, exp: u32, entries: u32) -> bool {
    let mut out = 1u128;
    let limit = u128::from(entries);
    for _ in 0..exp {
        out *= u128::from(base);
        if out > limit {
            return false;
        }
    }
    true
}
