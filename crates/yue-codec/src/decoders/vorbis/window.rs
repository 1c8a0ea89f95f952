//! Vorbis 窗函数与加窗叠加输出.
//!
//! 每个块尺寸预计算一对升/降正弦半窗. 输出时把前一块 IMDCT 结果的
//! 后半与当前块的前半做加窗叠加: 重叠区长度取两块四分之一尺寸的较
//! 小者, 块尺寸不同时多出的区段直接透传, 最终逐样本钳位到 [-1, 1]
//! 并缩放为有符号 16 位整数交错输出.

use std::f64::consts::PI;

/// 一个块尺寸对应的升/降半窗 (各 block_size/2 项)
#[derive(Debug, Clone)]
pub(crate) struct BlockWindow {
    /// 上升半窗, 作用于当前块的前半
    pub(crate) cur: Vec<f32>,
    /// 下降半窗, 作用于前一块的后半
    pub(crate) prev: Vec<f32>,
}

/// 计算块尺寸对应的 Vorbis 窗 (raised-sine).
pub(crate) fn compute_window(block_size: usize) -> BlockWindow {
    let half = block_size / 2;
    let mut cur = vec![0.0f32; half];
    let mut prev = vec![0.0f32; half];

    for i in 0..half {
        let phase = (i as f64 + 0.5) / half as f64 * (PI / 2.0);
        let inner = phase.sin();
        cur[i] = ((PI / 2.0) * inner * inner).sin() as f32;

        let inner = (phase + PI / 2.0).sin();
        prev[i] = ((PI / 2.0) * inner * inner).sin() as f32;
    }

    BlockWindow { cur, prev }
}

/// Vorbis 声道序 → 常规交错输出序 (多声道时重排)
pub(crate) fn output_channel_order(channels: usize) -> Vec<usize> {
    match channels {
        // Vorbis 3ch: L, C, R → 输出顺序: L, R, C
        3 => vec![0, 2, 1],
        // Vorbis 5ch: L, C, R, LS, RS → 输出顺序: L, R, C, LS, RS
        5 => vec![0, 2, 1, 3, 4],
        // Vorbis 6ch: L, C, R, LS, RS, LFE → 输出顺序: L, R, C, LFE, LS, RS
        6 => vec![0, 2, 1, 5, 3, 4],
        _ => (0..channels).collect(),
    }
}

/// 加窗叠加并输出交错 i16 样本.
///
/// 输出范围: 前一块中心到当前块中心, 即每声道
/// `prev_block_size/4 + cur_block_size/4` 个样本. 对齐方式为前一块
/// 的 3/4 处对当前块的 1/4 处; 长短块相邻时不重叠的区段直接输出.
pub(crate) fn output_frame(
    prev: &[Vec<f32>],
    cur: &[Vec<f32>],
    prev_block_size: usize,
    cur_block_size: usize,
    block_sizes: [usize; 2],
    windows: &[BlockWindow; 2],
    order: &[usize],
) -> Vec<i16> {
    let channels = prev.len();
    let cur_qtr = cur_block_size / 4;
    let prev_qtr = prev_block_size / 4;
    let overlap_qtr = cur_qtr.min(prev_qtr);

    let cur_offset = cur_qtr - overlap_qtr;
    let prev_offset = prev_qtr - overlap_qtr;
    let overlap_size = overlap_qtr * 2;

    // 前一块数据从中心 (prev_qtr*2) 开始取
    let prev_base = prev_qtr * 2;
    let mut out = Vec::with_capacity((prev_qtr + cur_qtr) * channels);

    // 长前块 + 短当前块: 重叠区之前有直接输出的数据
    for i in 0..prev_offset {
        for &src in order.iter().take(channels) {
            out.push(to_i16(prev[src][prev_base + i]));
        }
    }

    // 重叠区: 所在块尺寸对应的窗
    let window = &windows[usize::from(overlap_qtr * 4 == block_sizes[1])];
    for i in 0..overlap_size {
        for &src in order.iter().take(channels) {
            let sample = prev[src][prev_base + prev_offset + i] * window.prev[i]
                + cur[src][cur_offset + i] * window.cur[i];
            out.push(to_i16(sample));
        }
    }

    // 长当前块 + 短前块: 重叠区之后有直接输出的数据
    for i in 0..cur_offset {
        for &src in order.iter().take(channels) {
            out.push(to_i16(cur[src][cur_offset + overlap_size + i]));
        }
    }

    out
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_窗函数_princen_bradley_条件() {
        // 升降半窗需满足 cur[i]^2 + prev[i]^2 = 1, 保证叠加后能量守恒
        for block_size in [64usize, 256, 2048] {
            let w = compute_window(block_size);
            for i in 0..block_size / 2 {
                let sum = w.cur[i] * w.cur[i] + w.prev[i] * w.prev[i];
                assert!(
                    (sum - 1.0).abs() < 1e-5,
                    "block={block_size}, i={i}: sum={sum}",
                );
            }
        }
    }

    #[test]
    fn test_窗函数_单调性() {
        let w = compute_window(256);
        for i in 1..128 {
            assert!(w.cur[i] >= w.cur[i - 1], "上升半窗应单调非减");
            assert!(w.prev[i] <= w.prev[i - 1], "下降半窗应单调非增");
        }
    }

    #[test]
    fn test_同尺寸块的样本数() {
        let n = 256;
        let windows = [compute_window(64), compute_window(n)];
        let prev = vec![vec![0.25f32; n]; 2];
        let cur = vec![vec![0.25f32; n]; 2];
        let order = output_channel_order(2);

        let out = output_frame(&prev, &cur, n, n, [64, n], &windows, &order);
        assert_eq!(out.len(), (n / 4 + n / 4) * 2);
    }

    #[test]
    fn test_长短块组合的样本数() {
        let sizes = [64usize, 256];
        let windows = [compute_window(sizes[0]), compute_window(sizes[1])];
        let order = output_channel_order(1);

        // 长前块 + 短当前块
        let prev = vec![vec![0.0f32; sizes[1]]];
        let cur = vec![vec![0.0f32; sizes[0]]];
        let out = output_frame(&prev, &cur, sizes[1], sizes[0], sizes, &windows, &order);
        assert_eq!(out.len(), sizes[1] / 4 + sizes[0] / 4);

        // 短前块 + 长当前块
        let prev = vec![vec![0.0f32; sizes[0]]];
        let cur = vec![vec![0.0f32; sizes[1]]];
        let out = output_frame(&prev, &cur, sizes[0], sizes[1], sizes, &windows, &order);
        assert_eq!(out.len(), sizes[0] / 4 + sizes[1] / 4);
    }

    #[test]
    fn test_恒定信号的重叠区重建() {
        // 前后块均为常数 1.0 时, 重叠区 w_prev + w_cur 不为 1,
        // 但由 IMDCT 对称性实际输入是已加窗数据; 此处直接验证
        // 样本值 = prev*w_prev + cur*w_cur 的合成公式
        let n = 64;
        let windows = [compute_window(n), compute_window(2048)];
        let prev = vec![vec![1.0f32; n]];
        let cur = vec![vec![1.0f32; n]];
        let order = output_channel_order(1);

        let out = output_frame(&prev, &cur, n, n, [n, 2048], &windows, &order);
        let w = &windows[0];
        for (i, &s) in out.iter().enumerate() {
            let expect = (w.prev[i] + w.cur[i]).clamp(-1.0, 1.0) * 32767.0;
            assert_eq!(s, expect as i16, "i={i}");
        }
    }

    #[test]
    fn test_钳位与量化() {
        assert_eq!(to_i16(2.0), 32767);
        assert_eq!(to_i16(-2.0), -32767);
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(0.5), 16383);
    }

    #[test]
    fn test_多声道输出重排() {
        assert_eq!(output_channel_order(2), vec![0, 1]);
        assert_eq!(output_channel_order(3), vec![0, 2, 1]);
        assert_eq!(output_channel_order(6), vec![0, 2, 1, 5, 3, 4]);
    }
}
