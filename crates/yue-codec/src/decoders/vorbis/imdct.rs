//! Vorbis IMDCT: 逆修正离散余弦变换.
//!
//! 采用多速率滤波器组论文 ("The use of multirate filter banks for
//! coding of high quality digital audio") 的优化算法, 并应用
//! stb_vorbis 笔记 (nothings.org/stb_vorbis/mdct_01.txt) 中指出的
//! 修正. 频谱折叠 → log2(n)-3 级蝶形递推 (半长工作缓冲) → 位反转
//! 合并, 由对称性一次展开出全部 n 个时域样本.
//!
//! 变换定义 (未缩放):
//!   out[j] = Σ_{k<n/2} in[k] · cos((2π/n)(j + 1/2 + n/4)(k + 1/2))
//! 窗口叠加的偏移约定依赖此展开的具体索引顺序, 不可替换为任意
//! FFT 式 IMDCT 而不重推外围叠加数学.

use std::f64::consts::PI;

/// 每个块尺寸一份的 IMDCT 状态 (旋转因子与位反转表).
///
/// 与解码器实例同生命周期, 在头包解析完成时计算一次.
#[derive(Debug, Clone)]
pub(crate) struct ImdctState {
    n: usize,
    log2_n: u32,
    /// 旋转因子表 A (n/2 项)
    a: Vec<f32>,
    /// 旋转因子表 B (n/2 项)
    b: Vec<f32>,
    /// 旋转因子表 C (n/4 项)
    c: Vec<f32>,
    /// 位反转排列表 (n/8 项)
    reversed: Vec<u32>,
}

impl ImdctState {
    /// 为块尺寸 n (2 的幂) 预计算全部旋转因子表.
    pub(crate) fn new(n: usize) -> Self {
        let n4 = n >> 2;
        let n8 = n >> 3;
        let log2_n = n.trailing_zeros();
        let nf = n as f64;

        let mut a = vec![0.0f32; n >> 1];
        let mut b = vec![0.0f32; n >> 1];
        let mut c = vec![0.0f32; n4];

        for k in 0..n4 {
            let k2 = k * 2;
            a[k2] = ((4 * k) as f64 * PI / nf).cos() as f32;
            a[k2 + 1] = -(((4 * k) as f64 * PI / nf).sin()) as f32;
            b[k2] = ((k2 + 1) as f64 * PI / (2.0 * nf)).cos() as f32;
            b[k2 + 1] = ((k2 + 1) as f64 * PI / (2.0 * nf)).sin() as f32;
        }
        for k in 0..n8 {
            let k2 = k * 2;
            c[k2] = ((k2 + 1) as f64 * 2.0 * PI / nf).cos() as f32;
            c[k2 + 1] = -(((k2 + 1) as f64 * 2.0 * PI / nf).sin()) as f32;
        }

        let mut reversed = vec![0u32; n8];
        for (k, slot) in reversed.iter_mut().enumerate() {
            *slot = (k as u32).reverse_bits() >> (32 - log2_n + 3);
        }

        Self {
            n,
            log2_n,
            a,
            b,
            c,
            reversed,
        }
    }

    /// 块尺寸
    pub(crate) fn block_size(&self) -> usize {
        self.n
    }

    /// 对 n/2 个频域系数执行 IMDCT, 产生 n 个时域样本.
    pub(crate) fn calc(&self, input: &[f32], output: &mut [f32]) {
        let n = self.n;
        let n2 = n >> 1;
        let n4 = n >> 2;
        let n8 = n >> 3;
        let n3_4 = n - n4;
        let a = &self.a;
        let b = &self.b;
        let c = &self.c;

        let mut u = vec![0.0f32; n2];
        let mut w = vec![0.0f32; n2];

        // 频谱折叠 (step 1, step 2)
        for k in 0..n8 {
            let k2 = k * 2;
            let k4 = k * 4;

            let e_1 = -input[k4 + 3];
            let e_2 = -input[k4 + 1];
            let g_1 = e_1 * a[n2 - 1 - k2] + e_2 * a[n2 - 2 - k2];
            let g_2 = e_1 * a[n2 - 2 - k2] - e_2 * a[n2 - 1 - k2];

            let f_1 = input[n2 - 4 - k4];
            let f_2 = input[n2 - 2 - k4];
            let h_2 = f_1 * a[n4 - 2 - k2] - f_2 * a[n4 - 1 - k2];
            let h_1 = f_1 * a[n4 - 1 - k2] + f_2 * a[n4 - 2 - k2];

            w[n4 + 1 + k2] = h_2 + g_2;
            w[n4 + k2] = h_1 + g_1;

            w[k2 + 1] = (h_2 - g_2) * a[n2 - 4 - k4] - (h_1 - g_1) * a[n2 - 3 - k4];
            w[k2] = (h_1 - g_1) * a[n2 - 4 - k4] + (h_2 - g_2) * a[n2 - 3 - k4];
        }

        // 蝶形递推 (step 3), 共 log2(n) - 3 级
        let log2_n = self.log2_n as usize;
        for l in 0..=(log2_n - 4) {
            let k0 = n >> (l + 3);
            let k1 = 1usize << (l + 3);
            let r_max = n >> (l + 4);
            let s2_max = 1usize << (l + 2);

            for r in 0..r_max {
                let r2 = r * 2;
                for s2 in (0..s2_max).step_by(2) {
                    let e_1 = w[n2 - 1 - k0 * s2 - r2];
                    let e_2 = w[n2 - 2 - k0 * s2 - r2];
                    let f_1 = w[n2 - 1 - k0 * (s2 + 1) - r2];
                    let f_2 = w[n2 - 2 - k0 * (s2 + 1) - r2];

                    u[n2 - 1 - k0 * s2 - r2] = e_1 + f_1;
                    u[n2 - 2 - k0 * s2 - r2] = e_2 + f_2;
                    u[n2 - 1 - k0 * (s2 + 1) - r2] =
                        (e_1 - f_1) * a[r * k1] - (e_2 - f_2) * a[r * k1 + 1];
                    u[n2 - 2 - k0 * (s2 + 1) - r2] =
                        (e_2 - f_2) * a[r * k1] + (e_1 - f_1) * a[r * k1 + 1];
                }
            }

            if l + 1 <= log2_n - 4 {
                w.copy_from_slice(&u);
            }
        }

        // 位反转合并与对称展开 (step 4..8, 输出)
        for k in 0..n8 {
            let k2 = k * 2;
            let j = self.reversed[k] as usize;
            let j4 = j * 4;

            let e_1 = u[n2 - 1 - j4];
            let e_2 = u[n2 - 2 - j4];
            let f_1 = u[j4 + 1];
            let f_2 = u[j4];

            let g_1 = e_1 + f_1 + c[k2 + 1] * (e_1 - f_1) + c[k2] * (e_2 + f_2);
            let h_1 = e_1 + f_1 - c[k2 + 1] * (e_1 - f_1) - c[k2] * (e_2 + f_2);
            let g_2 = e_2 - f_2 + c[k2 + 1] * (e_2 + f_2) - c[k2] * (e_1 - f_1);
            let h_2 = -e_2 + f_2 + c[k2 + 1] * (e_2 + f_2) - c[k2] * (e_1 - f_1);

            let x_1 = -0.5 * (g_1 * b[k2] + g_2 * b[k2 + 1]);
            let x_2 = -0.5 * (g_1 * b[k2 + 1] - g_2 * b[k2]);
            output[n4 - 1 - k] = -x_2;
            output[n4 + k] = x_2;
            output[n3_4 - 1 - k] = x_1;
            output[n3_4 + k] = x_1;

            let y_1 = -0.5 * (h_1 * b[n2 - 2 - k2] + h_2 * b[n2 - 1 - k2]);
            let y_2 = -0.5 * (h_1 * b[n2 - 1 - k2] - h_2 * b[n2 - 2 - k2]);
            output[k] = -y_2;
            output[n2 - 1 - k] = y_2;
            output[n2 + k] = y_1;
            output[n - 1 - k] = y_1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 按定义直接计算的 IMDCT, 作为快速算法的对照
    fn imdct_direct(input: &[f32], n: usize) -> Vec<f32> {
        let n2 = n / 2;
        let nf = n as f64;
        let mut out = vec![0.0f32; n];
        for (j, slot) in out.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for (k, &x) in input.iter().enumerate().take(n2) {
                let angle =
                    2.0 * PI / nf * (j as f64 + 0.5 + nf / 4.0) * (k as f64 + 0.5);
                acc += f64::from(x) * angle.cos();
            }
            *slot = acc as f32;
        }
        out
    }

    fn assert_matches_direct(n: usize) {
        let state = ImdctState::new(n);
        let n2 = n / 2;

        // 确定性的伪随机频谱
        let input: Vec<f32> = (0..n2)
            .map(|k| ((k as f32 * 0.7).sin() + (k as f32 * 0.13).cos()) * 0.5)
            .collect();

        let mut fast = vec![0.0f32; n];
        state.calc(&input, &mut fast);
        let direct = imdct_direct(&input, n);

        let peak = direct.iter().fold(0.0f32, |m, &v| m.max(v.abs())).max(1e-6);
        for (j, (&f, &d)) in fast.iter().zip(direct.iter()).enumerate() {
            assert!(
                (f - d).abs() <= peak * 1e-4 + 1e-4,
                "n={n}, j={j}: fast={f}, direct={d}",
            );
        }
    }

    #[test]
    fn test_imdct_与直接定义一致_n64() {
        assert_matches_direct(64);
    }

    #[test]
    fn test_imdct_与直接定义一致_n128() {
        assert_matches_direct(128);
    }

    #[test]
    fn test_imdct_与直接定义一致_n256() {
        assert_matches_direct(256);
    }

    #[test]
    fn test_imdct_零输入产生零输出() {
        let state = ImdctState::new(64);
        let input = vec![0.0f32; 32];
        let mut out = vec![1.0f32; 64];
        state.calc(&input, &mut out);
        for &v in &out {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_位反转表() {
        let state = ImdctState::new(64);
        // n=64: log2=6, n/8=8 项, reverse_bits(k) >> (32-6+3)
        for (k, &r) in state.reversed.iter().enumerate() {
            assert_eq!(r, (k as u32).reverse_bits() >> 29);
            assert!(r < 8, "位反转值超出 n/8 范围");
        }
    }
}
