//! Vorbis mapping (type 0): 声道→子映射路由与幅角耦合反变换.
//!
//! mapping 描述每个声道使用哪个子映射 (floor/residue 组合), 以及
//! 编码端做过的幅度/角度声道去相关. 解码端在 residue 之后按声明
//! 的逆序恢复独立声道谱.

use yue_core::{YueError, YueResult};

use super::bitreader::{LsbBitReader, ilog};

/// 耦合步数上限 (8 位字段 + 1, 含冗余上界)
pub(crate) const MAPPING_MAX_COUPLINGS: usize = 256;
/// 子映射数上限 (4 位字段 + 1)
pub(crate) const MAPPING_MAX_SUBMAPS: usize = 16;

#[derive(Debug, Clone)]
pub(crate) struct Mapping {
    pub(crate) submaps: usize,
    pub(crate) coupling_steps: usize,
    /// 每声道的子映射编号
    pub(crate) mux: Vec<u8>,
    pub(crate) magnitude: Vec<u8>,
    pub(crate) angle: Vec<u8>,
    /// 每子映射的 floor 配置索引
    pub(crate) floor_index: Vec<u8>,
    /// 每子映射的 residue 配置索引
    pub(crate) residue_index: Vec<u8>,
}

impl Mapping {
    /// 从 setup 位流解析一个 mapping0 配置.
    pub(crate) fn decode_setup(
        br: &mut LsbBitReader<'_>,
        channels: usize,
        floor_count: usize,
        residue_count: usize,
    ) -> YueResult<Self> {
        let submaps = if br.read_flag()? {
            (br.read_bits(4)? + 1) as usize
        } else {
            1
        };
        debug_assert!(submaps <= MAPPING_MAX_SUBMAPS);

        let mut magnitude = Vec::new();
        let mut angle = Vec::new();
        let coupling_steps = if br.read_flag()? {
            let steps = (br.read_bits(8)? + 1) as usize;
            debug_assert!(steps <= MAPPING_MAX_COUPLINGS);
            let coupling_bits = ilog(channels as u32 - 1);
            for _ in 0..steps {
                let mag = br.read_bits(coupling_bits)?;
                let ang = br.read_bits(coupling_bits)?;
                if mag == ang || mag as usize >= channels || ang as usize >= channels {
                    return Err(YueError::InvalidData(format!(
                        "Vorbis coupling 声道对非法: magnitude={mag}, angle={ang}",
                    )));
                }
                magnitude.push(mag as u8);
                angle.push(ang as u8);
            }
            steps
        } else {
            0
        };

        let reserved = br.read_bits(2)?;
        if reserved != 0 {
            return Err(YueError::InvalidData(
                "Vorbis mapping reserved bits 必须为 0".into(),
            ));
        }

        let mut mux = vec![0u8; channels];
        if submaps > 1 {
            for slot in mux.iter_mut() {
                let m = br.read_bits(4)?;
                if m as usize >= submaps {
                    return Err(YueError::InvalidData("Vorbis mapping mux 值越界".into()));
                }
                *slot = m as u8;
            }
        }

        let mut floor_index = Vec::with_capacity(submaps);
        let mut residue_index = Vec::with_capacity(submaps);
        for _ in 0..submaps {
            let _time_submap = br.read_bits(8)?;
            let floor = br.read_bits(8)?;
            let residue = br.read_bits(8)?;
            if floor as usize >= floor_count || residue as usize >= residue_count {
                return Err(YueError::InvalidData(
                    "Vorbis mapping floor/residue 索引越界".into(),
                ));
            }
            floor_index.push(floor as u8);
            residue_index.push(residue as u8);
        }

        Ok(Self {
            submaps,
            coupling_steps,
            mux,
            magnitude,
            angle,
            floor_index,
            residue_index,
        })
    }

    /// 对解码后的频谱执行耦合反变换 (按声明逆序).
    ///
    /// 幅度/角度编码的恢复规则按 (m, a) 符号分四种情况, 无损还原
    /// 两条独立声道谱.
    pub(crate) fn inverse_coupling(&self, spectra: &mut [Vec<f32>], n2: usize) {
        for step in (0..self.coupling_steps).rev() {
            let m_ch = usize::from(self.magnitude[step]);
            let a_ch = usize::from(self.angle[step]);

            for i in 0..n2 {
                let m = spectra[m_ch][i];
                let a = spectra[a_ch][i];

                if m > 0.0 {
                    if a > 0.0 {
                        spectra[a_ch][i] = m - a;
                    } else {
                        spectra[a_ch][i] = m;
                        spectra[m_ch][i] = m + a;
                    }
                } else if a > 0.0 {
                    spectra[a_ch][i] = m + a;
                } else {
                    spectra[a_ch][i] = m;
                    spectra[m_ch][i] = m - a;
                }
            }
        }
    }
}
