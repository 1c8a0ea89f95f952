//! 容器格式注册表.
//!
//! 支持按 FormatId 查找解封装器, 以及按头部数据自动探测格式.

use std::collections::HashMap;

use yue_core::YueResult;

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::probe::{FormatProbe, ProbeResult};

/// 解封装器工厂函数类型
pub type DemuxerFactory = fn() -> YueResult<Box<dyn Demuxer>>;

/// 容器格式注册表
pub struct FormatRegistry {
    /// 解封装器工厂映射
    demuxers: HashMap<FormatId, DemuxerFactory>,
    /// 格式探测器列表
    probes: Vec<Box<dyn FormatProbe>>,
}

impl FormatRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            demuxers: HashMap::new(),
            probes: Vec::new(),
        }
    }

    /// 注册一个解封装器
    pub fn register_demuxer(&mut self, format_id: FormatId, factory: DemuxerFactory) {
        self.demuxers.insert(format_id, factory);
    }

    /// 注册一个格式探测器
    pub fn register_probe(&mut self, probe: Box<dyn FormatProbe>) {
        self.probes.push(probe);
    }

    /// 创建指定格式的解封装器实例
    pub fn create_demuxer(&self, format_id: FormatId) -> YueResult<Box<dyn Demuxer>> {
        let factory = self.demuxers.get(&format_id).ok_or_else(|| {
            yue_core::YueError::FormatNotFound(format!("未找到 {format_id} 的解封装器"))
        })?;
        factory()
    }

    /// 根据头部数据探测格式, 返回置信度最高的结果
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        let mut best: Option<ProbeResult> = None;
        for probe in &self.probes {
            if let Some(score) = probe.probe(data, filename) {
                let better = best.as_ref().is_none_or(|b| score > b.score);
                if better {
                    best = Some(ProbeResult {
                        format_id: probe.format_id(),
                        score,
                    });
                }
            }
        }
        best
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_注册所有格式() {
        let mut registry = FormatRegistry::new();
        crate::register_all(&mut registry);
        assert!(registry.create_demuxer(FormatId::Ogg).is_ok());
    }

    #[test]
    fn test_探测ogg魔数() {
        let mut registry = FormatRegistry::new();
        crate::register_all(&mut registry);
        let result = registry.probe(b"OggS\x00\x02", None).expect("应识别为 Ogg");
        assert_eq!(result.format_id, FormatId::Ogg);
    }

    #[test]
    fn test_未注册格式返回错误() {
        let registry = FormatRegistry::new();
        assert!(registry.create_demuxer(FormatId::Ogg).is_err());
    }
}
