/*
 * @Author       : 老董
 * @Date         : 2026-02-08
 * @Description  : LayerBuilder 权重的二进制保存/加载
 *
 * 文件布局（bincode 1，小端定长整数）：
 *   Vec<LayerHeader>  每个隐藏/输出层一项（尺寸字段为 u64，不随平台截断）
 *   Vec<f32>          全部边权重，按 层 → 节点 → 边 的顺序
 * 输入层与上下文层不落盘（前者无边，后者是运行期状态）。
 *
 * 显式路径版本是原语；按名字的旧式版本只负责拼出 states/<name>.nnstate 再委托。
 */

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::LayerBuilder;
use crate::nn::error::{LoadError, SaveError, describe_shape};
use crate::nn::info::NNInfo;
use crate::nn::layer::{Layer, LayerType};

/// 旧式按名字保存时使用的目录
pub const LEGACY_STATE_DIR: &str = "states";
/// 旧式权重文件扩展名
const LEGACY_STATE_EXT: &str = "nnstate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LayerHeader {
    node_count: u64,
    kind: LayerType,
    gate_count: u64,
    edges_per_node: u64,
}

impl LayerHeader {
    fn of(layer: &Layer) -> Self {
        Self {
            node_count: layer.len() as u64,
            kind: layer.kind(),
            gate_count: layer.gate_count() as u64,
            edges_per_node: layer.edges_per_node() as u64,
        }
    }

    /// 文件声明的权重数；溢出视为损坏
    fn weight_count(&self) -> Option<u64> {
        self.node_count.checked_mul(self.edges_per_node)
    }

    fn describe(&self) -> String {
        format!(
            "{:?}[{} 节点, {} 门, 每节点 {} 条边]",
            self.kind, self.node_count, self.gate_count, self.edges_per_node
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    layers: Vec<LayerHeader>,
    weights: Vec<f32>,
}

/// 拓扑描述推导出的单层形状（不含每节点边数，边数取决于数据集特征数）
struct SkeletonLayer {
    kind: LayerType,
    node_count: usize,
    gate_count: usize,
}

impl LayerBuilder {
    /// `states/<name>.nnstate`
    pub fn legacy_state_path(name: &str) -> PathBuf {
        Path::new(LEGACY_STATE_DIR).join(format!("{name}.{LEGACY_STATE_EXT}"))
    }

    /// 将全部隐藏/输出层权重写入 `path`
    pub fn save_state_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        let path = path.as_ref();
        if !self.is_built() {
            return Err(SaveError::NotBuilt);
        }

        let file = StateFile {
            layers: self.layers.iter().map(LayerHeader::of).collect(),
            weights: self
                .layers
                .iter()
                .flat_map(Layer::children)
                .flat_map(|node| node.edges().iter().map(|e| e.weight()))
                .collect(),
        };
        let bytes = bincode::serialize(&file).map_err(|e| SaveError::Encode(e.to_string()))?;
        fs::write(path, bytes)?;

        tracing::info!(
            path = %path.display(),
            layers = file.layers.len(),
            weights = file.weights.len(),
            "权重已保存"
        );
        Ok(())
    }

    /// 从 `path` 读取权重
    ///
    /// 先按 `skeleton` 推导的形状和当前已构建的拓扑完整校验文件，
    /// 全部通过后才写入权重；任何失败都不会改动内存中的权重。
    pub fn load_state_from_file<P: AsRef<Path>>(
        &mut self,
        skeleton: &NNInfo,
        path: P,
    ) -> Result<(), LoadError> {
        let path = path.as_ref();
        match self.try_load(skeleton, path) {
            Ok(weights) => {
                tracing::info!(path = %path.display(), weights, "权重已加载");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "权重加载失败");
                Err(e)
            }
        }
    }

    /// 按名字保存到 `states/<name>.nnstate`，目录不存在时创建
    pub fn save_state(&self, name: &str) -> Result<(), SaveError> {
        fs::create_dir_all(LEGACY_STATE_DIR)?;
        self.save_state_to_file(Self::legacy_state_path(name))
    }

    /// 按名字从 `states/<name>.nnstate` 加载
    pub fn load_state(&mut self, skeleton: &NNInfo, name: &str) -> Result<(), LoadError> {
        self.load_state_from_file(skeleton, Self::legacy_state_path(name))
    }

    fn try_load(&mut self, skeleton: &NNInfo, path: &Path) -> Result<usize, LoadError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::Missing(path.to_path_buf()),
            _ => LoadError::Io(e),
        })?;
        let file: StateFile =
            bincode::deserialize(&bytes).map_err(|e| LoadError::Corrupt(e.to_string()))?;

        // 1. 文件 vs 拓扑描述
        let expected = self.skeleton_shape(skeleton);
        if expected.len() != file.layers.len() {
            return Err(LoadError::LayerCountMismatch {
                expected: expected.len(),
                found: file.layers.len(),
            });
        }
        for (i, (want, got)) in expected.iter().zip(&file.layers).enumerate() {
            if want.kind != got.kind
                || want.node_count as u64 != got.node_count
                || want.gate_count as u64 != got.gate_count
            {
                return Err(LoadError::ShapeMismatch {
                    layer: i,
                    expected: describe_shape(want.kind, want.node_count, want.gate_count, None),
                    found: got.describe(),
                });
            }
        }

        // 2. 文件 vs 当前已构建的拓扑
        if !self.is_built() {
            return Err(LoadError::NotBuilt);
        }
        if self.layers.len() != file.layers.len() {
            return Err(LoadError::LayerCountMismatch {
                expected: self.layers.len(),
                found: file.layers.len(),
            });
        }
        for (i, (layer, got)) in self.layers.iter().zip(&file.layers).enumerate() {
            let want = LayerHeader::of(layer);
            if want != *got {
                return Err(LoadError::ShapeMismatch {
                    layer: i,
                    expected: want.describe(),
                    found: got.describe(),
                });
            }
        }
        let total = file
            .layers
            .iter()
            .try_fold(0_u64, |sum, h| h.weight_count()?.checked_add(sum))
            .ok_or_else(|| LoadError::Corrupt("文件头声明的权重数溢出".to_string()))?;
        if total != file.weights.len() as u64 {
            return Err(LoadError::Corrupt(format!(
                "文件头声明 {total} 个权重，实际 {} 个",
                file.weights.len()
            )));
        }

        // 3. 全部校验通过，提交
        let mut rest = file.weights.as_slice();
        for layer in &mut self.layers {
            for node in layer.children_mut() {
                let (head, tail) = rest.split_at(node.num_edges().min(rest.len()));
                node.set_weights(head);
                node.reset_deltas();
                rest = tail;
            }
        }
        Ok(file.weights.len())
    }

    /// 由拓扑描述推导各层形状；门数取决于构建器的网络类型
    fn skeleton_shape(&self, skeleton: &NNInfo) -> Vec<SkeletonLayer> {
        let hidden_gates = if self.net_type.is_recurrent() {
            self.net_type.gate_count()
        } else {
            1
        };
        skeleton
            .layers()
            .map(|(kind, info)| SkeletonLayer {
                kind,
                node_count: info.size,
                gate_count: if kind == LayerType::Hidden { hidden_gates } else { 1 },
            })
            .collect()
    }
}
