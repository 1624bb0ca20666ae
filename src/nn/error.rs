/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 图引擎的错误类型
 *
 * 构建/加载类错误可恢复并返回给调用方；
 * 逐元素访问的越界在热循环内被吸收（返回中性值），不在此列。
 */

use std::path::PathBuf;
use thiserror::Error;

use super::info::NetType;
use super::layer::LayerType;

/// 拓扑构建错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("第 {index} 层的节点数为 0")]
    ZeroSizedLayer { index: usize },
    #[error("数据集中没有训练样本")]
    EmptyDataset,
    #[error("特征数不一致：拓扑声明 {expected} 个输入，数据集提供 {got} 个")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("输出层节点数 {expected} 与数据集目标列数 {got} 不一致")]
    TargetMismatch { expected: usize, got: usize },
    #[error("网络类型 {net_type:?} 不支持 {gate_count} 个门")]
    UnsupportedGateCount { net_type: NetType, gate_count: usize },
}

/// 权重文件加载错误
///
/// 任一错误发生时，内存中的权重保持不变。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("权重文件不存在: {0}")]
    Missing(PathBuf),
    #[error("读取权重文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("权重文件已损坏或被截断: {0}")]
    Corrupt(String),
    #[error("层数不一致：期望 {expected}，文件中为 {found}")]
    LayerCountMismatch { expected: usize, found: usize },
    #[error("第 {layer} 层形状不一致：期望 {expected}，文件中为 {found}")]
    ShapeMismatch {
        layer: usize,
        expected: String,
        found: String,
    },
    #[error("尚未构建拓扑，无法加载权重")]
    NotBuilt,
}

/// 权重文件保存错误
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("写入权重文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("编码权重失败: {0}")]
    Encode(String),
    #[error("尚未构建拓扑，无法保存权重")]
    NotBuilt,
}

/// 训练过程错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrainError {
    #[error("尚未构建拓扑")]
    NotBuilt,
    #[error("数据集与拓扑不匹配: {0}")]
    DatasetMismatch(String),
    #[error("{split} 划分中没有样本")]
    NoRows { split: String },
}

/// 拓扑描述（配置）错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("解析配置失败: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 单层形状的可读描述，用于错误信息
pub(crate) fn describe_shape(
    kind: LayerType,
    node_count: usize,
    gate_count: usize,
    edges_per_node: Option<usize>,
) -> String {
    match edges_per_node {
        Some(edges) => {
            format!("{kind:?}[{node_count} 节点, {gate_count} 门, 每节点 {edges} 条边]")
        }
        None => format!("{kind:?}[{node_count} 节点, {gate_count} 门]"),
    }
}
