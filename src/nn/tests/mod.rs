//! 图引擎单元测试
//!
//! 共用的小数据集与拓扑构造放在这里，各主题一个文件。

mod edge;
mod init;
mod node;
mod propagation;

use std::sync::Arc;

use crate::data::TableDataset;
use crate::nn::{ActivationType, InitType, LayerBuilder, LayerInfo, NNInfo, NetType};

/// 全部行都划入训练集
fn dataset(features: &[Vec<f32>], targets: &[Vec<f32>]) -> Arc<TableDataset> {
    Arc::new(TableDataset::from_rows(features, targets, 1.0).unwrap())
}

fn xor_dataset() -> Arc<TableDataset> {
    dataset(
        &[
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ],
        &[vec![0.0], vec![1.0], vec![1.0], vec![0.0]],
    )
}

/// 隐藏层 tanh、输出层 sigmoid
fn topology(hidden: &[usize], outputs: usize, init: InitType) -> NNInfo {
    NNInfo::new(
        "unit",
        hidden
            .iter()
            .map(|&size| LayerInfo::new(size, ActivationType::Tanh, init))
            .collect(),
        LayerInfo::new(outputs, ActivationType::Sigmoid, init),
    )
}

fn build(info: &NNInfo, net_type: NetType, data: &Arc<TableDataset>, seed: u64) -> LayerBuilder {
    let mut builder = LayerBuilder::new();
    builder.set_seed(seed);
    builder.build(info, data.clone(), net_type, false).unwrap();
    builder
}

/// 所有层（不含输入层）全部边权重
fn all_weights(builder: &LayerBuilder) -> Vec<Vec<Vec<f32>>> {
    builder.layers().iter().map(|l| l.weights()).collect()
}
