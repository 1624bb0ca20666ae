/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 网络拓扑描述（NNInfo）
 *                 层大小、激活函数与初始化策略的可序列化描述，引擎只读使用
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::activation::ActivationType;
use super::error::ConfigError;
use super::init::InitType;
use super::layer::LayerType;

/// 网络类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetType {
    /// 前馈（无上下文层）
    #[default]
    FeedForward,
    /// 简单循环网络（Elman）
    Rnn,
    /// 门控循环单元：更新门、重置门、候选状态
    Gru,
    /// 长短期记忆：输入门、遗忘门、输出门、候选细胞
    Lstm,
}

impl NetType {
    /// 该网络类型隐藏层每个节点的门块数
    pub const fn gate_count(&self) -> usize {
        match self {
            Self::FeedForward | Self::Rnn => 1,
            Self::Gru => 3,
            Self::Lstm => 4,
        }
    }

    /// 是否需要上下文层
    pub const fn is_recurrent(&self) -> bool {
        !matches!(self, Self::FeedForward)
    }
}

/// 单层描述
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub size: usize,
    #[serde(default)]
    pub activation: ActivationType,
    #[serde(default)]
    pub init: InitType,
}

impl LayerInfo {
    pub const fn new(size: usize, activation: ActivationType, init: InitType) -> Self {
        Self {
            size,
            activation,
            init,
        }
    }
}

/// 训练超参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingInfo {
    pub epochs: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    /// 隐藏层节点被丢弃的概率
    pub dropout: f32,
    /// 每多少行提交一次累积的增量
    pub batch_size: usize,
    /// 循环网络中一个序列包含的连续行数
    pub sequence_length: usize,
    pub seed: Option<u64>,
}

impl Default for TrainingInfo {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.1,
            momentum: 0.0,
            dropout: 0.0,
            batch_size: 1,
            sequence_length: 1,
            seed: None,
        }
    }
}

/// 网络拓扑描述
///
/// # 示例
/// ```ignore
/// let info = NNInfo::from_json(r#"{
///     "name": "xor",
///     "hidden": [{ "size": 4, "activation": "tanh", "init": "xavier" }],
///     "output": { "size": 1, "activation": "sigmoid", "init": "xavier" }
/// }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NNInfo {
    #[serde(default)]
    pub name: String,
    /// 声明的输入特征数；为 `None` 时以数据集为准
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<usize>,
    #[serde(default)]
    pub hidden: Vec<LayerInfo>,
    pub output: LayerInfo,
    #[serde(default)]
    pub bias_init: f32,
    /// 显式声明的门数；须与网络类型一致
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_count: Option<usize>,
    #[serde(default)]
    pub training: TrainingInfo,
}

impl NNInfo {
    pub fn new(name: &str, hidden: Vec<LayerInfo>, output: LayerInfo) -> Self {
        Self {
            name: name.to_string(),
            inputs: None,
            hidden,
            output,
            bias_init: 0.0,
            gate_count: None,
            training: TrainingInfo::default(),
        }
    }

    /// 不含输入层的层数（隐藏层 + 输出层）
    pub fn layer_count(&self) -> usize {
        self.hidden.len() + 1
    }

    /// 按顺序遍历隐藏层与输出层，附带层类型
    pub fn layers(&self) -> impl Iterator<Item = (LayerType, &LayerInfo)> {
        self.hidden
            .iter()
            .map(|l| (LayerType::Hidden, l))
            .chain(std::iter::once((LayerType::Output, &self.output)))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 从 JSON 文件读取
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }

    /// 写入 JSON 文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
