/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : LayerBuilder - 依据拓扑描述与数据集构建分层网络
 *
 * 状态机：Empty → Built → (Attached ⇄ Detached) → Cleaned
 *
 * 按职责拆分为多个 impl 块：
 * - mod.rs：结构体、build/clean、attach/detach
 * - input.rs：复用输入层、特征标准化
 * - context.rs：循环上下文、时间状态缓冲、dropout
 * - propagation.rs：前向/反向传播
 * - persistence.rs：权重的二进制保存/加载
 */

mod context;
mod input;
mod persistence;
mod propagation;

pub use persistence::LEGACY_STATE_DIR;

use std::fmt;
use std::sync::Arc;

use ndarray::Array3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::error::BuildError;
use super::info::{NNInfo, NetType};
use super::layer::{Layer, LayerType};
use crate::data::{DataInput, Split};

/// 构建器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    Built,
    Attached,
    Detached,
    Cleaned,
}

pub struct LayerBuilder {
    net_type: NetType,
    /// 隐藏层 + 输出层（不含输入层）
    layers: Vec<Layer>,
    /// 与 `layers` 对齐，循环隐藏层才有上下文层
    contexts: Vec<Option<Layer>>,
    /// 复用的输入层，每行只覆盖节点值
    input_layer: Layer,
    input_row_count: usize,
    input_feature_count: usize,
    standardize: bool,
    x_min: Vec<f32>,
    x_max: Vec<f32>,
    x_range: Vec<f32>,
    /// 层 × 节点 × 时间步
    time_state: Array3<f32>,
    dataset: Option<Arc<dyn DataInput>>,
    info: Option<NNInfo>,
    last_error: Option<String>,
    rng: StdRng,
    parallel: bool,
    state: BuilderState,
}

impl Default for LayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerBuilder {
    pub fn new() -> Self {
        Self::with_net_type(NetType::FeedForward)
    }

    pub fn with_net_type(net_type: NetType) -> Self {
        Self {
            net_type,
            layers: Vec::new(),
            contexts: Vec::new(),
            input_layer: Layer::empty(LayerType::Input),
            input_row_count: 0,
            input_feature_count: 0,
            standardize: false,
            x_min: Vec::new(),
            x_max: Vec::new(),
            x_range: Vec::new(),
            time_state: Array3::zeros((0, 0, 0)),
            dataset: None,
            info: None,
            last_error: None,
            rng: StdRng::from_entropy(),
            parallel: false,
            state: BuilderState::Empty,
        }
    }

    /// 固定随机种子（权重初始化与内部 dropout 可重复）
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// 层内节点是否用 rayon 并行求值
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub const fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub const fn net_type(&self) -> NetType {
        self.net_type
    }

    pub const fn state(&self) -> BuilderState {
        self.state
    }

    pub fn is_built(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn info(&self) -> Option<&NNInfo> {
        self.info.as_ref()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn output_layer(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// 第 `index` 层的上下文层（仅循环隐藏层存在）
    pub fn context(&self, index: usize) -> Option<&Layer> {
        self.contexts.get(index).and_then(Option::as_ref)
    }

    /// 输入层（不读取数据集）
    pub fn input_layer(&self) -> &Layer {
        &self.input_layer
    }

    pub const fn input_row_count(&self) -> usize {
        self.input_row_count
    }

    pub const fn input_feature_count(&self) -> usize {
        self.input_feature_count
    }

    // ========== 数据集 attach/detach ==========

    /// 关联数据集；训练驱动须在每次运行前后成对调用 attach/detach
    pub fn attach_data_input(&mut self, dataset: Arc<dyn DataInput>) {
        self.input_row_count = dataset.row_count(Split::Train);
        self.dataset = Some(dataset);
        if self.is_built() {
            self.state = BuilderState::Attached;
        }
    }

    pub fn detach_data_input(&mut self) {
        self.dataset = None;
        if self.is_built() {
            self.state = BuilderState::Detached;
        }
    }

    pub fn data_input(&self) -> Option<&Arc<dyn DataInput>> {
        self.dataset.as_ref()
    }

    // ========== 构建 ==========

    /// 依据拓扑描述构建输入/隐藏/输出层，循环网络另建上下文层
    ///
    /// 失败时返回错误并记录 `last_error`，原有拓扑保持不变。
    pub fn build(
        &mut self,
        info: &NNInfo,
        dataset: Arc<dyn DataInput>,
        net_type: NetType,
        standardize_weights: bool,
    ) -> Result<(), BuildError> {
        match self.try_build(info, dataset, net_type, standardize_weights) {
            Ok(()) => {
                self.last_error = None;
                tracing::info!(
                    name = %info.name,
                    ?net_type,
                    layers = self.layers.len(),
                    inputs = self.input_feature_count,
                    "拓扑构建完成"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(name = %info.name, error = %e, "拓扑构建失败");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn try_build(
        &mut self,
        info: &NNInfo,
        dataset: Arc<dyn DataInput>,
        net_type: NetType,
        standardize_weights: bool,
    ) -> Result<(), BuildError> {
        let gate_count = net_type.gate_count();
        if let Some(declared) = info.gate_count
            && declared != gate_count
        {
            return Err(BuildError::UnsupportedGateCount {
                net_type,
                gate_count: declared,
            });
        }

        let features = dataset.feature_count();
        if features == 0 {
            return Err(BuildError::ZeroSizedLayer { index: 0 });
        }
        if let Some(expected) = info.inputs
            && expected != features
        {
            return Err(BuildError::FeatureMismatch {
                expected,
                got: features,
            });
        }
        for (i, (_, layer)) in info.layers().enumerate() {
            if layer.size == 0 {
                return Err(BuildError::ZeroSizedLayer { index: i + 1 });
            }
        }
        if info.output.size != dataset.target_count() {
            return Err(BuildError::TargetMismatch {
                expected: info.output.size,
                got: dataset.target_count(),
            });
        }
        let rows = dataset.row_count(Split::Train);
        if rows == 0 {
            return Err(BuildError::EmptyDataset);
        }

        // 先在局部构建，全部成功后再提交
        let (layers, contexts) = self.build_layers(info, features, net_type);

        if self.input_layer.len() != features {
            self.input_layer = Layer::new(features, LayerType::Input, 0.0);
        }
        self.input_layer.clear_activations();
        self.input_feature_count = features;
        self.input_row_count = rows;
        self.net_type = net_type;
        self.layers = layers;
        self.contexts = contexts;
        self.info = Some(info.clone());
        self.assign_node_ids();

        let steps = info.training.sequence_length.max(1);
        let widest = self.layers.iter().map(Layer::len).max().unwrap_or(0);
        self.time_state = Array3::zeros((self.layers.len(), widest, steps));

        self.state = BuilderState::Built;
        self.attach_data_input(dataset);
        self.standardize = standardize_weights;
        if standardize_weights {
            self.compute_standardization();
        } else {
            self.x_min.clear();
            self.x_max.clear();
            self.x_range.clear();
        }
        Ok(())
    }

    fn build_layers(
        &mut self,
        info: &NNInfo,
        features: usize,
        net_type: NetType,
    ) -> (Vec<Layer>, Vec<Option<Layer>>) {
        let mut layers = Vec::with_capacity(info.layer_count());
        let mut contexts = Vec::with_capacity(info.layer_count());
        let mut prev_size = features;

        for (kind, layer_info) in info.layers() {
            let mut layer = Layer::new(layer_info.size, kind, info.bias_init);
            let context = if kind == LayerType::Hidden && net_type.is_recurrent() {
                // 门块输入 = 上一层输出 ++ 本层上一时间步的隐藏状态
                layer.init_gated_weights(
                    prev_size + layer_info.size,
                    layer_info.size,
                    layer_info.init,
                    layer_info.activation,
                    net_type.gate_count(),
                    &mut self.rng,
                );
                let mut context = layer.setup_context(net_type.gate_count());
                context.set_context_of(layers.len());
                Some(context)
            } else {
                layer.init_weights(
                    layer_info.init,
                    prev_size,
                    layer_info.activation,
                    &mut self.rng,
                );
                None
            };
            prev_size = layer_info.size;
            layers.push(layer);
            contexts.push(context);
        }
        (layers, contexts)
    }

    /// 全图顺序编号：输入层从 0 开始，依次为各层
    fn assign_node_ids(&mut self) {
        let mut next = 0_i64;
        for node in self.input_layer.children_mut() {
            node.set_id(next);
            next += 1;
        }
        for layer in &mut self.layers {
            for node in layer.children_mut() {
                node.set_id(next);
                next += 1;
            }
        }
    }

    /// 特征数变化时单独重建输入层；下游权重需重新 `build` 才会匹配
    pub fn rebuild_input_layers(&mut self, feature_count: usize) {
        if self.input_layer.len() == feature_count {
            return;
        }
        tracing::debug!(
            from = self.input_layer.len(),
            to = feature_count,
            "重建输入层"
        );
        self.input_layer = Layer::new(feature_count, LayerType::Input, 0.0);
        self.input_feature_count = feature_count;
        self.assign_node_ids();
    }

    /// 释放全部层
    pub fn clean(&mut self) {
        for layer in &mut self.layers {
            layer.clean();
        }
        self.layers.clear();
        self.contexts.clear();
        self.input_layer.clean();
        self.input_feature_count = 0;
        self.input_row_count = 0;
        self.time_state = Array3::zeros((0, 0, 0));
        self.dataset = None;
        self.info = None;
        self.state = BuilderState::Cleaned;
    }

    /// 各层激活值的只读快照（供可视化等外部消费）
    pub fn activations_snapshot(&self) -> Vec<Vec<f32>> {
        std::iter::once(&self.input_layer)
            .chain(&self.layers)
            .map(Layer::activations)
            .collect()
    }
}

impl fmt::Display for LayerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LayerBuilder({:?}, {:?}): Input[{}]",
            self.net_type,
            self.state,
            self.input_layer.len()
        )?;
        for (i, layer) in self.layers.iter().enumerate() {
            write!(
                f,
                " -> {:?}[{} 节点 x {} 边{}]",
                layer.kind(),
                layer.len(),
                layer.edges_per_node(),
                if self.context(i).is_some() { ", 上下文" } else { "" }
            )?;
        }
        Ok(())
    }
}
