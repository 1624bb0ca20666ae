/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : Layer - 同一角色节点的有序集合，外加逐节点的 dropout 标记
 *
 * 节点以下标寻址（arena），removeNode 为 O(1) 的 swap_remove。
 * dropout_flags 与 children 始终等长、按下标对齐。
 */

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::activation::ActivationType;
use super::init::{InitType, Initializer};
use super::node::{ApplyMode, Node};

/// 层的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Input,
    Hidden,
    Output,
}

#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerType,
    children: Vec<Node>,
    dropout_flags: Vec<bool>,
    bias_init: f32,
    gate_count: usize,
    /// 每个门块的输入数（不含偏置）
    fan_in: usize,
    activation: ActivationType,
    /// 上下文层所对应（视图）的隐藏层下标
    context_of: Option<usize>,
}

impl Layer {
    /// 创建含 `input_count` 个节点的层，`bias_init` 为初始化时偏置边的取值
    pub fn new(input_count: usize, kind: LayerType, bias_init: f32) -> Self {
        Self {
            kind,
            children: (0..input_count).map(|i| Node::new(i as i64)).collect(),
            dropout_flags: vec![false; input_count],
            bias_init,
            gate_count: 1,
            fan_in: 0,
            activation: ActivationType::default(),
            context_of: None,
        }
    }

    /// 创建空层，节点稍后通过 `add_node` 加入
    pub fn empty(kind: LayerType) -> Self {
        Self::new(0, kind, 0.0)
    }

    pub const fn kind(&self) -> LayerType {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.children.get_mut(index)
    }

    pub const fn gate_count(&self) -> usize {
        self.gate_count
    }

    pub const fn fan_in(&self) -> usize {
        self.fan_in
    }

    /// 每个节点的边数
    pub const fn edges_per_node(&self) -> usize {
        self.gate_count * (self.fan_in + 1)
    }

    pub const fn activation_type(&self) -> ActivationType {
        self.activation
    }

    pub fn set_activation_type(&mut self, activation: ActivationType) {
        self.activation = activation;
    }

    pub const fn bias_init(&self) -> f32 {
        self.bias_init
    }

    pub const fn is_context(&self) -> bool {
        self.context_of.is_some()
    }

    pub const fn context_of(&self) -> Option<usize> {
        self.context_of
    }

    pub(crate) fn set_context_of(&mut self, hidden_index: usize) {
        self.context_of = Some(hidden_index);
    }

    // ========== 权重初始化 ==========

    /// 每个节点分配 `prev_layer_size + 1` 条边（最后一条为偏置）
    pub fn init_weights<R: Rng + ?Sized>(
        &mut self,
        init: InitType,
        prev_layer_size: usize,
        activation: ActivationType,
        rng: &mut R,
    ) {
        self.init_weights_with_presets(init, prev_layer_size, activation, &[], rng);
    }

    /// 同 `init_weights`，但第 i 个节点先复制 `presets[i]` 作为权重前缀
    pub fn init_weights_with_presets<R: Rng + ?Sized>(
        &mut self,
        init: InitType,
        prev_layer_size: usize,
        activation: ActivationType,
        presets: &[Vec<f32>],
        rng: &mut R,
    ) {
        self.init_blocks(init, prev_layer_size, activation, 1, presets, rng);
    }

    /// 每个节点分配 `gate_count * (prev_layer_size + 1)` 条边，
    /// 按门块连续排布：块内先 `prev_layer_size` 个输入权重，后 1 个偏置。
    ///
    /// `current_layer_size` 仅用于日志中的形状描述。
    pub fn init_gated_weights<R: Rng + ?Sized>(
        &mut self,
        prev_layer_size: usize,
        current_layer_size: usize,
        init: InitType,
        activation: ActivationType,
        gate_count: usize,
        rng: &mut R,
    ) {
        tracing::debug!(
            prev_layer_size,
            current_layer_size,
            gate_count,
            "初始化门控权重"
        );
        self.init_blocks(init, prev_layer_size, activation, gate_count, &[], rng);
    }

    fn init_blocks<R: Rng + ?Sized>(
        &mut self,
        init: InitType,
        prev_layer_size: usize,
        activation: ActivationType,
        gate_count: usize,
        presets: &[Vec<f32>],
        rng: &mut R,
    ) {
        let gate_count = gate_count.max(1);
        self.gate_count = gate_count;
        self.fan_in = prev_layer_size;
        self.activation = activation;

        let initializer = Initializer::new(init, prev_layer_size, activation);
        let count = gate_count * (prev_layer_size + 1);
        let preset_len = presets.len();
        for (i, node) in self.children.iter_mut().enumerate() {
            node.set_gate_count(gate_count);
            let preset = presets.get(i).map_or(&[][..], Vec::as_slice);
            node.init_weights_with_preset(count, preset, &initializer, rng);
            // 仅未被预设覆盖的偏置边取 bias_init
            for gate in 0..gate_count {
                let bias = gate * (prev_layer_size + 1) + prev_layer_size;
                if bias >= preset.len() {
                    node.set_weight_at(bias, self.bias_init);
                }
            }
        }
        if preset_len > self.children.len() {
            tracing::debug!(
                preset_len,
                nodes = self.children.len(),
                "多余的预设权重被忽略"
            );
        }
    }

    /// 构建上下文层：单个节点，`gate_count` 个宽度为本层节点数的块，初值为 0
    pub fn setup_context(&self, gate_count: usize) -> Layer {
        let gate_count = gate_count.max(1);
        let width = self.children.len();
        let mut context = Layer::new(1, LayerType::Hidden, 0.0);
        context.gate_count = gate_count;
        let node = &mut context.children[0];
        node.set_gate_count(gate_count);
        node.init_constant(gate_count * width, 0.0);
        context
    }

    /// 上下文层每个块的宽度
    pub fn context_width(&self) -> usize {
        self.children
            .first()
            .map_or(0, |n| n.num_edges() / self.gate_count.max(1))
    }

    // ========== 旧式标量偏置 ==========

    /// 所有节点第一个门块偏置的平均值（仅供显示/调试/旧文件头）
    pub fn bias_weight(&self) -> f32 {
        if self.children.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.children.iter().map(Node::bias).sum();
        sum / self.children.len() as f32
    }

    /// 将所有节点所有门块的偏置设为 `value`
    pub fn set_bias_weight(&mut self, value: f32) {
        for node in &mut self.children {
            node.set_bias(value);
        }
    }

    // ========== dropout ==========

    /// 重置 dropout 掩码，使其与节点数等长且全部为 false
    pub fn setup_dropout(&mut self) {
        self.dropout_flags.clear();
        self.dropout_flags.resize(self.children.len(), false);
    }

    /// 以概率 `probability` 丢弃每个节点
    pub fn generate_dropout<R: Rng + ?Sized>(&mut self, probability: f32, rng: &mut R) {
        let p = f64::from(probability.clamp(0.0, 1.0));
        self.dropout_flags = (0..self.children.len()).map(|_| rng.gen_bool(p)).collect();
    }

    /// 使用调用方给定的掩码；长度不足处视为未丢弃，多余部分被忽略
    pub fn generate_dropout_from_mask(&mut self, mask: &[bool]) {
        self.dropout_flags = (0..self.children.len())
            .map(|i| mask.get(i).copied().unwrap_or(false))
            .collect();
    }

    pub fn clear_dropout(&mut self) {
        self.setup_dropout();
    }

    pub fn dropout_flags(&self) -> &[bool] {
        &self.dropout_flags
    }

    /// 第 `index` 个节点是否参与本次传播（越界为 false）
    pub fn possible_path(&self, index: usize) -> bool {
        self.dropout_flags.get(index).is_some_and(|dropped| !dropped)
    }

    pub fn first_valid_path(&self) -> Option<usize> {
        (0..self.children.len()).find(|&i| self.possible_path(i))
    }

    pub fn last_valid_path(&self) -> Option<usize> {
        (0..self.children.len()).rev().find(|&i| self.possible_path(i))
    }

    // ========== 结构变更 ==========

    pub fn add_node(&mut self, node: Node) {
        self.children.push(node);
        self.dropout_flags.push(false);
    }

    /// O(1) 移除：末尾节点被换到 `index` 处
    pub fn remove_node(&mut self, index: usize) -> Option<Node> {
        if index >= self.children.len() {
            return None;
        }
        self.dropout_flags.swap_remove(index);
        Some(self.children.swap_remove(index))
    }

    /// 释放所有节点，同时清空 dropout 状态
    pub fn clean(&mut self) {
        for node in &mut self.children {
            node.clean();
        }
        self.children.clear();
        self.dropout_flags.clear();
        self.fan_in = 0;
        self.gate_count = 1;
    }

    /// 改变节点数；新增节点无边，原有节点保留
    pub fn resize(&mut self, count: usize) {
        let start = self.children.len();
        self.children.truncate(count);
        self.children.extend((start..count).map(|i| Node::new(i as i64)));
        self.setup_dropout();
    }

    // ========== 批量操作与快照 ==========

    pub fn apply_deltas(&mut self, mode: ApplyMode) {
        for node in &mut self.children {
            let count = node.num_edges();
            node.apply_deltas(count, mode);
        }
    }

    pub fn clear_err_ders(&self) {
        for node in &self.children {
            node.clear_err_der();
        }
    }

    pub fn clear_activations(&self) {
        for node in &self.children {
            node.clear_activation();
        }
    }

    /// 各节点激活值（只读快照）
    pub fn activations(&self) -> Vec<f32> {
        self.children.iter().map(Node::activation).collect()
    }

    /// 各节点全部边权重（只读快照）
    pub fn weights(&self) -> Vec<Vec<f32>> {
        self.children.iter().map(Node::weights).collect()
    }
}
