/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : Node - 持有入边列表与受锁保护的标量状态
 *
 * 入边按门块连续排布：块 g 占 [g*(fan_in+1), (g+1)*(fan_in+1))，
 * 块内最后一条为该门的偏置。边列表形状在初始化后不变，可并发只读；
 * 激活值/误差导数等标量由节点内部的锁串行化。
 */

use parking_lot::Mutex;
use rand::Rng;

use super::edge::Edge;
use super::init::Initializer;

/// 节点受锁保护的可变标量
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeState {
    /// 激活值（输入层节点即特征值）
    pub weight: f32,
    /// 反向传播累积的误差导数
    pub err_der: f32,
    /// 缓存的净输入（激活函数的输入）
    pub activation_scalar: f32,
    /// 门控单元缓存的门输出；GRU 用 [z, r, n, Un·c]，LSTM 用 [i, f, o, g]
    pub gates: [f32; 4],
    /// LSTM 细胞状态
    pub cell: f32,
    /// 上一时间步的 LSTM 细胞状态
    pub prev_cell: f32,
}

/// 增量提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// 直接提交累加值
    #[default]
    Accumulated,
    /// 按批大小取平均后提交
    Averaged { batch: usize },
}

impl ApplyMode {
    fn scale(self) -> f32 {
        match self {
            Self::Accumulated => 1.0,
            Self::Averaged { batch } => 1.0 / batch.max(1) as f32,
        }
    }
}

#[derive(Debug)]
pub struct Node {
    id: i64,
    gate_count: usize,
    edges: Vec<Edge>,
    state: Mutex<NodeState>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            gate_count: self.gate_count,
            edges: self.edges.clone(),
            state: Mutex::new(*self.state.lock()),
        }
    }
}

impl Node {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            gate_count: 1,
            edges: Vec::new(),
            state: Mutex::new(NodeState::default()),
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub const fn gate_count(&self) -> usize {
        self.gate_count
    }

    pub(crate) fn set_gate_count(&mut self, gate_count: usize) {
        self.gate_count = gate_count.max(1);
    }

    // ========== 边 ==========

    /// 分配 `count` 条边并按初始化策略赋值
    pub fn init_weights<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        initializer: &Initializer,
        rng: &mut R,
    ) {
        self.init_weights_with_preset(count, &[], initializer, rng);
    }

    /// 先复制 `preset` 前缀（截断至 `count`），剩余的边按初始化策略赋值
    pub fn init_weights_with_preset<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        preset: &[f32],
        initializer: &Initializer,
        rng: &mut R,
    ) {
        let copied = preset.len().min(count);
        self.edges = preset[..copied]
            .iter()
            .copied()
            .chain(initializer.generate(count - copied, rng))
            .enumerate()
            .map(|(i, w)| Edge::new(i as u64, w))
            .collect();
    }

    /// 分配 `count` 条取值均为 `value` 的边
    pub fn init_constant(&mut self, count: usize, value: f32) {
        self.edges = (0..count).map(|i| Edge::new(i as u64, value)).collect();
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// 越界返回 `None`
    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    /// 越界返回 0
    pub fn weight_at(&self, index: usize) -> f32 {
        self.edges.get(index).map_or(0.0, Edge::weight)
    }

    /// 越界时不做任何事
    pub fn set_weight_at(&mut self, index: usize, weight: f32) {
        if let Some(edge) = self.edges.get_mut(index) {
            edge.set_weight(weight);
        }
    }

    /// 全部边权重的副本
    pub fn weights(&self) -> Vec<f32> {
        self.edges.iter().map(Edge::weight).collect()
    }

    /// 按顺序覆盖边权重，多余的值被忽略
    pub fn set_weights(&mut self, weights: &[f32]) {
        for (edge, &w) in self.edges.iter_mut().zip(weights) {
            edge.set_weight(w);
        }
    }

    /// 将全部边权重置为 `value`
    pub fn fill_weights(&mut self, value: f32) {
        for edge in &mut self.edges {
            edge.set_weight(value);
        }
    }

    /// 每个门块的边数（含偏置）
    pub fn block_len(&self) -> usize {
        self.edges.len() / self.gate_count.max(1)
    }

    /// 第 `gate` 个门块的偏置边下标
    pub fn bias_index(&self, gate: usize) -> Option<usize> {
        let block = self.block_len();
        (block > 0 && gate < self.gate_count).then(|| gate * block + block - 1)
    }

    /// 旧式标量偏置：第一个门块的偏置边
    pub fn bias(&self) -> f32 {
        self.bias_index(0).map_or(0.0, |i| self.weight_at(i))
    }

    /// 将每个门块的偏置边都设为 `value`
    pub fn set_bias(&mut self, value: f32) {
        for gate in 0..self.gate_count {
            if let Some(i) = self.bias_index(gate) {
                self.set_weight_at(i, value);
            }
        }
    }

    // ========== 训练增量 ==========

    /// 计算单条边的更新量（梯度项 + 动量项），不修改边
    ///
    /// `delta = -lr * target_gradient * source_activation + momentum * last_delta`
    pub fn get_delta(
        &self,
        edge_index: usize,
        target_gradient: f32,
        source_activation: f32,
        learning_rate: f32,
        momentum: f32,
    ) -> f32 {
        let Some(edge) = self.edges.get(edge_index) else {
            return 0.0;
        };
        -learning_rate * target_gradient * source_activation + momentum * edge.last_delta()
    }

    /// 排队一个增量，等待 `apply_deltas` 提交
    pub fn queue_delta(&mut self, edge_index: usize, delta: f32) {
        if let Some(edge) = self.edges.get_mut(edge_index) {
            edge.queue(delta);
        }
    }

    /// 提交前 `count` 条边（截断至边数）的待定增量
    pub fn apply_deltas(&mut self, count: usize, mode: ApplyMode) {
        let scale = mode.scale();
        let count = count.min(self.edges.len());
        for edge in &mut self.edges[..count] {
            edge.commit(scale);
        }
    }

    /// 丢弃全部待定增量与动量历史
    pub fn reset_deltas(&mut self) {
        for edge in &mut self.edges {
            edge.reset_deltas();
        }
    }

    // ========== 受锁保护的标量 ==========

    pub fn activation(&self) -> f32 {
        self.state.lock().weight
    }

    pub fn set_activation(&self, value: f32) {
        self.state.lock().weight = value;
    }

    pub fn clear_activation(&self) {
        let mut state = self.state.lock();
        state.weight = 0.0;
        state.activation_scalar = 0.0;
        state.gates = [0.0; 4];
    }

    pub fn err_der(&self) -> f32 {
        self.state.lock().err_der
    }

    /// 累加误差导数（多个下游节点分别贡献的偏导）
    pub fn adjust_err_der(&self, value: f32) {
        self.state.lock().err_der += value;
    }

    pub fn clear_err_der(&self) {
        self.state.lock().err_der = 0.0;
    }

    pub fn activation_scalar(&self) -> f32 {
        self.state.lock().activation_scalar
    }

    /// 状态快照（一次加锁读出全部字段）
    pub fn state(&self) -> NodeState {
        *self.state.lock()
    }

    /// 在锁内修改状态
    pub fn update_state<T>(&self, f: impl FnOnce(&mut NodeState) -> T) -> T {
        let mut state = self.state.lock();
        f(&mut *state)
    }

    /// 清除循环状态（LSTM 细胞）
    pub fn clear_recurrent_state(&self) {
        let mut state = self.state.lock();
        state.cell = 0.0;
        state.prev_cell = 0.0;
    }

    /// 释放边并清零状态
    pub fn clean(&mut self) {
        self.edges.clear();
        *self.state.get_mut() = NodeState::default();
    }
}
