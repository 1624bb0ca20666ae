/*
 * @Author       : 老董
 * @Date         : 2026-02-07
 * @Description  : LayerBuilder 前向/反向传播
 *
 * 门块内输入布局：[上一层输出 (P) | 上下文 (H) | 偏置]，H 仅循环隐藏层非零。
 *
 * 前向：
 *   普通/RNN: y = act(W·x + U·c + b)
 *   GRU [z, r, n]: z = σ(net_z), r = σ(net_r),
 *                  n = tanh(Wn·x + b_n + r ⊙ (Un·c)), h = (1 - z) ⊙ n + z ⊙ c
 *   LSTM [i, f, o, g]: c_t = f ⊙ c_{t-1} + i ⊙ tanh(net_g), h = o ⊙ tanh(c_t)
 *
 * 反向截断为单个时间步（上下文视为常量输入），损失为 ½Σ(y - t)²。
 * 层间严格串行：第 k 层全部节点求值完成后第 k+1 层才读取。
 */

use rayon::prelude::*;

use super::LayerBuilder;
use crate::nn::activation::{Activation, ActivationFn, ActivationType, sigmoid};
use crate::nn::edge::Edge;
use crate::nn::info::NetType;
use crate::nn::layer::Layer;
use crate::nn::node::{ApplyMode, Node};

/// 节点的计算单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Plain,
    Gru,
    Lstm,
}

impl Cell {
    fn of(net_type: NetType, has_context: bool) -> Self {
        match (net_type, has_context) {
            (NetType::Gru, true) => Self::Gru,
            (NetType::Lstm, true) => Self::Lstm,
            _ => Self::Plain,
        }
    }

    /// 门控单元的候选值与细胞输出固定用 tanh，普通单元用层的激活函数
    fn activation(self, layer: &Layer) -> Activation {
        match self {
            Self::Plain => layer.activation_type().into(),
            Self::Gru | Self::Lstm => ActivationType::Tanh.into(),
        }
    }
}

/// 单个门块的输入划分
#[derive(Debug, Clone, Copy)]
struct BlockLayout {
    inputs: usize,
    context: usize,
    gates: usize,
}

impl BlockLayout {
    fn of(layer: &Layer, context: Option<&Layer>) -> Self {
        let context = context.map_or(0, Layer::context_width);
        Self {
            inputs: layer.fan_in().saturating_sub(context),
            context,
            gates: layer.gate_count(),
        }
    }

    const fn block_len(&self) -> usize {
        self.inputs + self.context + 1
    }

    /// 第 `gate` 块拆为 (输入边, 上下文边, 偏置值)；形状不符时视为空块
    fn split<'a>(&self, edges: &'a [Edge], gate: usize) -> (&'a [Edge], &'a [Edge], f32) {
        let len = self.block_len();
        let Some(block) = edges.get(gate * len..(gate + 1) * len) else {
            return (&[], &[], 0.0);
        };
        let (inputs, rest) = block.split_at(self.inputs);
        let (context, bias) = rest.split_at(self.context);
        (inputs, context, bias[0].weight())
    }
}

/// 某层求值所需的只读输入
struct LayerInputs<'a> {
    x: &'a [f32],
    /// 上下文节点全部边的值，按门块连续
    context: &'a [f32],
    layout: BlockLayout,
    cell: Cell,
    activation: Activation,
}

impl LayerInputs<'_> {
    fn context_block(&self, gate: usize) -> &[f32] {
        let width = self.layout.context;
        self.context
            .get(gate * width..(gate + 1) * width)
            .unwrap_or(&[])
    }

    /// 本节点上一时间步的隐藏状态
    fn previous_hidden(&self, index: usize) -> f32 {
        self.context_block(0).get(index).copied().unwrap_or(0.0)
    }
}

fn dot(edges: &[Edge], values: &[f32]) -> f32 {
    edges.iter().zip(values).map(|(e, v)| e.weight() * v).sum()
}

impl LayerBuilder {
    /// 逐层前向传播，返回输出层激活值
    ///
    /// 同时清零所有误差导数，为随后的反向传播做准备。
    pub fn forward(&self) -> Vec<f32> {
        for layer in &self.layers {
            layer.clear_err_ders();
        }

        for (k, layer) in self.layers.iter().enumerate() {
            let prev = if k == 0 {
                &self.input_layer
            } else {
                &self.layers[k - 1]
            };
            let x = prev.activations();
            let context = self.contexts[k].as_ref();
            let context_values = context
                .and_then(|c| c.node(0))
                .map(Node::weights)
                .unwrap_or_default();
            let cell = Cell::of(self.net_type, context.is_some());
            let inputs = LayerInputs {
                x: &x,
                context: &context_values,
                layout: BlockLayout::of(layer, context),
                cell,
                activation: cell.activation(layer),
            };

            let evaluate = |(j, node): (usize, &Node)| {
                evaluate_node(node, j, layer.possible_path(j), &inputs);
            };
            if self.parallel {
                layer.children().par_iter().enumerate().for_each(evaluate);
            } else {
                layer.children().iter().enumerate().for_each(evaluate);
            }
        }

        self.output_layer().map(Layer::activations).unwrap_or_default()
    }

    /// 反向传播：计算误差导数并为每条边排队增量，返回本行损失 ½Σ(y - t)²
    ///
    /// 增量只排队不提交，所有层处理完后由 `apply_deltas` 统一提交，
    /// 因此误差回传使用的始终是本次更新前的权重。
    pub fn backward(&mut self, targets: &[f32], learning_rate: f32, momentum: f32) -> f32 {
        let Some(output) = self.layers.last() else {
            return 0.0;
        };

        let mut loss = 0.0;
        for (j, node) in output.children().iter().enumerate() {
            let y = node.activation();
            let error = targets.get(j).map_or(0.0, |t| y - t);
            loss += 0.5 * error * error;
            node.adjust_err_der(error);
        }

        for k in (0..self.layers.len()).rev() {
            let (lower, upper) = self.layers.split_at_mut(k);
            let layer = &mut upper[0];
            let prev = lower.last();
            let x = prev.map_or_else(|| self.input_layer.activations(), Layer::activations);
            let context = self.contexts[k].as_ref();
            let context_values = context
                .and_then(|c| c.node(0))
                .map(Node::weights)
                .unwrap_or_default();
            let cell = Cell::of(self.net_type, context.is_some());
            let inputs = LayerInputs {
                x: &x,
                context: &context_values,
                layout: BlockLayout::of(layer, context),
                cell,
                activation: cell.activation(layer),
            };
            let active: Vec<bool> = (0..layer.len()).map(|j| layer.possible_path(j)).collect();
            let rates = (learning_rate, momentum);

            let backprop = |(j, node): (usize, &mut Node)| {
                if active[j] {
                    backprop_node(node, j, &inputs, prev, rates);
                }
            };
            if self.parallel {
                layer.children_mut().par_iter_mut().enumerate().for_each(backprop);
            } else {
                layer.children_mut().iter_mut().enumerate().for_each(backprop);
            }
        }
        loss
    }

    /// 提交所有层排队的增量
    pub fn apply_deltas(&mut self, mode: ApplyMode) {
        for layer in &mut self.layers {
            layer.apply_deltas(mode);
        }
    }
}

fn evaluate_node(node: &Node, index: usize, active: bool, inputs: &LayerInputs<'_>) {
    if !active {
        node.update_state(|s| {
            s.weight = 0.0;
            s.activation_scalar = 0.0;
            s.gates = [0.0; 4];
            s.prev_cell = s.cell;
        });
        return;
    }

    let layout = inputs.layout;
    let edges = node.edges();
    let net = |gate: usize| {
        let (w, u, bias) = layout.split(edges, gate);
        dot(w, inputs.x) + dot(u, inputs.context_block(gate)) + bias
    };
    let act = inputs.activation;

    match inputs.cell {
        Cell::Plain => {
            let net = net(0);
            let y = act.activate(net);
            node.update_state(|s| {
                s.weight = y;
                s.activation_scalar = net;
            });
        }
        Cell::Gru => {
            let z = sigmoid(net(0));
            let r = sigmoid(net(1));
            let (w, u, bias) = layout.split(edges, 2);
            let recurrent = dot(u, inputs.context_block(2));
            let pre = dot(w, inputs.x) + bias + r * recurrent;
            let n = act.activate(pre);
            let h = (1.0 - z) * n + z * inputs.previous_hidden(index);
            node.update_state(|s| {
                s.weight = h;
                s.activation_scalar = pre;
                s.gates = [z, r, n, recurrent];
            });
        }
        Cell::Lstm => {
            let i = sigmoid(net(0));
            let f = sigmoid(net(1));
            let o = sigmoid(net(2));
            let g = act.activate(net(3));
            node.update_state(|s| {
                let cell = f * s.cell + i * g;
                s.prev_cell = s.cell;
                s.cell = cell;
                s.activation_scalar = cell;
                s.gates = [i, f, o, g];
                s.weight = o * act.activate(cell);
            });
        }
    }
}

fn backprop_node(
    node: &mut Node,
    index: usize,
    inputs: &LayerInputs<'_>,
    prev: Option<&Layer>,
    (learning_rate, momentum): (f32, f32),
) {
    let state = node.state();
    let err = state.err_der;
    let act = inputs.activation;

    // 每个门块净输入的梯度，以及该块上下文输入的缩放系数
    let mut grads = [0.0_f32; 4];
    let mut context_scale = [1.0_f32; 4];
    match inputs.cell {
        Cell::Plain => {
            grads[0] = err * act.derivative(state.activation_scalar, state.weight);
        }
        Cell::Gru => {
            let [z, r, n, recurrent] = state.gates;
            let h_prev = inputs.previous_hidden(index);
            let grad_n = err * (1.0 - z) * act.derivative(state.activation_scalar, n);
            grads[0] = err * (h_prev - n) * z * (1.0 - z);
            grads[1] = grad_n * recurrent * r * (1.0 - r);
            grads[2] = grad_n;
            context_scale[2] = r;
        }
        Cell::Lstm => {
            let [i, f, o, g] = state.gates;
            let squashed = act.activate(state.cell);
            let grad_cell = err * o * act.derivative(state.cell, squashed);
            grads[0] = grad_cell * g * i * (1.0 - i);
            grads[1] = grad_cell * state.prev_cell * f * (1.0 - f);
            grads[2] = err * squashed * o * (1.0 - o);
            grads[3] = grad_cell * i * act.derivative(g, g);
        }
    }

    let layout = inputs.layout;
    let block_len = layout.block_len();
    let gates = layout.gates.min(grads.len());

    // 先用更新前的权重把误差回传给上一层
    if let Some(prev) = prev {
        for k in 0..layout.inputs {
            let partial: f32 = (0..gates)
                .map(|g| grads[g] * node.weight_at(g * block_len + k))
                .sum();
            if let Some(source) = prev.node(k) {
                source.adjust_err_der(partial);
            }
        }
    }

    for g in 0..gates {
        let base = g * block_len;
        let context = inputs.context_block(g);
        let sources = (0..layout.inputs)
            .map(|k| inputs.x.get(k).copied().unwrap_or(0.0))
            .chain((0..layout.context).map(|k| {
                context.get(k).copied().unwrap_or(0.0) * context_scale[g]
            }))
            .chain(std::iter::once(1.0));
        for (offset, source) in sources.enumerate() {
            let edge = base + offset;
            let delta = node.get_delta(edge, grads[g], source, learning_rate, momentum);
            node.queue_delta(edge, delta);
        }
    }
}
