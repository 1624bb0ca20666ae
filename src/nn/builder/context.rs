/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : LayerBuilder 循环上下文、时间状态缓冲与 dropout
 *
 * 时序约束：update_context_from_hidden_activations 必须在本时间步前向完成之后、
 * 下一时间步前向开始之前调用；&mut self 保证它不会与前向传播重叠。
 */

use ndarray::{Array3, s};
use rand::Rng;

use super::LayerBuilder;

impl LayerBuilder {
    /// 序列开始时将所有上下文边置为 `value`，并清除 LSTM 细胞状态
    pub fn reset_context_state(&mut self, value: f32) {
        for (layer, context) in self.layers.iter().zip(self.contexts.iter_mut()) {
            let Some(context) = context else {
                continue;
            };
            for node in context.children_mut() {
                node.fill_weights(value);
            }
            for node in layer.children() {
                node.clear_recurrent_state();
            }
        }
        tracing::debug!(value, "上下文状态已重置");
    }

    /// 用隐藏层当前激活值覆盖上下文节点的每个门块
    pub fn update_context_from_hidden_activations(&mut self) {
        for (layer, context) in self.layers.iter().zip(self.contexts.iter_mut()) {
            let Some(context) = context else {
                continue;
            };
            let activations = layer.activations();
            let width = activations.len();
            let gates = context.gate_count();
            let Some(node) = context.node_mut(0) else {
                continue;
            };
            for gate in 0..gates {
                for (k, &a) in activations.iter().enumerate() {
                    node.set_weight_at(gate * width + k, a);
                }
            }
        }
    }

    // ========== 时间状态缓冲 ==========

    /// 缓冲区可容纳的时间步数
    pub fn time_steps(&self) -> usize {
        self.time_state.dim().2
    }

    /// 确保缓冲区至少容纳 `steps` 个时间步；扩容时保留已记录的值
    pub fn ensure_time_steps(&mut self, steps: usize) {
        let (layers, nodes, current) = self.time_state.dim();
        if steps <= current {
            return;
        }
        let mut grown = Array3::zeros((layers, nodes, steps));
        grown
            .slice_mut(s![.., .., ..current])
            .assign(&self.time_state);
        self.time_state = grown;
        tracing::debug!(from = current, to = steps, "时间状态缓冲已扩容");
    }

    /// 记录第 `step` 步各层激活值；越界时忽略
    pub fn record_time_state(&mut self, step: usize) {
        let (layers, nodes, steps) = self.time_state.dim();
        if step >= steps {
            return;
        }
        for (l, layer) in self.layers.iter().enumerate().take(layers) {
            for (n, node) in layer.children().iter().enumerate().take(nodes) {
                self.time_state[[l, n, step]] = node.activation();
            }
        }
    }

    /// 读取缓冲值；越界返回 0
    pub fn time_state(&self, layer: usize, node: usize, step: usize) -> f32 {
        self.time_state
            .get([layer, node, step])
            .copied()
            .unwrap_or(0.0)
    }

    pub fn clear_time_state(&mut self) {
        self.time_state.fill(0.0);
    }

    // ========== dropout ==========

    /// 对第 `layer_index` 层施加 dropout
    ///
    /// 给定 `precomputed_mask` 时直接使用（便于训练驱动用自己的种子序列复现），
    /// 否则由构建器的 RNG 按 `probability` 生成。
    pub fn scramble_dropout(
        &mut self,
        layer_index: usize,
        probability: f32,
        precomputed_mask: Option<&[bool]>,
    ) {
        let Some(layer) = self.layers.get_mut(layer_index) else {
            return;
        };
        match precomputed_mask {
            Some(mask) => layer.generate_dropout_from_mask(mask),
            None => layer.generate_dropout(probability, &mut self.rng),
        }
    }

    /// 生成一个与第 `layer_index` 层等长的掩码（不施加）
    pub fn dropout_mask<R: Rng + ?Sized>(
        &self,
        layer_index: usize,
        probability: f32,
        rng: &mut R,
    ) -> Vec<bool> {
        let len = self.layers.get(layer_index).map_or(0, |l| l.len());
        let p = f64::from(probability.clamp(0.0, 1.0));
        (0..len).map(|_| rng.gen_bool(p)).collect()
    }

    pub fn clear_dropout(&mut self) {
        for layer in &mut self.layers {
            layer.clear_dropout();
        }
    }
}
