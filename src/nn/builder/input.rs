/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : LayerBuilder 复用输入层 + 特征 min-max 标准化
 *
 * 输入层只有一份，每行仅覆盖节点值而不重新分配节点，
 * 因此同一时刻只能为一行物化（&mut self 保证独占）。
 */

use super::LayerBuilder;
use crate::data::Split;
use crate::nn::layer::Layer;

impl LayerBuilder {
    /// 用指定划分第 `row_index` 行的前 `column_count` 个特征覆盖输入层节点值
    ///
    /// `column_count` 超过特征数时按特征数截断，其余节点置 0；
    /// 未关联数据集或行越界时返回全零输入层。
    pub fn get_input_layer(&mut self, row_index: usize, column_count: usize, split: Split) -> &Layer {
        let dataset = self.dataset.clone();
        let row = dataset.as_deref().and_then(|d| d.row(split, row_index));
        if row.is_none() {
            tracing::debug!(row_index, ?split, "输入行不可用，输入层置零");
        }

        let columns = column_count.min(self.input_layer.len());
        for (j, node) in self.input_layer.children().iter().enumerate() {
            // 截断列之外的节点保持 0，不参与标准化
            let value = match row.and_then(|r| r.get(j)) {
                Some(&raw) if j < columns && self.standardize => self.standardize(j, raw),
                Some(&raw) if j < columns => raw,
                _ => 0.0,
            };
            node.set_activation(value);
        }
        &self.input_layer
    }

    /// 历史默认入口：等价于 `get_input_layer(row_index, column_count, Split::Train)`
    #[deprecated(note = "请改用显式指定划分的 get_input_layer")]
    pub fn get_input_layer_default(&mut self, row_index: usize, column_count: usize) -> &Layer {
        self.get_input_layer(row_index, column_count, Split::Train)
    }

    // ========== 标准化 ==========

    /// 由训练集计算每个特征的 x_min / x_max / x_range（仅一次）
    pub(super) fn compute_standardization(&mut self) {
        let features = self.input_feature_count;
        self.x_min = vec![f32::INFINITY; features];
        self.x_max = vec![f32::NEG_INFINITY; features];

        if let Some(dataset) = self.dataset.as_deref() {
            for i in 0..dataset.row_count(Split::Train) {
                let Some(row) = dataset.row(Split::Train, i) else {
                    continue;
                };
                for (j, &v) in row.iter().take(features).enumerate() {
                    self.x_min[j] = self.x_min[j].min(v);
                    self.x_max[j] = self.x_max[j].max(v);
                }
            }
        }

        for j in 0..features {
            if !self.x_min[j].is_finite() || !self.x_max[j].is_finite() {
                self.x_min[j] = 0.0;
                self.x_max[j] = 0.0;
            }
        }
        self.x_range = self
            .x_min
            .iter()
            .zip(&self.x_max)
            .map(|(min, max)| max - min)
            .collect();
    }

    pub const fn is_standardized(&self) -> bool {
        self.standardize
    }

    /// (x_min, x_max, x_range)
    pub fn standardization_bounds(&self) -> (&[f32], &[f32], &[f32]) {
        (&self.x_min, &self.x_max, &self.x_range)
    }

    /// (v - x_min) / x_range；零区间映射为 0，未计算边界的特征原样返回
    pub fn standardize(&self, feature: usize, value: f32) -> f32 {
        match (self.x_min.get(feature), self.x_range.get(feature)) {
            (Some(&min), Some(&range)) if range != 0.0 => (value - min) / range,
            (Some(_), Some(_)) => 0.0,
            _ => value,
        }
    }

    /// standardize 的逆变换；零区间返回 x_min
    pub fn unstandardize(&self, feature: usize, value: f32) -> f32 {
        match (self.x_min.get(feature), self.x_range.get(feature)) {
            (Some(&min), Some(&range)) => value * range + min,
            _ => value,
        }
    }

    /// 对当前输入层节点值就地做标准化
    pub fn standardize_weights(&mut self) {
        for (j, node) in self.input_layer.children().iter().enumerate() {
            node.set_activation(self.standardize(j, node.activation()));
        }
    }
}
