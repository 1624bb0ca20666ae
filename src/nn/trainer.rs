/*
 * @Author       : 老董
 * @Date         : 2026-02-09
 * @Description  : 训练驱动
 *
 * 每一行：dropout → 物化输入层 → 前向 → 反向（排队增量）→ 更新上下文 → 记录时间状态。
 * 每 batch_size 行按平均提交一次增量；循环网络每 sequence_length 行重置一次上下文。
 * 每次运行都以 attach 开始、以 detach 结束（即使中途出错）。
 */

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::builder::LayerBuilder;
use super::error::TrainError;
use super::info::TrainingInfo;
use super::layer::{Layer, LayerType};
use super::node::ApplyMode;
use crate::data::{DataInput, Split};

/// 一次训练的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    /// 每个回合的平均单行损失
    pub epoch_losses: Vec<f32>,
    /// 处理过的训练行总数
    pub rows_seen: usize,
}

impl TrainReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epoch_losses.last().copied()
    }
}

pub struct Trainer {
    info: TrainingInfo,
    rng: StdRng,
}

impl Trainer {
    pub fn new(info: TrainingInfo) -> Self {
        let rng = info
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self { info, rng }
    }

    pub const fn info(&self) -> &TrainingInfo {
        &self.info
    }

    /// 在 `dataset` 的训练集上训练 `builder`
    pub fn train(
        &mut self,
        builder: &mut LayerBuilder,
        dataset: Arc<dyn DataInput>,
    ) -> Result<TrainReport, TrainError> {
        check_compatible(builder, dataset.as_ref())?;
        let rows = dataset.row_count(Split::Train);
        if rows == 0 {
            return Err(TrainError::NoRows {
                split: format!("{:?}", Split::Train),
            });
        }

        builder.attach_data_input(Arc::clone(&dataset));
        let report = self.run_epochs(builder, dataset.as_ref(), rows);
        builder.detach_data_input();
        Ok(report)
    }

    /// 在指定划分上前向求值（不更新权重），返回平均单行损失
    pub fn evaluate(
        &self,
        builder: &mut LayerBuilder,
        dataset: Arc<dyn DataInput>,
        split: Split,
    ) -> Result<f32, TrainError> {
        check_compatible(builder, dataset.as_ref())?;
        let rows = dataset.row_count(split);
        if rows == 0 {
            return Err(TrainError::NoRows {
                split: format!("{split:?}"),
            });
        }

        builder.attach_data_input(Arc::clone(&dataset));
        let features = builder.input_feature_count();
        let sequence_length = self.sequence_length(builder);
        let mut total = 0.0;
        for row in 0..rows {
            let step = row % sequence_length;
            if builder.net_type().is_recurrent() && step == 0 {
                builder.reset_context_state(0.0);
            }
            builder.get_input_layer(row, features, split);
            let outputs = builder.forward();
            let targets = dataset.target(split, row).unwrap_or_default();
            total += squared_error(&outputs, targets);
            builder.update_context_from_hidden_activations();
        }
        builder.detach_data_input();

        let loss = total / rows as f32;
        tracing::info!(?split, rows, loss, "评估完成");
        Ok(loss)
    }

    fn run_epochs(
        &mut self,
        builder: &mut LayerBuilder,
        dataset: &dyn DataInput,
        rows: usize,
    ) -> TrainReport {
        let recurrent = builder.net_type().is_recurrent();
        let sequence_length = self.sequence_length(builder);
        builder.ensure_time_steps(sequence_length);
        let batch = self.info.batch_size.max(1);
        let hidden: Vec<usize> = builder
            .layers()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.kind() == LayerType::Hidden)
            .map(|(i, _)| i)
            .collect();

        let mut report = TrainReport::default();
        for epoch in 0..self.info.epochs {
            let mut total = 0.0;
            let mut pending = 0;
            for row in 0..rows {
                let step = row % sequence_length;
                if recurrent && step == 0 {
                    builder.reset_context_state(0.0);
                }
                total += self.train_row(builder, dataset, row, step, &hidden);
                pending += 1;
                if pending == batch {
                    builder.apply_deltas(ApplyMode::Averaged { batch });
                    pending = 0;
                }
            }
            if pending > 0 {
                builder.apply_deltas(ApplyMode::Averaged { batch: pending });
            }

            let loss = total / rows as f32;
            report.epoch_losses.push(loss);
            report.rows_seen += rows;
            if epoch == 0 || (epoch + 1) % 10 == 0 || epoch + 1 == self.info.epochs {
                tracing::info!(epoch = epoch + 1, loss, "训练回合完成");
            } else {
                tracing::debug!(epoch = epoch + 1, loss, "训练回合完成");
            }
        }
        report
    }

    fn train_row(
        &mut self,
        builder: &mut LayerBuilder,
        dataset: &dyn DataInput,
        row: usize,
        step: usize,
        hidden: &[usize],
    ) -> f32 {
        let p = self.info.dropout;
        if p > 0.0 {
            for &layer in hidden {
                let mask = builder.dropout_mask(layer, p, &mut self.rng);
                builder.scramble_dropout(layer, p, Some(&mask));
            }
        }

        let features = builder.input_feature_count();
        builder.get_input_layer(row, features, Split::Train);
        builder.forward();
        let targets = dataset.target(Split::Train, row).unwrap_or_default();
        // 反向使用的上下文须与前向一致，因此先反向再更新上下文
        let loss = builder.backward(targets, self.info.learning_rate, self.info.momentum);
        builder.update_context_from_hidden_activations();
        builder.record_time_state(step);

        if p > 0.0 {
            builder.clear_dropout();
        }
        loss
    }

    fn sequence_length(&self, builder: &LayerBuilder) -> usize {
        if builder.net_type().is_recurrent() {
            self.info.sequence_length.max(1)
        } else {
            1
        }
    }
}

fn check_compatible(builder: &LayerBuilder, dataset: &dyn DataInput) -> Result<(), TrainError> {
    if !builder.is_built() {
        return Err(TrainError::NotBuilt);
    }
    if dataset.feature_count() != builder.input_feature_count() {
        return Err(TrainError::DatasetMismatch(format!(
            "拓扑有 {} 个输入，数据集有 {} 个特征",
            builder.input_feature_count(),
            dataset.feature_count()
        )));
    }
    let outputs = builder.output_layer().map_or(0, Layer::len);
    if dataset.target_count() != outputs {
        return Err(TrainError::DatasetMismatch(format!(
            "输出层有 {outputs} 个节点，数据集有 {} 个目标列",
            dataset.target_count()
        )));
    }
    Ok(())
}

/// ½Σ(y - t)²；缺失的目标不计入
fn squared_error(outputs: &[f32], targets: &[f32]) -> f32 {
    outputs
        .iter()
        .zip(targets)
        .map(|(y, t)| 0.5 * (y - t) * (y - t))
        .sum()
}
