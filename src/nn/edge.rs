/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : Edge - 单条有向带权连接
 */

use std::collections::VecDeque;

/// 动量回看所保留的历史增量条数
pub const DELTA_HISTORY_LEN: usize = 4;

/// 单条入边：权重 + 待提交增量 + 已提交增量的有界历史
///
/// `delta_history` 创建时以一个 0 打底，之后永不为空。
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    id: u64,
    weight: f32,
    pending: f32,
    delta_history: VecDeque<f32>,
}

impl Edge {
    pub fn new(id: u64, weight: f32) -> Self {
        let mut delta_history = VecDeque::with_capacity(DELTA_HISTORY_LEN);
        delta_history.push_back(0.0);
        Self {
            id,
            weight,
            pending: 0.0,
            delta_history,
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// 尚未提交的增量
    pub const fn pending(&self) -> f32 {
        self.pending
    }

    /// 最近一次提交的增量（动量项来源）
    pub fn last_delta(&self) -> f32 {
        self.delta_history.back().copied().unwrap_or(0.0)
    }

    pub fn delta_history(&self) -> &VecDeque<f32> {
        &self.delta_history
    }

    /// 累加一个待提交增量
    pub fn queue(&mut self, delta: f32) {
        self.pending += delta;
    }

    /// 以 `scale` 缩放后提交待定增量，并记入历史
    pub fn commit(&mut self, scale: f32) -> f32 {
        let delta = self.pending * scale;
        self.weight += delta;
        self.pending = 0.0;
        self.delta_history.push_back(delta);
        while self.delta_history.len() > DELTA_HISTORY_LEN {
            self.delta_history.pop_front();
        }
        delta
    }

    /// 丢弃待定增量与历史（历史重新以 0 打底）
    pub fn reset_deltas(&mut self) {
        self.pending = 0.0;
        self.delta_history.clear();
        self.delta_history.push_back(0.0);
    }
}
