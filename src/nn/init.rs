/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 权重初始化策略
 */

use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use super::activation::ActivationType;

/// RANDOM 的对称区间半宽
pub const RANDOM_RANGE: f32 = 0.5;
/// POSRAND 的区间上界
pub const POSITIVE_RANDOM_RANGE: f32 = 0.5;

/// 参数初始化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitType {
    /// 全零
    Empty,
    /// U[-0.5, 0.5]
    #[default]
    Random,
    /// U[0, 0.5]
    PosRand,
    /// 零均值，按 1/sqrt(fan_in) 缩放
    Xavier,
    /// Xavier 的非负版本
    PosXavier,
}

/// 单层（或单个门块）的权重采样器
#[derive(Debug, Clone, Copy)]
pub struct Initializer {
    pub scheme: InitType,
    /// 每个门块的输入数（不含偏置）
    pub fan_in: usize,
    pub activation: ActivationType,
}

impl Initializer {
    pub const fn new(scheme: InitType, fan_in: usize, activation: ActivationType) -> Self {
        Self {
            scheme,
            fan_in,
            activation,
        }
    }

    /// Xavier 缩放界：gain / sqrt(fan_in)，整流类激活 gain = sqrt(2)
    pub fn xavier_limit(&self) -> f32 {
        let gain = if self.activation.is_saturating() {
            1.0
        } else {
            std::f32::consts::SQRT_2
        };
        gain / (self.fan_in.max(1) as f32).sqrt()
    }

    /// 采样一个权重
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.scheme {
            InitType::Empty => 0.0,
            InitType::Random => Uniform::new_inclusive(-RANDOM_RANGE, RANDOM_RANGE).sample(rng),
            InitType::PosRand => Uniform::new_inclusive(0.0, POSITIVE_RANDOM_RANGE).sample(rng),
            InitType::Xavier => {
                let limit = self.xavier_limit();
                Uniform::new_inclusive(-limit, limit).sample(rng)
            }
            InitType::PosXavier => Uniform::new_inclusive(0.0, self.xavier_limit()).sample(rng),
        }
    }

    /// 采样 `count` 个权重
    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<f32> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}
