/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 激活函数
 *
 * ActivationType 是拓扑描述里可序列化的选择项；
 * Activation 是实际参与计算的函数对象（enum_dispatch 静态分发）。
 */

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// 拓扑描述中的激活函数选择
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationType {
    #[default]
    Sigmoid,
    Tanh,
    Relu,
    LeakyRelu {
        alpha: f32,
    },
    Linear,
}

impl ActivationType {
    /// 是否为饱和型激活（影响 Xavier 初始化的增益）
    pub const fn is_saturating(&self) -> bool {
        matches!(self, Self::Sigmoid | Self::Tanh | Self::Linear)
    }
}

#[enum_dispatch]
pub trait ActivationFn {
    /// f(net)
    fn activate(&self, net: f32) -> f32;

    /// f'(net)；`output` 为已计算的 f(net)，便于 sigmoid/tanh 复用
    fn derivative(&self, net: f32, output: f32) -> f32;
}

#[derive(Debug, Clone, Copy)]
pub struct Sigmoid;

#[derive(Debug, Clone, Copy)]
pub struct Tanh;

#[derive(Debug, Clone, Copy)]
pub struct Relu;

#[derive(Debug, Clone, Copy)]
pub struct LeakyRelu {
    pub alpha: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Linear;

#[enum_dispatch(ActivationFn)]
#[derive(Debug, Clone, Copy)]
pub enum Activation {
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    Relu(Relu),
    LeakyRelu(LeakyRelu),
    Linear(Linear),
}

impl From<ActivationType> for Activation {
    fn from(kind: ActivationType) -> Self {
        match kind {
            ActivationType::Sigmoid => Sigmoid.into(),
            ActivationType::Tanh => Tanh.into(),
            ActivationType::Relu => Relu.into(),
            ActivationType::LeakyRelu { alpha } => LeakyRelu { alpha }.into(),
            ActivationType::Linear => Linear.into(),
        }
    }
}

impl ActivationFn for Sigmoid {
    fn activate(&self, net: f32) -> f32 {
        sigmoid(net)
    }

    fn derivative(&self, _net: f32, output: f32) -> f32 {
        output * (1.0 - output)
    }
}

impl ActivationFn for Tanh {
    fn activate(&self, net: f32) -> f32 {
        net.tanh()
    }

    fn derivative(&self, _net: f32, output: f32) -> f32 {
        1.0 - output * output
    }
}

impl ActivationFn for Relu {
    fn activate(&self, net: f32) -> f32 {
        net.max(0.0)
    }

    fn derivative(&self, net: f32, _output: f32) -> f32 {
        if net > 0.0 { 1.0 } else { 0.0 }
    }
}

impl ActivationFn for LeakyRelu {
    fn activate(&self, net: f32) -> f32 {
        if net > 0.0 { net } else { self.alpha * net }
    }

    fn derivative(&self, net: f32, _output: f32) -> f32 {
        if net > 0.0 { 1.0 } else { self.alpha }
    }
}

impl ActivationFn for Linear {
    fn activate(&self, net: f32) -> f32 {
        net
    }

    fn derivative(&self, _net: f32, _output: f32) -> f32 {
        1.0
    }
}

/// 门控单元内部使用的 sigmoid
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
