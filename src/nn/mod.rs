/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 分层神经网络图引擎：边/节点/层、拓扑构建、传播、训练与权重持久化
 */

pub mod activation;
mod builder;
mod edge;
mod error;
mod info;
mod init;
mod layer;
mod node;
mod trainer;

pub use activation::{Activation, ActivationFn, ActivationType};
pub use builder::{BuilderState, LEGACY_STATE_DIR, LayerBuilder};
pub use edge::{DELTA_HISTORY_LEN, Edge};
pub use error::{BuildError, ConfigError, LoadError, SaveError, TrainError};
pub use info::{LayerInfo, NNInfo, NetType, TrainingInfo};
pub use init::{InitType, Initializer, POSITIVE_RANDOM_RANGE, RANDOM_RANGE};
pub use layer::{Layer, LayerType};
pub use node::{ApplyMode, Node, NodeState};
pub use trainer::{TrainReport, Trainer};

#[cfg(test)]
mod tests;
