//! # Only NN
//!
//! `only_nn` 是一个纯 rust 实现的分层神经网络图引擎：
//! 由拓扑描述（[`nn::NNInfo`]）与表格数据集（[`data::DataInput`]）构建
//! 前馈、RNN、GRU、LSTM 网络，逐层前向/反向传播训练，并以二进制文件保存/恢复权重。
//!
//! ```ignore
//! use std::sync::Arc;
//! use only_nn::data::TableDataset;
//! use only_nn::nn::{LayerBuilder, NNInfo, NetType, Trainer};
//!
//! let info = NNInfo::load("xor.json")?;
//! let dataset = Arc::new(TableDataset::from_rows(&features, &targets, 1.0)?);
//! let mut builder = LayerBuilder::new();
//! builder.build(&info, dataset.clone(), NetType::FeedForward, false)?;
//! let report = Trainer::new(info.training.clone()).train(&mut builder, dataset)?;
//! builder.save_state("xor")?;
//! ```

pub mod data;
pub mod nn;
