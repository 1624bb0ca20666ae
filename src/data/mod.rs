//! 数据输入模块
//!
//! 引擎只通过 [`DataInput`] trait 以只读方式访问表格数据。
//!
//! # 主要组件
//!
//! - [`Split`]: 训练集/测试集划分
//! - [`DataInput`]: 表格数据源接口（行数、特征数、按划分取行）
//! - [`TableDataset`]: 基于 `ndarray` 的内存表格数据集（可从 CSV 读取）
//! - [`DataError`]: 数据加载错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use only_nn::data::{Split, TableDataset, DataInput};
//!
//! let dataset = TableDataset::from_rows(&features, &targets, 0.8)?;
//! let row = dataset.row(Split::Train, 0);
//! ```

pub mod error;
mod table;


pub use error::DataError;
pub use table::TableDataset;

use serde::{Deserialize, Serialize};

/// 数据集划分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Split {
    /// 训练集（历史默认值）
    #[default]
    Train,
    /// 测试集
    Test,
}

/// 表格数据源
///
/// 引擎从不修改数据源；`LayerBuilder` 只持有其共享引用，
/// 并遵循 attach/detach 约定。
pub trait DataInput: Send + Sync {
    /// 每行特征数
    fn feature_count(&self) -> usize;

    /// 每行目标值个数
    fn target_count(&self) -> usize;

    /// 指定划分的行数
    fn row_count(&self, split: Split) -> usize;

    /// 指定划分中第 `index` 行的特征，越界返回 `None`
    fn row(&self, split: Split, index: usize) -> Option<&[f32]>;

    /// 指定划分中第 `index` 行的目标值，越界返回 `None`
    fn target(&self, split: Split, index: usize) -> Option<&[f32]>;
}
