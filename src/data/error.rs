//! 数据加载错误类型定义

use std::path::PathBuf;
use thiserror::Error;

/// 数据加载相关错误
#[derive(Debug, Error)]
pub enum DataError {
    /// 文件未找到
    #[error("文件未找到: {0}")]
    FileNotFound(PathBuf),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 数据集为空
    #[error("数据集为空")]
    Empty,

    /// 行长度不一致
    #[error("第 {row} 行长度不一致: 期望 {expected}, 实际 {got}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// 特征与目标行数不一致
    #[error("特征行数 {features} 与目标行数 {targets} 不一致")]
    RowCountMismatch { features: usize, targets: usize },

    /// 划分比例非法
    #[error("训练集比例须在 (0, 1] 内，实际为 {0}")]
    InvalidSplitRatio(f32),

    /// CSV 解析错误
    #[error("第 {line} 行解析失败: {message}")]
    ParseError { line: usize, message: String },
}
