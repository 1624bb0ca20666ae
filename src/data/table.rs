/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : TableDataset - 内存表格数据集，实现 DataInput
 *
 * 行按顺序划分：前 train_rows 行为训练集，其余为测试集。
 */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use super::{DataError, DataInput, Split};

/// 内存表格数据集
///
/// # 示例
/// ```ignore
/// let features = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
/// let targets = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
/// let dataset = TableDataset::from_rows(&features, &targets, 1.0)?;
/// assert_eq!(dataset.row_count(Split::Train), 4);
/// ```
#[derive(Debug, Clone)]
pub struct TableDataset {
    /// 特征 [N, feature_count]
    features: Array2<f32>,
    /// 目标 [N, target_count]
    targets: Array2<f32>,
    /// 训练集行数
    train_rows: usize,
}

impl TableDataset {
    /// 由特征/目标矩阵创建数据集
    ///
    /// # 参数
    /// - `features`: 特征矩阵，第一维为样本数
    /// - `targets`: 目标矩阵，第一维为样本数（须与 features 一致）
    /// - `train_fraction`: 训练集比例，取值 (0, 1]
    pub fn new(
        features: Array2<f32>,
        targets: Array2<f32>,
        train_fraction: f32,
    ) -> Result<Self, DataError> {
        let n = features.nrows();
        if n == 0 {
            return Err(DataError::Empty);
        }
        if targets.nrows() != n {
            return Err(DataError::RowCountMismatch {
                features: n,
                targets: targets.nrows(),
            });
        }
        if !(train_fraction > 0.0 && train_fraction <= 1.0) {
            return Err(DataError::InvalidSplitRatio(train_fraction));
        }
        let train_rows = ((n as f32 * train_fraction).round() as usize).clamp(1, n);

        // 统一为标准布局，保证按行切片连续
        Ok(Self {
            features: features.as_standard_layout().into_owned(),
            targets: targets.as_standard_layout().into_owned(),
            train_rows,
        })
    }

    /// 由按行给出的特征/目标创建数据集
    pub fn from_rows(
        features: &[Vec<f32>],
        targets: &[Vec<f32>],
        train_fraction: f32,
    ) -> Result<Self, DataError> {
        let features = rows_to_array(features)?;
        let targets = rows_to_array(targets)?;
        Self::new(features, targets, train_fraction)
    }

    /// 从 CSV 读取数据集，最后 `target_columns` 列为目标
    ///
    /// 空行会被跳过；`has_header` 为真时丢弃第一行。
    pub fn from_csv_reader<R: BufRead>(
        reader: R,
        target_columns: usize,
        has_header: bool,
        train_fraction: f32,
    ) -> Result<Self, DataError> {
        let mut features = Vec::new();
        let mut targets = Vec::new();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            if (has_header && line_idx == 0) || line.trim().is_empty() {
                continue;
            }
            let values = line
                .split(',')
                .map(|field| {
                    field.trim().parse::<f32>().map_err(|e| DataError::ParseError {
                        line: line_idx + 1,
                        message: format!("无法解析 `{}`: {e}", field.trim()),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() <= target_columns {
                return Err(DataError::ParseError {
                    line: line_idx + 1,
                    message: format!(
                        "列数 {} 不足以容纳 {} 个目标列",
                        values.len(),
                        target_columns
                    ),
                });
            }
            let split_at = values.len() - target_columns;
            features.push(values[..split_at].to_vec());
            targets.push(values[split_at..].to_vec());
        }

        Self::from_rows(&features, &targets, train_fraction)
    }

    /// 从 CSV 文件读取数据集
    pub fn from_csv_path<P: AsRef<Path>>(
        path: P,
        target_columns: usize,
        has_header: bool,
        train_fraction: f32,
    ) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Self::from_csv_reader(reader, target_columns, has_header, train_fraction)
    }

    /// 总样本数
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    /// 检查数据集是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 特征矩阵引用
    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// 目标矩阵引用
    pub fn targets(&self) -> &Array2<f32> {
        &self.targets
    }

    fn absolute_index(&self, split: Split, index: usize) -> Option<usize> {
        match split {
            Split::Train => (index < self.train_rows).then_some(index),
            Split::Test => {
                let absolute = self.train_rows.checked_add(index)?;
                (absolute < self.len()).then_some(absolute)
            }
        }
    }
}

impl DataInput for TableDataset {
    fn feature_count(&self) -> usize {
        self.features.ncols()
    }

    fn target_count(&self) -> usize {
        self.targets.ncols()
    }

    fn row_count(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train_rows,
            Split::Test => self.len() - self.train_rows,
        }
    }

    fn row(&self, split: Split, index: usize) -> Option<&[f32]> {
        let i = self.absolute_index(split, index)?;
        row_slice(&self.features, i)
    }

    fn target(&self, split: Split, index: usize) -> Option<&[f32]> {
        let i = self.absolute_index(split, index)?;
        row_slice(&self.targets, i)
    }
}

fn row_slice(array: &Array2<f32>, row: usize) -> Option<&[f32]> {
    let width = array.ncols();
    array
        .as_slice()
        .map(|data| &data[row * width..(row + 1) * width])
}

fn rows_to_array(rows: &[Vec<f32>]) -> Result<Array2<f32>, DataError> {
    let width = rows.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(rows.len() * width);
    for (row, values) in rows.iter().enumerate() {
        if values.len() != width {
            return Err(DataError::RowLengthMismatch {
                row,
                expected: width,
                got: values.len(),
            });
        }
        data.extend_from_slice(values);
    }
    Array2::from_shape_vec((rows.len(), width), data).map_err(|e| DataError::ParseError {
        line: 0,
        message: e.to_string(),
    })
}
