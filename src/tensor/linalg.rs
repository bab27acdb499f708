/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : 正交矩阵初始化（与 torch.nn.init.orthogonal_ 的行为一致）
 *
 * 把形状[rows, ...]视作 rows × cols 矩阵（cols 为其余维度之积）：
 * 1. 采样标准正态矩阵，rows < cols 时先转置；
 * 2. QR 分解，Q 的每一列乘以 R 对应对角元的符号（使分布均匀）；
 * 3. 必要时转置回来，乘以 gain，再重塑为目标形状。
 */

use nalgebra as na;
use rand::rngs::StdRng;

use super::Tensor;
use crate::errors::{ComparisonOperator, TensorError};

impl Tensor {
    /// 创建一个（半）正交张量
    ///
    /// 结果视作 rows × cols 矩阵 W 时：rows ≤ cols 则 W·Wᵀ = gain²·I，否则 Wᵀ·W = gain²·I
    pub fn orthogonal_with_rng(
        shape: &[usize],
        gain: f32,
        rng: &mut StdRng,
    ) -> Result<Self, TensorError> {
        if shape.len() < 2 {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "正交初始化的张量维数".to_string(),
                operator: ComparisonOperator::GreaterOrEqual,
                threshold: 2,
            });
        }

        let rows = shape[0];
        let cols = shape[1..].iter().product::<usize>();
        let flat = Self::normal_with_rng(0.0, 1.0, &[rows, cols], rng);

        // 行优先的 rows×cols 数据按列优先读入，恰好得到其转置 cols×rows
        let transposed = rows < cols;
        let matrix = if transposed {
            na::DMatrix::from_column_slice(cols, rows, flat.data_as_slice())
        } else {
            na::DMatrix::from_row_slice(rows, cols, flat.data_as_slice())
        };

        let qr = matrix.qr();
        let r = qr.r();
        let mut q = qr.q();
        for (j, mut column) in q.column_iter_mut().enumerate() {
            // torch 里 sign(0) = 0 会整列置零，这里按正号处理
            if r[(j, j)] < 0.0 {
                column.neg_mut();
            }
        }

        let q = if transposed { q.transpose() } else { q };
        let data = (0..rows)
            .flat_map(|i| (0..cols).map(move |j| (i, j)))
            .map(|(i, j)| q[(i, j)] * gain)
            .collect::<Vec<_>>();

        Ok(Self::new(&data, shape))
    }
}
