/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : 按行 L2 归一化节点：y = x / sqrt(Σx² + eps)
 *
 * 输入必须是 2D [N, D]，每一行单独归一化。
 * 全零行的输出仍为全零（分母为 sqrt(eps)），不会产生 NaN。
 */

use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

pub(crate) struct L2Normalize {
    shape: Vec<usize>,
    eps: f32,

    // 缓存（用于反向传播）
    output: Option<Tensor>,
    norms: Vec<f32>,
}

impl L2Normalize {
    pub(crate) fn new(parents: &[&NodeHandle], eps: f32) -> Result<Self, GraphError> {
        check_parents_count(parents, &[1], "L2Normalize")?;
        let shape = parents[0].value_expected_shape();
        if shape.len() != 2 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0], // 占位
                got: shape.to_vec(),
                message: format!("L2Normalize 输入必须是 2D [N, D]，得到 {shape:?}"),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            eps,
            output: None,
            norms: Vec::new(),
        })
    }
}

impl TraitNode for L2Normalize {
    fn type_name(&self) -> &'static str {
        "L2Normalize"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(
        &mut self,
        parents: &[&NodeHandle],
        _ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError> {
        let input = parent_value(parents, 0, self.type_name())?;
        let dim = self.shape[1].max(1);
        self.norms = input
            .data_as_slice()
            .chunks(dim)
            .map(|row| (row.iter().map(|x| x * x).sum::<f32>() + self.eps).sqrt())
            .collect();
        let data = input
            .data_as_slice()
            .chunks(dim)
            .zip(&self.norms)
            .flat_map(|(row, &norm)| row.iter().map(move |x| x / norm))
            .collect::<Vec<_>>();
        let output = Tensor::new(&data, &self.shape);
        self.output = Some(output.clone());
        Ok(output)
    }

    /// dx = (g - y·Σ(g⊙y)) / n，其中 n 为该行的范数
    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(no_grad_to_parent(self.type_name(), parent_index));
        }
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| GraphError::ComputationError("缺少前向输出缓存".to_string()))?;

        let dim = self.shape[1].max(1);
        let data = upstream_grad
            .data_as_slice()
            .chunks(dim)
            .zip(output.data_as_slice().chunks(dim))
            .zip(&self.norms)
            .flat_map(|((g_row, y_row), &norm)| {
                let dot = g_row.iter().zip(y_row).map(|(g, y)| g * y).sum::<f32>();
                g_row
                    .iter()
                    .zip(y_row)
                    .map(move |(g, y)| (g - y * dot) / norm)
            })
            .collect::<Vec<_>>();
        Ok(Tensor::new(&data, &self.shape))
    }
}
