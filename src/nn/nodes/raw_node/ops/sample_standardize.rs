/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : 按样本标准化节点：y = (x - mean) / (std + eps)
 *
 * 每个样本（第0维以外的全部元素）单独统计，std 为无偏估计（与 torch.std 默认一致）。
 * 均值与标准差视作常数（detached），反向传播时只按分母缩放上游梯度。
 */

use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

pub(crate) struct SampleStandardize {
    shape: Vec<usize>,
    eps: f32,
    /// 每个样本的分母 std + eps
    denominators: Vec<f32>,
}

impl SampleStandardize {
    pub(crate) fn new(parents: &[&NodeHandle], eps: f32) -> Result<Self, GraphError> {
        check_parents_count(parents, &[1], "SampleStandardize")?;
        let shape = parents[0].value_expected_shape();
        if shape.is_empty() {
            return Err(GraphError::InvalidOperation(
                "SampleStandardize 输入至少需要1维（batch维）".to_string(),
            ));
        }
        Ok(Self {
            shape: shape.to_vec(),
            eps,
            denominators: Vec::new(),
        })
    }

    fn sample_size(&self) -> usize {
        self.shape.iter().skip(1).product::<usize>().max(1)
    }
}

impl TraitNode for SampleStandardize {
    fn type_name(&self) -> &'static str {
        "SampleStandardize"
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
        let means = input.mean_per_sample().to_vec();
        self.denominators = input
            .std_per_sample(true)
            .data_as_slice()
            .iter()
            .map(|std| std + self.eps)
            .collect();

        let data = input
            .data_as_slice()
            .chunks(self.sample_size())
            .zip(means.iter().zip(&self.denominators))
            .flat_map(|(sample, (&mean, &denominator))| {
                sample.iter().map(move |x| (x - mean) / denominator)
            })
            .collect::<Vec<_>>();
        Ok(Tensor::new(&data, &self.shape))
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(no_grad_to_parent(self.type_name(), parent_index));
        }
        let data = upstream_grad
            .data_as_slice()
            .chunks(self.sample_size())
            .zip(&self.denominators)
            .flat_map(|(sample, &denominator)| sample.iter().map(move |g| g / denominator))
            .collect::<Vec<_>>();
        Ok(Tensor::new(&data, &self.shape))
    }
}
