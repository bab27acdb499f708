/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Flatten 节点 - 保留首维度（batch），展平其余维度：[N, d1, d2, ...] → [N, d1*d2*...]
 */

use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

pub(crate) struct Flatten {
    /// 目标形状
    shape: Vec<usize>,
    /// 父节点的原始形状（用于反向传播）
    parent_shape: Vec<usize>,
}

impl Flatten {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        check_parents_count(parents, &[1], "Flatten")?;

        let parent_shape = parents[0].value_expected_shape().to_vec();
        let Some((&first_dim, rest)) = parent_shape.split_first() else {
            return Err(GraphError::InvalidOperation(
                "Flatten 不能作用于标量".to_string(),
            ));
        };
        let shape = vec![first_dim, rest.iter().product()];

        Ok(Self {
            shape,
            parent_shape,
        })
    }
}

impl TraitNode for Flatten {
    fn type_name(&self) -> &'static str {
        "Flatten"
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
        Ok(input.reshape(&self.shape)?)
    }

    /// 将上游梯度 reshape 回父节点形状
    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(no_grad_to_parent(self.type_name(), parent_index));
        }
        Ok(upstream_grad.reshape(&self.parent_shape)?)
    }
}
