use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

/// 全局求和节点：把所有元素加成形状 [1, 1] 的标量，常用来构造标量损失
pub(crate) struct Sum {
    shape: Vec<usize>,
    parent_shape: Vec<usize>,
}

impl Sum {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        check_parents_count(parents, &[1], "Sum")?;
        Ok(Self {
            shape: vec![1, 1],
            parent_shape: parents[0].value_expected_shape().to_vec(),
        })
    }
}

impl TraitNode for Sum {
    fn type_name(&self) -> &'static str {
        "Sum"
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
        Ok(Tensor::new(&[input.sum()], &self.shape))
    }

    /// 每个元素的梯度都等于上游（标量）梯度
    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(no_grad_to_parent(self.type_name(), parent_index));
        }
        let upstream = upstream_grad.get_data_number().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "Sum 节点的上游梯度必须是标量，得到形状{:?}",
                upstream_grad.shape()
            ))
        })?;
        Ok(Tensor::full(upstream, &self.parent_shape))
    }
}
