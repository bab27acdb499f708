use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

/// ReLU 激活：y = max(0, x)，x = 0 处的导数取 0
pub(crate) struct ReLU {
    shape: Vec<usize>,
}

impl ReLU {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        check_parents_count(parents, &[1], "ReLU")?;
        Ok(Self {
            shape: parents[0].value_expected_shape().to_vec(),
        })
    }
}

impl TraitNode for ReLU {
    fn type_name(&self) -> &'static str {
        "ReLU"
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
        Ok(input.where_with_f32(|x| x > 0.0, |x| x, |_| 0.0))
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(no_grad_to_parent(self.type_name(), parent_index));
        }
        let input = parent_value(parents, 0, self.type_name())?;
        let mask = input.where_with_f32(|x| x > 0.0, |_| 1.0, |_| 0.0);
        Ok(upstream_grad * &mask)
    }
}
