/*
 * State 节点：由执行引擎维护、不参与训练的缓冲区（如BatchNorm的running_mean/running_var）
 *
 * 与 Parameter 节点的区别：
 *   - Parameter：可训练参数，接收梯度
 *   - State：值只在训练模式的前向传播中被算子写回，不接收梯度
 *
 * 语义：State 是"要记的东西"，不是"要学的东西"
 */

use super::{ForwardContext, NodeHandle, TraitNode, leaf_has_no_parents};
use crate::nn::GraphError;
use crate::tensor::Tensor;

pub(crate) struct State {
    shape: Vec<usize>,
}

impl State {
    pub(crate) fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
        }
    }
}

impl TraitNode for State {
    fn type_name(&self) -> &'static str {
        "State"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(
        &mut self,
        _parents: &[&NodeHandle],
        _ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError> {
        Err(leaf_has_no_parents(self.type_name()))
    }

    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        _parents: &[&NodeHandle],
        _upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        Err(leaf_has_no_parents(self.type_name()))
    }
}
