mod input;
mod ops;
mod parameter;
mod state;

pub(crate) use input::Input;
pub(crate) use ops::*;
pub(crate) use parameter::Parameter;
pub(crate) use state::State;

use enum_dispatch::enum_dispatch;
use rand::rngs::StdRng;

use super::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;

#[enum_dispatch]
pub(crate) enum NodeType {
    Input(Input),
    Parameter(Parameter),
    State(State),
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓算子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Conv2d(Conv2d),
    BatchNorm2d(BatchNorm2d),
    ReLU(ReLU),
    Dropout(Dropout),
    Flatten(Flatten),
    L2Normalize(L2Normalize),
    SampleStandardize(SampleStandardize),
    Sum(Sum),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑算子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

/// 前向传播时节点可用的图级上下文
pub(crate) struct ForwardContext<'a> {
    pub is_train: bool,
    pub rng: &'a mut StdRng,
}

#[enum_dispatch(NodeType)]
pub(crate) trait TraitNode {
    fn type_name(&self) -> &'static str;

    /// 节点创建时就确定的输出形状
    fn value_expected_shape(&self) -> &[usize];

    /// 根据父节点的值计算本节点的值（由Graph保证调用时所有父节点均已有值）
    fn calc_value_by_parents(
        &mut self,
        parents: &[&NodeHandle],
        ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError>;

    /// VJP：给定结果对本节点的梯度，计算结果对第`parent_index`个父节点的梯度
    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError>;

    /// 取出前向传播中产生的、需要写回到某个父节点（State）的新值：(父节点序号, 新值)
    fn take_state_updates(&mut self) -> Vec<(usize, Tensor)> {
        Vec::new()
    }
}

/// 取第`index`个父节点的值，没有值时报计算错误
pub(in crate::nn::nodes) fn parent_value<'a>(
    parents: &[&'a NodeHandle],
    index: usize,
    owner: &str,
) -> Result<&'a Tensor, GraphError> {
    let parent = parents.get(index).ok_or_else(|| {
        GraphError::ComputationError(format!("{owner}缺少第{index}个父节点"))
    })?;
    parent
        .value()
        .ok_or_else(|| GraphError::ComputationError(format!("{owner}的父{parent}没有值")))
}

/// 叶子节点共用：它们既不能由父节点计算，也没有父节点可以传递梯度
pub(in crate::nn::nodes) fn leaf_has_no_parents(type_name: &str) -> GraphError {
    GraphError::InvalidOperation(format!(
        "{type_name}节点没有父节点。不该触及本错误，否则说明crate代码有问题"
    ))
}
