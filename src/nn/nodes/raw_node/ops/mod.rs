mod batch_norm2d;
mod conv2d;
mod dropout;
mod flatten;
mod l2_normalize;
mod relu;
mod sample_standardize;
mod sum;

pub(crate) use batch_norm2d::BatchNorm2d;
pub(crate) use conv2d::Conv2d;
pub(crate) use dropout::Dropout;
pub(crate) use flatten::Flatten;
pub(crate) use l2_normalize::L2Normalize;
pub(crate) use relu::ReLU;
pub(crate) use sample_standardize::SampleStandardize;
pub(crate) use sum::Sum;

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;

/// 校验父节点个数
fn check_parents_count(
    parents: &[&NodeHandle],
    allowed: &[usize],
    type_name: &str,
) -> Result<(), GraphError> {
    if allowed.contains(&parents.len()) {
        Ok(())
    } else {
        Err(GraphError::InvalidOperation(format!(
            "{type_name}节点需要{allowed:?}个父节点，但得到{}个",
            parents.len()
        )))
    }
}

/// 反向传播时请求了不存在（或不接收梯度）的父节点
fn no_grad_to_parent(type_name: &str, parent_index: usize) -> GraphError {
    GraphError::InvalidOperation(format!(
        "{type_name}节点不向第{parent_index}个父节点传递梯度"
    ))
}
