/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : 节点句柄：在原始节点（计算规则）之外保存节点的id、名称、值与梯度
 */

use std::fmt;

use super::raw_node::{NodeType, TraitNode};
use crate::nn::GraphError;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

pub(crate) struct NodeHandle {
    id: NodeId,
    name: String,
    raw_node: NodeType,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    /// 被detach的节点在反向传播时不再向父节点传递梯度
    is_detached: bool,
    last_forward_pass_id: u64,
}

impl NodeHandle {
    pub(in crate::nn) fn new<T: Into<NodeType>>(id: NodeId, name: &str, raw_node: T) -> Self {
        Self {
            id,
            name: name.to_string(),
            raw_node: raw_node.into(),
            value: None,
            grad: None,
            is_detached: false,
            last_forward_pass_id: 0,
        }
    }

    pub(in crate::nn) const fn id(&self) -> NodeId {
        self.id
    }

    pub(in crate::nn) fn name(&self) -> &str {
        &self.name
    }

    pub(in crate::nn) const fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub(in crate::nn) fn node_type_mut(&mut self) -> &mut NodeType {
        &mut self.raw_node
    }

    pub(in crate::nn) fn type_name(&self) -> &'static str {
        self.raw_node.type_name()
    }

    pub(in crate::nn) fn value_expected_shape(&self) -> &[usize] {
        self.raw_node.value_expected_shape()
    }

    /// 输入、参数、状态节点的值由外部设置，其余节点的值只能由前向传播算出
    pub(in crate::nn) const fn is_leaf(&self) -> bool {
        matches!(
            self.raw_node,
            NodeType::Input(_) | NodeType::Parameter(_) | NodeType::State(_)
        )
    }

    // ========== 值 ==========

    pub(in crate::nn) const fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    pub(in crate::nn) const fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// 手动设置叶子节点的值，形状必须与节点声明的形状完全一致
    pub(in crate::nn) fn set_value(&mut self, value: &Tensor) -> Result<(), GraphError> {
        if !self.is_leaf() {
            return Err(GraphError::InvalidOperation(format!(
                "{self}的值只能由前向传播计算，不能手动设置"
            )));
        }
        if value.shape() != self.value_expected_shape() {
            return Err(GraphError::ShapeMismatch {
                expected: self.value_expected_shape().to_vec(),
                got: value.shape().to_vec(),
                message: format!("为{self}设置的值形状不符"),
            });
        }
        self.value = Some(value.clone());
        Ok(())
    }

    /// 由图在前向传播后写入计算结果（形状已由节点自身保证）
    pub(in crate::nn) fn set_value_unchecked(&mut self, value: Tensor) {
        self.value = Some(value);
    }

    pub(in crate::nn) fn clear_value(&mut self) {
        self.value = None;
    }

    // ========== 梯度 ==========

    pub(in crate::nn) const fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    pub(in crate::nn) fn set_grad(&mut self, grad: Option<Tensor>) {
        self.grad = grad;
    }

    /// 将新梯度累加到已有梯度上（没有则直接存入）
    pub(in crate::nn) fn accumulate_grad(&mut self, grad: Tensor) {
        self.grad = Some(match self.grad.take() {
            Some(existing) => existing + grad,
            None => grad,
        });
    }

    // ========== 状态标记 ==========

    pub(in crate::nn) const fn is_detached(&self) -> bool {
        self.is_detached
    }

    pub(in crate::nn) fn set_detached(&mut self, detached: bool) {
        self.is_detached = detached;
    }

    pub(in crate::nn) const fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub(in crate::nn) fn set_last_forward_pass_id(&mut self, pass_id: u64) {
        self.last_forward_pass_id = pass_id;
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "节点[id={}, name={}, type={}]",
            self.id.0,
            self.name,
            self.type_name()
        )
    }
}
