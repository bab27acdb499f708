/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : GraphInner VJP 反向传播
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{NodeType, TraitNode};
use crate::tensor::Tensor;
use std::collections::HashSet;

impl GraphInner {
    // ========== VJP 反向传播核心 ==========

    /// 从标量损失节点反向传播，返回损失值
    ///
    /// 损失节点必须已经前向计算过。参数节点的梯度会在多次调用间累加，
    /// 需要时用 `zero_grad` 清空；其余节点的梯度每次调用前都会被重置。
    pub fn backward(&mut self, loss_id: NodeId) -> Result<f32, GraphError> {
        if !self.is_train_mode() {
            log::warn!("在 eval 模式下调用 backward，这通常是误用");
        }

        let loss_node = self.get_node(loss_id)?;
        let loss_value = loss_node.value().ok_or_else(|| {
            GraphError::ComputationError(format!("损失{loss_node}没有值，请先执行 forward"))
        })?;
        let loss_scalar = loss_value.get_data_number().ok_or_else(|| {
            GraphError::InvalidOperation(format!(
                "反向传播要求损失为标量，但得到 {:?}",
                loss_value.shape()
            ))
        })?;
        let loss_grad = Tensor::ones(loss_value.shape());

        self.reset_intermediate_grad();
        self.get_node_mut(loss_id)?.set_grad(Some(loss_grad));

        let topo_order = self.topological_sort_backward(loss_id)?;
        for node_id in topo_order {
            self.propagate_grad_to_parents(node_id)?;
        }

        Ok(loss_scalar)
    }

    /// 清空所有节点（包括参数）的梯度
    pub fn zero_grad(&mut self) {
        for node in self.nodes.values_mut() {
            node.set_grad(None);
        }
    }

    /// 重置中间节点的 grad（参数节点的梯度保留以便累加）
    fn reset_intermediate_grad(&mut self) {
        for node in self.nodes.values_mut() {
            if !matches!(node.node_type(), NodeType::Parameter(_)) {
                node.set_grad(None);
            }
        }
    }

    /// 反向拓扑序：结果节点在前，保证处理某节点时其所有子节点的梯度都已到位
    fn topological_sort_backward(&self, loss_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut visited = HashSet::new();
        let mut post_order = Vec::new();
        self.visit_for_topo(loss_id, &mut visited, &mut post_order)?;
        post_order.reverse();
        Ok(post_order)
    }

    fn visit_for_topo(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        post_order: &mut Vec<NodeId>,
    ) -> Result<(), GraphError> {
        if !visited.insert(node_id) {
            return Ok(());
        }
        for parent_id in self.get_node_parents(node_id)? {
            self.visit_for_topo(parent_id, visited, post_order)?;
        }
        post_order.push(node_id);
        Ok(())
    }

    /// 将梯度从当前节点传播到其父节点
    fn propagate_grad_to_parents(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let parent_ids = self.get_node_parents(node_id)?;
        let parent_grads: Vec<(NodeId, Tensor)> = {
            let node = self.get_node(node_id)?;
            if node.is_detached() || parent_ids.is_empty() {
                return Ok(());
            }
            let Some(upstream_grad) = node.grad() else {
                return Ok(());
            };

            let parents = self.get_nodes(&parent_ids)?;
            let mut grads = Vec::with_capacity(parents.len());
            for (parent_index, parent) in parents.iter().enumerate() {
                // 输入与状态节点不接收梯度
                if matches!(parent.node_type(), NodeType::Input(_) | NodeType::State(_)) {
                    continue;
                }
                let grad = node
                    .node_type()
                    .calc_grad_to_parent(parent_index, &parents, upstream_grad)?;
                grads.push((parent.id(), grad));
            }
            grads
        };

        for (parent_id, grad) in parent_grads {
            self.get_node_mut(parent_id)?.accumulate_grad(grad);
        }
        Ok(())
    }
}
