/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : GraphInner 核心操作 + 前向传播
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{ForwardContext, NodeHandle, NodeType, TraitNode};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

impl GraphInner {
    // ========== 创建 ==========

    /// 创建一个随机种子来自系统熵的计算图
    pub fn new() -> Self {
        Self::with_rng("default_graph", StdRng::from_entropy())
    }

    /// 创建一个带固定种子的计算图（确保可重复性）
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_rng("default_graph", StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: &str, rng: StdRng) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            forward_edges: HashMap::new(),
            backward_edges: HashMap::new(),
            last_forward_pass_id: 0,
            next_id: 0,
            is_eval_mode: false,
            rng,
        }
    }

    // ========== 基础访问器 ==========

    /// 设置/重置图的随机种子
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub(in crate::nn) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        let mut ids = self.nodes.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::nn) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<&NodeHandle>, GraphError> {
        ids.iter().map(|&id| self.get_node(id)).collect()
    }

    pub fn get_node_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        // 先检查节点是否存在
        let _ = self.get_node(id)?;
        Ok(self.backward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_children(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let _ = self.get_node(id)?;
        Ok(self.forward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(id)?.name())
    }

    pub fn get_node_type_name(&self, id: NodeId) -> Result<&'static str, GraphError> {
        Ok(self.get_node(id)?.type_name())
    }

    pub fn get_node_expected_shape(&self, id: NodeId) -> Result<Vec<usize>, GraphError> {
        Ok(self.get_node(id)?.value_expected_shape().to_vec())
    }

    pub fn has_node_value(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.get_node(id)?.has_value())
    }

    pub fn get_node_value(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(id)?.value())
    }

    /// 设置叶子节点（输入/参数/状态）的值
    pub fn set_node_value(&mut self, id: NodeId, value: &Tensor) -> Result<(), GraphError> {
        self.get_node_mut(id)?.set_value(value)
    }

    pub fn get_node_grad(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        let node = self.get_node(id)?;
        // 输入节点不应该有梯度
        if let NodeType::Input(_) = node.node_type() {
            return Err(GraphError::InvalidOperation(format!(
                "输入{node}不应该有梯度"
            )));
        }
        Ok(node.grad())
    }

    /// 所有参数（可训练）节点，按创建顺序排列
    pub fn get_trainable_nodes(&self) -> Vec<NodeId> {
        self.nodes_of(|node| matches!(node.node_type(), NodeType::Parameter(_)))
    }

    /// 所有状态（不可训练的缓冲区）节点，按创建顺序排列
    pub fn get_state_nodes(&self) -> Vec<NodeId> {
        self.nodes_of(|node| matches!(node.node_type(), NodeType::State(_)))
    }

    pub(in crate::nn::graph) fn nodes_of<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&NodeHandle) -> bool,
    {
        let mut ids = self
            .nodes
            .iter()
            .filter(|(_, node)| predicate(node))
            .map(|(&id, _)| id)
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    // ========== ID/名称生成 ==========

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 生成唯一的节点ID（先递增再返回，所以第一个节点 ID 是 1）
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(
        &self,
        name: &str,
    ) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 前向传播 ==========

    pub fn forward(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        // 失败的前向传播同样占用一个 pass id，已算完的节点下次会被重新计算
        let new_graph_forward_pass_id = self.last_forward_pass_id + 1;
        self.last_forward_pass_id = new_graph_forward_pass_id;
        self.forward_node_internal(node_id, new_graph_forward_pass_id)
    }

    fn forward_node_internal(
        &mut self,
        node_id: NodeId,
        new_graph_forward_pass_id: u64,
    ) -> Result<(), GraphError> {
        let node = self.get_node_mut(node_id)?;

        if node.is_leaf() {
            if node.has_value() {
                node.set_last_forward_pass_id(new_graph_forward_pass_id);
                return Ok(());
            }
            return Err(GraphError::InvalidOperation(format!(
                "{node}没有值：输入/状态节点需先设置值，参数节点需先初始化"
            )));
        }
        if node.last_forward_pass_id() == new_graph_forward_pass_id {
            return Ok(());
        }

        let parents_ids = self.get_node_parents(node_id)?;
        for parent_id in &parents_ids {
            self.forward_node_internal(*parent_id, new_graph_forward_pass_id)?;
        }

        // 暂时把节点移出，以便同时借用其父节点与图的随机数生成器
        let mut node = self
            .nodes
            .remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let computed = self.compute_node_value(&mut node, &parents_ids);
        self.nodes.insert(node_id, node);
        let (value, state_updates) = computed?;

        let node = self.get_node_mut(node_id)?;
        node.set_value_unchecked(value);
        node.set_last_forward_pass_id(new_graph_forward_pass_id);

        for (parent_index, new_value) in state_updates {
            let state_id = parents_ids.get(parent_index).copied().ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "节点{node_id:?}更新了不存在的第{parent_index}个父节点"
                ))
            })?;
            self.set_node_value(state_id, &new_value)?;
        }

        Ok(())
    }

    fn compute_node_value(
        &mut self,
        node: &mut NodeHandle,
        parents_ids: &[NodeId],
    ) -> Result<(Tensor, Vec<(usize, Tensor)>), GraphError> {
        let parents = parents_ids
            .iter()
            .map(|id| self.nodes.get(id).ok_or(GraphError::NodeNotFound(*id)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ctx = ForwardContext {
            is_train: !self.is_eval_mode,
            rng: &mut self.rng,
        };

        let raw_node = node.node_type_mut();
        let value = raw_node.calc_value_by_parents(&parents, &mut ctx)?;
        Ok((value, raw_node.take_state_updates()))
    }
}
