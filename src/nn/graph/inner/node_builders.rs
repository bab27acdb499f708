/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : GraphInner 节点构建方法（new_*_node）
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::raw_node::{
    BatchNorm2d, Conv2d, Dropout, Flatten, Input, L2Normalize, Parameter, ReLU,
    SampleStandardize, State, Sum,
};
use crate::nn::nodes::{NodeHandle, NodeType};
use crate::tensor::Tensor;

impl GraphInner {
    /// 添加节点到图中，并登记其与父节点之间的正反向边
    fn add_node_to_list(
        &mut self,
        raw_node: impl Into<NodeType>,
        name: Option<&str>,
        node_type: &str,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let node_name = self.generate_valid_new_node_name(name.unwrap_or(""), node_type)?;
        let node_id = self.generate_valid_node_id();

        for &parent_id in parents {
            self.forward_edges
                .entry(parent_id)
                .or_default()
                .push(node_id);
        }
        self.backward_edges
            .entry(node_id)
            .or_default()
            .extend(parents);

        self.nodes
            .insert(node_id, NodeHandle::new(node_id, &node_name, raw_node));
        Ok(node_id)
    }

    // ========== 叶子节点 ==========

    /// 创建输入节点并设置数据
    pub fn new_input_node(
        &mut self,
        value: &Tensor,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node_id = self.add_node_to_list(Input::new(value.shape()), name, "input", &[])?;
        self.set_node_value(node_id, value)?;
        Ok(node_id)
    }

    /// 创建参数节点（只声明形状，尚未初始化）
    pub fn new_parameter_node(
        &mut self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Parameter::new(shape)?;
        self.add_node_to_list(node, name, "parameter", &[])
    }

    /// 创建状态节点并设置初始值
    pub fn new_state_node(
        &mut self,
        value: &Tensor,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node_id = self.add_node_to_list(State::new(value.shape()), name, "state", &[])?;
        self.set_node_value(node_id, value)?;
        Ok(node_id)
    }

    // ========== 算子节点 ==========

    pub fn new_conv2d_node(
        &mut self,
        input_id: NodeId,
        kernel_id: NodeId,
        bias_id: Option<NodeId>,
        stride: (usize, usize),
        padding: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let mut parents_ids = vec![input_id, kernel_id];
        parents_ids.extend(bias_id);
        let node = Conv2d::new(&self.get_nodes(&parents_ids)?, stride, padding)?;
        self.add_node_to_list(node, name, "conv2d", &parents_ids)
    }

    /// `affine_ids` 为 (gamma, beta)，None 表示不带仿射变换
    #[allow(clippy::too_many_arguments)]
    pub fn new_batch_norm2d_node(
        &mut self,
        input_id: NodeId,
        running_mean_id: NodeId,
        running_var_id: NodeId,
        affine_ids: Option<(NodeId, NodeId)>,
        eps: f32,
        momentum: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let mut parents_ids = vec![input_id, running_mean_id, running_var_id];
        if let Some((gamma_id, beta_id)) = affine_ids {
            parents_ids.extend([gamma_id, beta_id]);
        }
        let node = BatchNorm2d::new(&self.get_nodes(&parents_ids)?, eps, momentum)?;
        self.add_node_to_list(node, name, "batch_norm2d", &parents_ids)
    }

    pub fn new_relu_node(
        &mut self,
        parent_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = ReLU::new(&self.get_nodes(&[parent_id])?)?;
        self.add_node_to_list(node, name, "relu", &[parent_id])
    }

    pub fn new_dropout_node(
        &mut self,
        parent_id: NodeId,
        p: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Dropout::new(&self.get_nodes(&[parent_id])?, p)?;
        self.add_node_to_list(node, name, "dropout", &[parent_id])
    }

    pub fn new_flatten_node(
        &mut self,
        parent_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Flatten::new(&self.get_nodes(&[parent_id])?)?;
        self.add_node_to_list(node, name, "flatten", &[parent_id])
    }

    pub fn new_l2_normalize_node(
        &mut self,
        parent_id: NodeId,
        eps: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = L2Normalize::new(&self.get_nodes(&[parent_id])?, eps)?;
        self.add_node_to_list(node, name, "l2_normalize", &[parent_id])
    }

    pub fn new_sample_standardize_node(
        &mut self,
        parent_id: NodeId,
        eps: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = SampleStandardize::new(&self.get_nodes(&[parent_id])?, eps)?;
        self.add_node_to_list(node, name, "sample_standardize", &[parent_id])
    }

    pub fn new_sum_node(
        &mut self,
        parent_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Sum::new(&self.get_nodes(&[parent_id])?)?;
        self.add_node_to_list(node, name, "sum", &[parent_id])
    }
}
