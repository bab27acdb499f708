/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Dropout 节点（inverted dropout）
 *
 * 训练模式：每个元素以概率 p 置零，保留的元素乘以 1/(1-p)，使期望不变；
 * 评估模式：恒等映射。
 * 掩码由图的随机数生成器产生，固定种子时结果可复现。
 */

use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

pub(crate) struct Dropout {
    shape: Vec<usize>,
    p: f32,
    /// 上次训练模式前向传播使用的（已缩放）掩码，评估模式下为 None
    mask: Option<Tensor>,
}

impl Dropout {
    pub(crate) fn new(parents: &[&NodeHandle], p: f32) -> Result<Self, GraphError> {
        check_parents_count(parents, &[1], "Dropout")?;
        if !(0.0..1.0).contains(&p) {
            return Err(GraphError::InvalidOperation(format!(
                "Dropout 概率必须在 [0, 1) 范围内，得到 {p}"
            )));
        }
        Ok(Self {
            shape: parents[0].value_expected_shape().to_vec(),
            p,
            mask: None,
        })
    }
}

impl TraitNode for Dropout {
    fn type_name(&self) -> &'static str {
        "Dropout"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(
        &mut self,
        parents: &[&NodeHandle],
        ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError> {
        let input = parent_value(parents, 0, self.type_name())?;
        if !ctx.is_train || self.p == 0.0 {
            self.mask = None;
            return Ok(input.clone());
        }

        let keep_prob = 1.0 - self.p;
        let mask = Tensor::bernoulli_with_rng(keep_prob, input.shape(), &mut *ctx.rng) / keep_prob;
        let output = input * &mask;
        self.mask = Some(mask);
        Ok(output)
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(no_grad_to_parent(self.type_name(), parent_index));
        }
        Ok(match &self.mask {
            Some(mask) => upstream_grad * mask,
            None => upstream_grad.clone(),
        })
    }
}
