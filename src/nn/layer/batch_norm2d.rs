/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : BatchNorm2d 层 - PyTorch 风格 API
 *
 * 对 [N, C, H, W] 输入按通道归一化。running_mean/running_var 是状态节点，
 * 只在训练模式的前向传播中以动量更新；affine 时额外带可训练的 gamma/beta。
 */

use crate::nn::{Graph, GraphError, Init, Module, Var};
use crate::tensor::Tensor;

/// 与 torch.nn.BatchNorm2d 默认值一致
pub const BATCH_NORM_EPS: f32 = 1e-5;
pub const BATCH_NORM_MOMENTUM: f32 = 0.1;

pub struct BatchNorm2d {
    running_mean: Var,
    running_var: Var,
    /// (gamma, beta)
    affine: Option<(Var, Var)>,
    num_features: usize,
}

impl BatchNorm2d {
    /// 创建新的 BatchNorm2d 层
    ///
    /// 状态节点命名为 `{name}_running_mean`、`{name}_running_var`，
    /// affine 参数命名为 `{name}_gamma`（初始为1）、`{name}_beta`（初始为0）
    pub fn new(
        graph: &Graph,
        num_features: usize,
        affine: bool,
        name: &str,
    ) -> Result<Self, GraphError> {
        let running_mean =
            graph.state(&Tensor::zeros(&[num_features]), &format!("{name}_running_mean"))?;
        let running_var =
            graph.state(&Tensor::ones(&[num_features]), &format!("{name}_running_var"))?;
        let affine = if affine {
            Some((
                graph.parameter_with_init(&[num_features], &Init::Ones, &format!("{name}_gamma"))?,
                graph.parameter_with_init(&[num_features], &Init::Zeros, &format!("{name}_beta"))?,
            ))
        } else {
            None
        };

        Ok(Self {
            running_mean,
            running_var,
            affine,
            num_features,
        })
    }

    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let id = x.graph().borrow_mut().new_batch_norm2d_node(
            x.node_id(),
            self.running_mean.node_id(),
            self.running_var.node_id(),
            self.affine
                .as_ref()
                .map(|(gamma, beta)| (gamma.node_id(), beta.node_id())),
            BATCH_NORM_EPS,
            BATCH_NORM_MOMENTUM,
            None,
        )?;
        Ok(x.wrap(id))
    }

    pub const fn running_mean(&self) -> &Var {
        &self.running_mean
    }

    pub const fn running_var(&self) -> &Var {
        &self.running_var
    }

    pub const fn is_affine(&self) -> bool {
        self.affine.is_some()
    }

    pub const fn num_features(&self) -> usize {
        self.num_features
    }
}

impl Module for BatchNorm2d {
    fn parameters(&self) -> Vec<Var> {
        self.affine
            .iter()
            .flat_map(|(gamma, beta)| [gamma.clone(), beta.clone()])
            .collect()
    }
}
