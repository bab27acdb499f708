/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : 2D 批归一化节点（与 torch.nn.BatchNorm2d 行为一致）
 *
 * 父节点：
 * - parents[0]: 输入 [N, C, H, W]
 * - parents[1]: running_mean（State，[C]）
 * - parents[2]: running_var（State，[C]）
 * - parents[3], parents[4]: （仅affine时）gamma、beta（Parameter，[C]）
 *
 * 训练模式：用当前batch每个通道的均值和有偏方差归一化，并按动量更新
 *          running_mean/running_var（running_var使用无偏方差）；
 * 评估模式：直接使用running统计量。
 */

use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::tensor::Tensor;

pub(crate) struct BatchNorm2d {
    shape: Vec<usize>,
    eps: f32,
    momentum: f32,
    affine: bool,

    // 缓存（用于反向传播）
    normalized: Option<Tensor>,
    inv_std: Vec<f32>,
    used_batch_stats: bool,
    pending_updates: Vec<(usize, Tensor)>,
}

impl BatchNorm2d {
    pub(crate) fn new(parents: &[&NodeHandle], eps: f32, momentum: f32) -> Result<Self, GraphError> {
        check_parents_count(parents, &[3, 5], "BatchNorm2d")?;

        let input_shape = parents[0].value_expected_shape();
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!("BatchNorm2d 输入必须是 4D [N, C, H, W]，得到 {input_shape:?}"),
            });
        }

        let channels = input_shape[1];
        for buffer in &parents[1..] {
            if buffer.value_expected_shape() != [channels] {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![channels],
                    got: buffer.value_expected_shape().to_vec(),
                    message: format!("BatchNorm2d 的{buffer}形状必须是 [C]"),
                });
            }
        }

        Ok(Self {
            shape: input_shape.to_vec(),
            eps,
            momentum,
            affine: parents.len() == 5,
            normalized: None,
            inv_std: Vec::new(),
            used_batch_stats: false,
            pending_updates: Vec::new(),
        })
    }

    fn dims(&self) -> (usize, usize, usize) {
        (self.shape[0], self.shape[1], self.shape[2] * self.shape[3])
    }

    /// 对 NCHW 数据的每个元素应用 `f(通道序号, 值)`
    fn map_per_channel<F>(&self, data: &[f32], f: F) -> Vec<f32>
    where
        F: Fn(usize, f32) -> f32,
    {
        let (_, c, hw) = self.dims();
        data.iter()
            .enumerate()
            .map(|(i, &x)| f((i / hw) % c, x))
            .collect()
    }

    /// 每个通道在 (N, H, W) 上求和
    fn sum_per_channel(&self, data: &[f32]) -> Vec<f32> {
        let (_, c, hw) = self.dims();
        let mut sums = vec![0.0f32; c];
        for (i, &x) in data.iter().enumerate() {
            sums[(i / hw) % c] += x;
        }
        sums
    }

    /// 上游梯度乘以gamma（非affine时原样返回）
    fn scaled_upstream(
        &self,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Vec<f32>, GraphError> {
        if !self.affine {
            return Ok(upstream_grad.to_vec());
        }
        let gamma = parent_value(parents, 3, self.type_name())?.to_vec();
        Ok(self.map_per_channel(upstream_grad.data_as_slice(), |ci, g| g * gamma[ci]))
    }
}

impl TraitNode for BatchNorm2d {
    fn type_name(&self) -> &'static str {
        "BatchNorm2d"
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
        let (n, _, hw) = self.dims();

        let (mean, var) = if ctx.is_train {
            if n * hw <= 1 {
                return Err(GraphError::InvalidOperation(format!(
                    "训练模式下 BatchNorm2d 每个通道需要多于1个值，但输入形状为{:?}",
                    input.shape()
                )));
            }
            let batch_mean = input.channel_mean();
            let batch_var = input.channel_var(false);

            let running_mean = parent_value(parents, 1, self.type_name())?;
            let running_var = parent_value(parents, 2, self.type_name())?;
            let m = self.momentum;
            self.pending_updates = vec![
                (1, running_mean * (1.0 - m) + &batch_mean * m),
                (2, running_var * (1.0 - m) + input.channel_var(true) * m),
            ];
            (batch_mean.to_vec(), batch_var.to_vec())
        } else {
            (
                parent_value(parents, 1, self.type_name())?.to_vec(),
                parent_value(parents, 2, self.type_name())?.to_vec(),
            )
        };

        self.inv_std = var.iter().map(|v| 1.0 / (v + self.eps).sqrt()).collect();
        self.used_batch_stats = ctx.is_train;
        let inv_std = &self.inv_std;
        let normalized = Tensor::new(
            &self.map_per_channel(input.data_as_slice(), |ci, x| (x - mean[ci]) * inv_std[ci]),
            &self.shape,
        );

        let output = if self.affine {
            let gamma = parent_value(parents, 3, self.type_name())?.to_vec();
            let beta = parent_value(parents, 4, self.type_name())?.to_vec();
            Tensor::new(
                &self.map_per_channel(normalized.data_as_slice(), |ci, x| x * gamma[ci] + beta[ci]),
                &self.shape,
            )
        } else {
            normalized.clone()
        };
        self.normalized = Some(normalized);
        Ok(output)
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let normalized = self
            .normalized
            .as_ref()
            .ok_or_else(|| GraphError::ComputationError("缺少归一化结果缓存".to_string()))?;

        match parent_index {
            0 => {
                let g = self.scaled_upstream(parents, upstream_grad)?;
                let inv_std = &self.inv_std;
                if !self.used_batch_stats {
                    return Ok(Tensor::new(
                        &self.map_per_channel(&g, |ci, g| g * inv_std[ci]),
                        &self.shape,
                    ));
                }
                // dx = invstd * (g - mean(g) - x̂ * mean(g * x̂))，均值在 (N, H, W) 上计算
                let (n, c, hw) = self.dims();
                let count = (n * hw) as f32;
                let x_hat = normalized.data_as_slice();
                let mean_g = self.sum_per_channel(&g);
                let g_xhat = g.iter().zip(x_hat).map(|(g, x)| g * x).collect::<Vec<_>>();
                let mean_g_xhat = self.sum_per_channel(&g_xhat);
                let data = g
                    .iter()
                    .zip(x_hat)
                    .enumerate()
                    .map(|(i, (&g, &x))| {
                        let ci = (i / hw) % c;
                        inv_std[ci] * (g - mean_g[ci] / count - x * mean_g_xhat[ci] / count)
                    })
                    .collect::<Vec<_>>();
                Ok(Tensor::new(&data, &self.shape))
            }
            3 if self.affine => {
                let g_xhat = upstream_grad * normalized;
                let sums = self.sum_per_channel(g_xhat.data_as_slice());
                Ok(Tensor::new(&sums, &[sums.len()]))
            }
            4 if self.affine => {
                let sums = self.sum_per_channel(upstream_grad.data_as_slice());
                Ok(Tensor::new(&sums, &[sums.len()]))
            }
            _ => Err(no_grad_to_parent(self.type_name(), parent_index)),
        }
    }

    fn take_state_updates(&mut self) -> Vec<(usize, Tensor)> {
        std::mem::take(&mut self.pending_updates)
    }
}
