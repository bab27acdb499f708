/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : 2D 卷积节点（PyTorch 风格）
 *
 * 设计决策：
 * - 单节点处理多通道，Batch-First 格式：输入必须是 4D [batch, C_in, H, W]
 * - 输出格式：[batch, C_out, H', W']
 * - 使用 Rayon 在 batch 维度并行加速
 *
 * 父节点：
 * - parents[0]: 输入数据
 * - parents[1]: 卷积核参数 [C_out, C_in, kH, kW]
 * - parents[2]: （可选）偏置参数 [C_out]
 */

use rayon::prelude::*;

use super::{check_parents_count, no_grad_to_parent};
use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{ForwardContext, TraitNode, parent_value};
use crate::nn::nodes::NodeHandle;
use crate::tensor::Tensor;

pub(crate) struct Conv2d {
    shape: Vec<usize>,
    kernel_size: (usize, usize), // (kH, kW)
    stride: (usize, usize),      // (sH, sW)
    padding: (usize, usize),     // (pH, pW)
    has_bias: bool,

    // 缓存（用于反向传播）
    padded_input: Option<Tensor>,
    input_shape: Vec<usize>,
}

impl Conv2d {
    /// 创建 Conv2d 节点
    ///
    /// # 输入形状约定
    /// - 输入: [batch, `C_in`, H, W]
    /// - 卷积核: [`C_out`, `C_in`, kH, kW]
    /// - 偏置: [`C_out`]
    pub(crate) fn new(
        parents: &[&NodeHandle],
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self, GraphError> {
        // 1. 验证父节点数量
        check_parents_count(parents, &[2, 3], "Conv2d")?;
        if stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "Conv2d 的步长必须大于0，得到{stride:?}"
            )));
        }

        let input_shape = parents[0].value_expected_shape();
        let kernel_shape = parents[1].value_expected_shape();

        // 2. 验证卷积核形状：必须是 4D [C_out, C_in, kH, kW]
        if kernel_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: kernel_shape.to_vec(),
                message: format!("卷积核必须是 4D [C_out, C_in, kH, kW]，得到 {kernel_shape:?}"),
            });
        }
        let (out_channels, in_channels, kernel_h, kernel_w) = (
            kernel_shape[0],
            kernel_shape[1],
            kernel_shape[2],
            kernel_shape[3],
        );

        // 3. 验证输入形状：必须是 4D [batch, C_in, H, W]
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, in_channels, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!(
                    "Conv2d 输入必须是 4D [batch, C_in, H, W]，得到 {input_shape:?}。单样本请使用 [1, C_in, H, W]"
                ),
            });
        }
        let (batch_size, input_c, input_h, input_w) = (
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        );

        // 4. 验证通道数匹配
        if input_c != in_channels {
            return Err(GraphError::ShapeMismatch {
                expected: vec![in_channels],
                got: vec![input_c],
                message: format!("输入通道数 {input_c} 与卷积核输入通道数 {in_channels} 不匹配"),
            });
        }

        // 5. 验证偏置形状
        if let Some(bias) = parents.get(2) {
            let bias_shape = bias.value_expected_shape();
            if bias_shape != [out_channels] {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![out_channels],
                    got: bias_shape.to_vec(),
                    message: "Conv2d 偏置形状必须是 [C_out]".to_string(),
                });
            }
        }

        // 6. 卷积核不能大于填充后的输入
        let (stride_h, stride_w) = stride;
        let (pad_h, pad_w) = padding;
        let (padded_h, padded_w) = (input_h + 2 * pad_h, input_w + 2 * pad_w);
        if kernel_h > padded_h || kernel_w > padded_w {
            return Err(GraphError::ShapeMismatch {
                expected: vec![kernel_h, kernel_w],
                got: vec![padded_h, padded_w],
                message: format!(
                    "卷积核 {kernel_h}x{kernel_w} 大于填充后的输入 {padded_h}x{padded_w}（原输入 {input_h}x{input_w}）"
                ),
            });
        }

        // 7. 输出形状：始终是 4D [batch, C_out, H', W']
        let output_h = (padded_h - kernel_h) / stride_h + 1;
        let output_w = (padded_w - kernel_w) / stride_w + 1;

        Ok(Self {
            shape: vec![batch_size, out_channels, output_h, output_w],
            kernel_size: (kernel_h, kernel_w),
            stride,
            padding,
            has_bias: parents.len() == 3,
            padded_input: None,
            input_shape: input_shape.to_vec(),
        })
    }

    /// 对输入进行零填充（Rayon 并行版本）
    fn pad_input(&self, input: &Tensor) -> Tensor {
        let (pad_h, pad_w) = self.padding;
        if pad_h == 0 && pad_w == 0 {
            return input.clone();
        }

        let input_shape = input.shape();
        let (batch_size, c, h, w) = (input_shape[0], input_shape[1], input_shape[2], input_shape[3]);
        let new_h = h + 2 * pad_h;
        let new_w = w + 2 * pad_w;
        let single_sample_size = c * new_h * new_w;

        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|bi| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for ci in 0..c {
                    for hi in 0..h {
                        for wi in 0..w {
                            let idx = ci * new_h * new_w + (hi + pad_h) * new_w + (wi + pad_w);
                            sample_data[idx] = input[[bi, ci, hi, wi]];
                        }
                    }
                }
                sample_data
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Tensor::new(&all_data, &[batch_size, c, new_h, new_w])
    }

    /// 执行卷积运算（Rayon 并行版本），`bias`为每个输出通道的偏置
    fn convolve(&self, input: &Tensor, kernel: &Tensor, bias: Option<&Tensor>) -> Tensor {
        let in_c = input.shape()[1];
        let (batch_size, out_c, out_h, out_w) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let (k_h, k_w) = self.kernel_size;
        let (stride_h, stride_w) = self.stride;
        let single_sample_size = out_c * out_h * out_w;

        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for oc in 0..out_c {
                    let bias_val = bias.map_or(0.0, |bias| bias[[oc]]);
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let mut sum = bias_val;
                            let h_start = oh * stride_h;
                            let w_start = ow * stride_w;

                            for ic in 0..in_c {
                                for kh in 0..k_h {
                                    for kw in 0..k_w {
                                        sum += input[[b, ic, h_start + kh, w_start + kw]]
                                            * kernel[[oc, ic, kh, kw]];
                                    }
                                }
                            }
                            sample_data[oc * out_h * out_w + oh * out_w + ow] = sum;
                        }
                    }
                }
                sample_data
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Tensor::new(&all_data, &self.shape)
    }

    /// dL/dX：转置卷积，并裁掉填充部分
    fn grad_to_input(&self, kernel: &Tensor, upstream_grad: &Tensor) -> Tensor {
        let (batch_size, out_c, out_h, out_w) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let (in_c, in_h, in_w) = (self.input_shape[1], self.input_shape[2], self.input_shape[3]);
        let (k_h, k_w) = self.kernel_size;
        let (stride_h, stride_w) = self.stride;
        let (pad_h, pad_w) = self.padding;
        let single_sample_size = in_c * in_h * in_w;

        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_grad = vec![0.0f32; single_sample_size];
                for oc in 0..out_c {
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let grad_val = upstream_grad[[b, oc, oh, ow]];
                            let h_start = oh * stride_h;
                            let w_start = ow * stride_w;

                            for ic in 0..in_c {
                                for kh in 0..k_h {
                                    for kw in 0..k_w {
                                        let orig_h = (h_start + kh) as isize - pad_h as isize;
                                        let orig_w = (w_start + kw) as isize - pad_w as isize;
                                        if orig_h >= 0
                                            && orig_h < in_h as isize
                                            && orig_w >= 0
                                            && orig_w < in_w as isize
                                        {
                                            let idx = ic * in_h * in_w
                                                + orig_h as usize * in_w
                                                + orig_w as usize;
                                            sample_grad[idx] +=
                                                grad_val * kernel[[oc, ic, kh, kw]];
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                sample_grad
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Tensor::new(&all_data, &self.input_shape)
    }

    /// dL/dK：输入与上游梯度的相关运算，跨 batch 用 map-reduce 累加
    fn grad_to_kernel(
        &self,
        padded_input: &Tensor,
        kernel_shape: &[usize],
        upstream_grad: &Tensor,
    ) -> Tensor {
        let (batch_size, out_c, out_h, out_w) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let in_c = self.input_shape[1];
        let (k_h, k_w) = self.kernel_size;
        let (stride_h, stride_w) = self.stride;
        let kernel_size = out_c * in_c * k_h * k_w;

        let total_kernel_grad = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_kernel_grad = vec![0.0f32; kernel_size];
                for oc in 0..out_c {
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let grad_val = upstream_grad[[b, oc, oh, ow]];
                            let h_start = oh * stride_h;
                            let w_start = ow * stride_w;

                            for ic in 0..in_c {
                                for kh in 0..k_h {
                                    for kw in 0..k_w {
                                        let idx = ((oc * in_c + ic) * k_h + kh) * k_w + kw;
                                        sample_kernel_grad[idx] += grad_val
                                            * padded_input[[b, ic, h_start + kh, w_start + kw]];
                                    }
                                }
                            }
                        }
                    }
                }
                sample_kernel_grad
            })
            .reduce(
                || vec![0.0f32; kernel_size],
                |mut acc, sample_grad| {
                    acc.iter_mut().zip(sample_grad).for_each(|(a, g)| *a += g);
                    acc
                },
            );

        Tensor::new(&total_kernel_grad, kernel_shape)
    }

    /// dL/db：上游梯度在 (batch, H', W') 上求和
    fn grad_to_bias(&self, upstream_grad: &Tensor) -> Tensor {
        let out_c = self.shape[1];
        let plane = self.shape[2] * self.shape[3];
        let data = upstream_grad.data_as_slice();
        let sums = (0..out_c)
            .map(|oc| {
                (0..self.shape[0])
                    .map(|b| {
                        let start = (b * out_c + oc) * plane;
                        data[start..start + plane].iter().sum::<f32>()
                    })
                    .sum::<f32>()
            })
            .collect::<Vec<_>>();
        Tensor::new(&sums, &[out_c])
    }
}

impl TraitNode for Conv2d {
    fn type_name(&self) -> &'static str {
        "Conv2d"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(
        &mut self,
        parents: &[&NodeHandle],
        _ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError> {
        let input = parent_value(parents, 0, self.type_name())?;
        let kernel = parent_value(parents, 1, self.type_name())?;
        let bias = if self.has_bias {
            Some(parent_value(parents, 2, self.type_name())?)
        } else {
            None
        };

        let padded = self.pad_input(input);
        let output = self.convolve(&padded, kernel, bias);
        self.padded_input = Some(padded);
        Ok(output)
    }

    /// 对于 Y = conv(X, K) + b:
    /// - dL/dX: 使用转置卷积（反卷积）
    /// - dL/dK: 使用输入和上游梯度的相关运算
    /// - dL/db: 上游梯度按输出通道求和
    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        match parent_index {
            0 => {
                let kernel = parent_value(parents, 1, self.type_name())?;
                Ok(self.grad_to_input(kernel, upstream_grad))
            }
            1 => {
                let padded_input = self.padded_input.as_ref().ok_or_else(|| {
                    GraphError::ComputationError("缺少填充后的输入缓存".to_string())
                })?;
                let kernel = parent_value(parents, 1, self.type_name())?;
                Ok(self.grad_to_kernel(padded_input, kernel.shape(), upstream_grad))
            }
            2 if self.has_bias => Ok(self.grad_to_bias(upstream_grad)),
            _ => Err(no_grad_to_parent(self.type_name(), parent_index)),
        }
    }
}
