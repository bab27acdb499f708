/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Conv2d (2D 卷积) 层 - PyTorch 风格 API
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * 输出尺寸计算：
 * H' = (H + 2*padding - kernel) / stride + 1
 *
 * 计算：output = conv2d(x, K) + b
 */

use crate::nn::{Graph, GraphError, Module, Var};

/// Conv2d (2D 卷积) 层
///
/// 卷积核与偏置在创建时只声明、不填值，由调用方决定初始化策略
/// （见 `Var::init`）。
///
/// # 使用示例
/// ```ignore
/// let conv = Conv2d::new(&graph, 1, 32, 3, 2, 1, false, "conv1")?;
/// conv.kernel().init(&Init::Orthogonal { gain: 0.6 })?;
/// let h = conv.forward(&x)?;
/// ```
pub struct Conv2d {
    /// 卷积核参数 [out_channels, in_channels, kernel, kernel]
    kernel: Var,
    /// 偏置参数 [out_channels]（可选）
    bias: Option<Var>,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
}

impl Conv2d {
    /// 创建新的 Conv2d 层（方形卷积核，高宽方向使用相同的步长与填充）
    ///
    /// 参数节点命名为 `{name}_K`、`{name}_b`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &Graph,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        use_bias: bool,
        name: &str,
    ) -> Result<Self, GraphError> {
        let kernel = graph.parameter(
            &[out_channels, in_channels, kernel_size, kernel_size],
            &format!("{name}_K"),
        )?;
        let bias = if use_bias {
            Some(graph.parameter(&[out_channels], &format!("{name}_b"))?)
        } else {
            None
        };

        Ok(Self {
            kernel,
            bias,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
        })
    }

    /// 前向传播：`conv2d(x, K) + b`
    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let id = x.graph().borrow_mut().new_conv2d_node(
            x.node_id(),
            self.kernel.node_id(),
            self.bias.as_ref().map(Var::node_id),
            (self.stride, self.stride),
            (self.padding, self.padding),
            None,
        )?;
        Ok(x.wrap(id))
    }

    pub const fn kernel(&self) -> &Var {
        &self.kernel
    }

    /// 偏置参数；创建时 `use_bias = false` 则为 None
    pub const fn bias(&self) -> Option<&Var> {
        self.bias.as_ref()
    }

    pub const fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub const fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub const fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub const fn stride(&self) -> usize {
        self.stride
    }

    pub const fn padding(&self) -> usize {
        self.padding
    }
}

impl Module for Conv2d {
    fn parameters(&self) -> Vec<Var> {
        std::iter::once(self.kernel.clone())
            .chain(self.bias.clone())
            .collect()
    }
}
