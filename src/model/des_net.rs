/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : DesNet：把 32x32 灰度图像块映射为 128 维、L2 归一化的局部描述子
 *
 * 网络结构（每行一个卷积阶段，BN 均不带 affine，卷积均不带偏置）：
 *   conv 1→32   k3 s2 p1, BN, ReLU
 *   conv 32→64  k3 s2 p1, BN, ReLU
 *   Dropout 0.4, conv 64→96  k3 s2 p1, BN, ReLU
 *   Dropout 0.4, conv 96→64  k3 s1 p1, BN, ReLU
 *   Dropout 0.3, conv 64→96  k3 s1 p1, BN, ReLU
 *   Dropout 0.3, conv 96→128 k3 s1 p1, BN, ReLU
 *   Dropout 0.3, conv 128→128 k4 s1 p0, BN
 * 前向：按样本标准化 → 上述各阶段 → 展平 → 按行 L2 归一化
 */

use std::path::Path;

use crate::nn::{
    BatchNorm2d, Conv2d, Dropout, Graph, GraphError, Init, Module, ReLU, Var, VarNormOps,
    VarShapeOps,
};
use crate::tensor::Tensor;

/// 输入图像块的边长
pub const PATCH_SIZE: usize = 32;
/// 输出描述子的维度
pub const DESCRIPTOR_DIM: usize = 128;
/// 卷积核正交初始化的增益
pub const ORTHOGONAL_GAIN: f32 = 0.6;
/// 卷积偏置（若存在）的初始值
pub const BIAS_INIT_VALUE: f32 = 0.01;

/// 一个卷积阶段的配置
struct ConvStageConfig {
    dropout: Option<f32>,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
    relu: bool,
}

#[rustfmt::skip]
const ARCHITECTURE: [ConvStageConfig; 7] = [
    ConvStageConfig { dropout: None,      in_channels: 1,   out_channels: 32,  kernel_size: 3, stride: 2, padding: 1, relu: true },
    ConvStageConfig { dropout: None,      in_channels: 32,  out_channels: 64,  kernel_size: 3, stride: 2, padding: 1, relu: true },
    ConvStageConfig { dropout: Some(0.4), in_channels: 64,  out_channels: 96,  kernel_size: 3, stride: 2, padding: 1, relu: true },
    ConvStageConfig { dropout: Some(0.4), in_channels: 96,  out_channels: 64,  kernel_size: 3, stride: 1, padding: 1, relu: true },
    ConvStageConfig { dropout: Some(0.3), in_channels: 64,  out_channels: 96,  kernel_size: 3, stride: 1, padding: 1, relu: true },
    ConvStageConfig { dropout: Some(0.3), in_channels: 96,  out_channels: 128, kernel_size: 3, stride: 1, padding: 1, relu: true },
    ConvStageConfig { dropout: Some(0.3), in_channels: 128, out_channels: DESCRIPTOR_DIM, kernel_size: 4, stride: 1, padding: 0, relu: false },
];

/// 网络流水线中的一个阶段
pub enum Stage {
    Conv(Conv2d),
    Norm(BatchNorm2d),
    Activation(ReLU),
    Dropout(Dropout),
}

impl Stage {
    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        match self {
            Self::Conv(conv) => conv.forward(x),
            Self::Norm(bn) => bn.forward(x),
            Self::Activation(relu) => relu.forward(x),
            Self::Dropout(dropout) => dropout.forward(x),
        }
    }

    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Conv(_) => "Conv2d",
            Self::Norm(_) => "BatchNorm2d",
            Self::Activation(_) => "ReLU",
            Self::Dropout(_) => "Dropout",
        }
    }
}

impl Module for Stage {
    fn parameters(&self) -> Vec<Var> {
        match self {
            Self::Conv(conv) => conv.parameters(),
            Self::Norm(bn) => bn.parameters(),
            Self::Activation(_) | Self::Dropout(_) => Vec::new(),
        }
    }
}

/// 按阶段类型初始化权重：卷积核做正交初始化，卷积偏置（若有）置为常数，其余阶段不处理
fn weights_init(stage: &Stage) -> Result<(), GraphError> {
    let Stage::Conv(conv) = stage else {
        return Ok(());
    };
    conv.kernel().init(&Init::Orthogonal {
        gain: ORTHOGONAL_GAIN,
    })?;
    if let Some(bias) = conv.bias() {
        bias.init(&Init::Constant(BIAS_INIT_VALUE))?;
    }
    Ok(())
}

/// DesNet 局部描述子网络
///
/// 网络持有自己的计算图：参数与 BN 的 running 统计量在构建时创建，
/// 每次 `describe` 产生的临时节点在求值后丢弃。
///
/// # 使用示例
/// ```ignore
/// let net = DesNet::new_seeded(0)?;
/// net.eval();
/// let descriptors = net.describe(&patches)?; // [N, 1, 32, 32] -> [N, 128]
/// ```
pub struct DesNet {
    graph: Graph,
    stages: Vec<Stage>,
}

impl DesNet {
    /// 用系统熵作为随机种子构建网络
    pub fn new() -> Result<Self, GraphError> {
        Self::build(Graph::new())
    }

    /// 用固定种子构建网络（初始化权重与 Dropout 掩码可复现）
    pub fn new_seeded(seed: u64) -> Result<Self, GraphError> {
        Self::build(Graph::new_with_seed(seed))
    }

    fn build(graph: Graph) -> Result<Self, GraphError> {
        let mut stages = Vec::with_capacity(25);
        for (i, config) in ARCHITECTURE.iter().enumerate() {
            let index = i + 1;
            if let Some(p) = config.dropout {
                stages.push(Stage::Dropout(Dropout::new(p)?));
            }
            stages.push(Stage::Conv(Conv2d::new(
                &graph,
                config.in_channels,
                config.out_channels,
                config.kernel_size,
                config.stride,
                config.padding,
                false,
                &format!("conv{index}"),
            )?));
            stages.push(Stage::Norm(BatchNorm2d::new(
                &graph,
                config.out_channels,
                false,
                &format!("bn{index}"),
            )?));
            if config.relu {
                stages.push(Stage::Activation(ReLU));
            }
        }

        stages.iter().try_for_each(weights_init)?;

        let net = Self { graph, stages };
        log::debug!(
            "DesNet 构建完成：{}个阶段，{}个可训练参数，图中共{}个节点",
            net.stages.len(),
            net.num_params(),
            net.graph.nodes_count()
        );
        Ok(net)
    }

    /// 输入归一化：每个样本减去自身均值、除以（无偏标准差 + 1e-7）
    pub fn input_norm(&self, x: &Var) -> Result<Var, GraphError> {
        x.standardize_per_sample()
    }

    /// 构建前向计算：[N, 1, H, W] -> [N, 128]
    ///
    /// 各阶段之后的空间尺寸必须恰好为 1x1（H、W 在 25..=32 之间），否则返回 `ShapeMismatch`。
    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let mut h = self.input_norm(x)?;
        for stage in &self.stages {
            h = stage.forward(&h)?;
        }

        let shape = h.value_expected_shape()?;
        if shape[2..] != [1, 1] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![shape[0], DESCRIPTOR_DIM, 1, 1],
                got: shape,
                message: format!(
                    "DesNet 最后一层输出的空间尺寸必须为 1x1，请输入 {PATCH_SIZE}x{PATCH_SIZE} 的图像块"
                ),
            });
        }

        h.flatten()?.l2_normalize()
    }

    /// 对一批图像块 [N, 1, H, W] 求描述子 [N, 128]
    ///
    /// 本次求值创建的临时节点在返回前全部丢弃，网络可以反复调用。
    pub fn describe(&self, patches: &Tensor) -> Result<Tensor, GraphError> {
        let checkpoint = self.graph.checkpoint();
        let result = self.describe_inner(patches);
        self.graph.rollback(checkpoint);
        result
    }

    fn describe_inner(&self, patches: &Tensor) -> Result<Tensor, GraphError> {
        let x = self.graph.input_named(patches, "patches")?;
        let descriptors = self.forward(&x)?;
        descriptors.forward()?;
        descriptors
            .value()?
            .ok_or_else(|| GraphError::ComputationError("描述子没有计算出值".to_string()))
    }

    /// 训练模式：Dropout 生效，BN 使用 batch 统计量并更新 running 统计量
    pub fn train(&self) {
        self.graph.train();
    }

    /// 评估模式：Dropout 为恒等映射，BN 使用 running 统计量
    pub fn eval(&self) {
        self.graph.eval();
    }

    pub fn is_eval(&self) -> bool {
        self.graph.is_eval()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// 保存卷积核与 BN running 统计量
    pub fn save_params<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        self.graph.save_params(path)
    }

    pub fn load_params<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        self.graph.load_params(path)
    }
}

impl Module for DesNet {
    fn parameters(&self) -> Vec<Var> {
        self.stages.iter().flat_map(|stage| stage.parameters()).collect()
    }
}
