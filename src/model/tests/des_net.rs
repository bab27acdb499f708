/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : DesNet 结构、初始化与前向传播的单元测试
 */

use crate::assert_err;
use crate::model::{DESCRIPTOR_DIM, DesNet, ORTHOGONAL_GAIN, Stage};
use crate::nn::{GraphError, Module};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn random_patches(batch: usize, size: usize, seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    Tensor::normal_with_rng(128.0, 40.0, &[batch, 1, size, size], &mut rng)
}

#[test]
fn test_stage_layout() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(0)?;
    let kinds: Vec<&str> = net.stages().iter().map(Stage::kind_name).collect();
    assert_eq!(kinds.len(), 25);

    let count = |name: &str| kinds.iter().filter(|&&k| k == name).count();
    assert_eq!(count("Conv2d"), 7);
    assert_eq!(count("BatchNorm2d"), 7);
    assert_eq!(count("ReLU"), 6);
    assert_eq!(count("Dropout"), 5);

    assert_eq!(
        &kinds[..8],
        &["Conv2d", "BatchNorm2d", "ReLU", "Conv2d", "BatchNorm2d", "ReLU", "Dropout", "Conv2d"]
    );
    assert_eq!(&kinds[22..], &["Dropout", "Conv2d", "BatchNorm2d"]);
    Ok(())
}

#[test]
fn test_conv_configuration() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(0)?;
    let convs: Vec<_> = net
        .stages()
        .iter()
        .filter_map(|stage| match stage {
            Stage::Conv(conv) => Some((
                conv.in_channels(),
                conv.out_channels(),
                conv.kernel_size(),
                conv.stride(),
                conv.padding(),
                conv.bias().is_some(),
            )),
            _ => None,
        })
        .collect();
    assert_eq!(
        convs,
        vec![
            (1, 32, 3, 2, 1, false),
            (32, 64, 3, 2, 1, false),
            (64, 96, 3, 2, 1, false),
            (96, 64, 3, 1, 1, false),
            (64, 96, 3, 1, 1, false),
            (96, 128, 3, 1, 1, false),
            (128, DESCRIPTOR_DIM, 4, 1, 0, false),
        ]
    );

    let dropout_rates: Vec<f32> = net
        .stages()
        .iter()
        .filter_map(|stage| match stage {
            Stage::Dropout(dropout) => Some(dropout.p()),
            _ => None,
        })
        .collect();
    assert_eq!(dropout_rates, vec![0.4, 0.4, 0.3, 0.3, 0.3]);

    // BN 全部不带 affine，所以可训练参数只有 7 个卷积核
    assert_eq!(net.parameters().len(), 7);
    assert_eq!(net.num_params(), 557_344);
    Ok(())
}

#[test]
fn test_kernels_are_orthogonal_with_gain() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(3)?;
    let Some(Stage::Conv(conv1)) = net.stages().first() else {
        panic!("第一个阶段应为卷积");
    };
    // [32, 1, 3, 3] 视为 32x9 矩阵，行数多于列数 => Wᵀ·W = gain²·I
    let kernel = conv1.kernel().value()?.unwrap();
    let data = kernel.data_as_slice();
    let gain_sq = ORTHOGONAL_GAIN * ORTHOGONAL_GAIN;
    for i in 0..9 {
        for j in 0..9 {
            let dot: f32 = (0..32).map(|r| data[r * 9 + i] * data[r * 9 + j]).sum();
            let expected = if i == j { gain_sq } else { 0.0 };
            assert_abs_diff_eq!(dot, expected, epsilon = 1e-4);
        }
    }
    Ok(())
}

#[test]
fn test_different_seeds_give_different_weights_same_shapes() -> Result<(), GraphError> {
    let a = DesNet::new_seeded(1)?;
    let b = DesNet::new_seeded(2)?;
    let c = DesNet::new_seeded(1)?;
    for ((pa, pb), pc) in a.parameters().iter().zip(b.parameters()).zip(c.parameters()) {
        assert_eq!(pa.value_expected_shape()?, pb.value_expected_shape()?);
        assert_ne!(pa.value()?, pb.value()?);
        assert_eq!(pa.value()?, pc.value()?);
    }
    Ok(())
}

#[test]
fn test_input_norm_statistics() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(0)?;
    let x = net.graph().input(&random_patches(3, 32, 7))?;
    let normalized = net.input_norm(&x)?;
    normalized.forward()?;

    let value = normalized.value()?.unwrap();
    assert_eq!(value.shape(), &[3, 1, 32, 32]);
    assert_abs_diff_eq!(value.mean_per_sample(), Tensor::zeros(&[3]), epsilon = 1e-4);
    assert_abs_diff_eq!(value.std_per_sample(true), Tensor::ones(&[3]), epsilon = 1e-4);
    Ok(())
}

#[test]
fn test_describe_eval_mode_gives_unit_descriptors() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(0)?;
    net.eval();
    let nodes_before = net.graph().nodes_count();

    let descriptors = net.describe(&random_patches(2, 32, 1))?;
    assert_eq!(descriptors.shape(), &[2, DESCRIPTOR_DIM]);
    assert_abs_diff_eq!(
        descriptors.l2_norm_per_row(),
        Tensor::ones(&[2]),
        epsilon = 1e-4
    );

    // 临时节点已被丢弃；评估模式下同一输入得到相同结果
    assert_eq!(net.graph().nodes_count(), nodes_before);
    assert_eq!(net.describe(&random_patches(2, 32, 1))?, descriptors);
    Ok(())
}

#[test]
fn test_train_mode_updates_running_stats() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(0)?;
    assert!(!net.is_eval());
    let Some(Stage::Norm(bn1)) = net.stages().get(1) else {
        panic!("第二个阶段应为 BatchNorm2d");
    };
    let before = bn1.running_mean().value()?;

    let descriptors = net.describe(&random_patches(4, 32, 2))?;
    assert_eq!(descriptors.shape(), &[4, DESCRIPTOR_DIM]);
    assert_ne!(bn1.running_mean().value()?, before);
    Ok(())
}

#[test]
fn test_forward_rejects_wrong_spatial_size() -> Result<(), GraphError> {
    let net = DesNet::new_seeded(0)?;
    let nodes_before = net.graph().nodes_count();

    // 64x64：最后一层输出 5x5
    let result = net.describe(&Tensor::zeros(&[1, 1, 64, 64]));
    assert_err!(result, GraphError::ShapeMismatch { expected, got, .. }
        if expected == &[1, DESCRIPTOR_DIM, 1, 1] && got == &[1, DESCRIPTOR_DIM, 5, 5]);

    // 16x16：最后的 4x4 卷积核大于 2x2 的特征图
    let result = net.describe(&Tensor::zeros(&[1, 1, 16, 16]));
    assert_err!(result, GraphError::ShapeMismatch { .. });

    // 多通道输入
    let result = net.describe(&Tensor::zeros(&[1, 3, 32, 32]));
    assert_err!(result, GraphError::ShapeMismatch { .. });

    assert_eq!(net.graph().nodes_count(), nodes_before);
    Ok(())
}
