/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : L2Normalize 与 SampleStandardize 节点单元测试
 */

use crate::assert_err;
use crate::nn::{Graph, GraphError, VarNormOps, VarReduceOps};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ==================== L2Normalize ====================

#[test]
fn test_l2_normalize_forward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.input(&Tensor::new(&[3., 4., 0., 0.], &[2, 2]))?;
    let y = x.l2_normalize()?;
    y.forward()?;

    // 零向量保持为零而不是 NaN
    let output = y.value()?.unwrap();
    assert_abs_diff_eq!(output, Tensor::new(&[0.6, 0.8, 0., 0.], &[2, 2]), epsilon = 1e-6);
    assert_abs_diff_eq!(
        output.l2_norm_per_row(),
        Tensor::new(&[1., 0.], &[2]),
        epsilon = 1e-6
    );
    Ok(())
}

#[test]
fn test_l2_normalize_backward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.parameter(&[1, 2], "x")?;
    x.set_value(&Tensor::new(&[3., 4.], &[1, 2]))?;
    let loss = x.l2_normalize()?.sum()?;
    loss.backward()?;

    // dx = (g - y·Σ(g⊙y)) / ‖x‖，g=1，y=(0.6, 0.8)，Σ(g⊙y)=1.4
    assert_abs_diff_eq!(
        x.grad()?.unwrap(),
        Tensor::new(&[0.032, -0.024], &[1, 2]),
        epsilon = 1e-6
    );
    Ok(())
}

#[test]
fn test_l2_normalize_requires_2d() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.input(&Tensor::ones(&[2, 2, 2]))?;
    assert_err!(x.l2_normalize(), GraphError::ShapeMismatch { .. });
    Ok(())
}

// ==================== SampleStandardize ====================

#[test]
fn test_standardize_per_sample_forward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.input(&Tensor::new(&[1., 2., 3., 4., 5., 5., 5., 5.], &[2, 1, 2, 2]))?;
    let y = x.standardize_per_sample()?;
    y.forward()?;

    // 第一个样本：均值2.5，无偏标准差1.2909944；第二个样本为常数，结果全为0
    let expected = Tensor::new(
        &[-1.161_895, -0.387_298_3, 0.387_298_3, 1.161_895, 0., 0., 0., 0.],
        &[2, 1, 2, 2],
    );
    assert_abs_diff_eq!(y.value()?.unwrap(), expected, epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_standardize_per_sample_statistics() -> Result<(), GraphError> {
    let mut rng = StdRng::seed_from_u64(1);
    let data = Tensor::normal_with_rng(3.0, 5.0, &[3, 1, 8, 8], &mut rng);
    let graph = Graph::new();
    let y = graph.input(&data)?.standardize_per_sample()?;
    y.forward()?;

    let output = y.value()?.unwrap();
    assert_eq!(output.shape(), &[3, 1, 8, 8]);
    assert_abs_diff_eq!(output.mean_per_sample(), Tensor::zeros(&[3]), epsilon = 1e-5);
    assert_abs_diff_eq!(output.std_per_sample(true), Tensor::ones(&[3]), epsilon = 1e-4);
    Ok(())
}

#[test]
fn test_standardize_per_sample_backward_treats_stats_as_constants() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.parameter(&[1, 4], "x")?;
    x.set_value(&Tensor::new(&[1., 2., 3., 4.], &[1, 4]))?;
    let loss = x.standardize_per_sample()?.sum()?;
    loss.backward()?;

    // grad = g / (std + 1e-7)
    assert_abs_diff_eq!(
        x.grad()?.unwrap(),
        Tensor::full(0.774_596_6, &[1, 4]),
        epsilon = 1e-6
    );
    Ok(())
}
