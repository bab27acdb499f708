/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : BatchNorm2d 节点与层的单元测试（期望值与 torch.nn.BatchNorm2d 对照）
 */

use crate::assert_err;
use crate::nn::{BatchNorm2d, Graph, GraphError, Module, VarActivationOps, VarReduceOps};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

/// 单通道，(N, H, W) 上共4个值：[1, 3, 5, 7]，均值4，有偏方差5，无偏方差20/3
fn sample_input() -> Tensor {
    Tensor::new(&[1., 3., 5., 7.], &[2, 1, 1, 2])
}

#[test]
fn test_batch_norm_train_forward_and_running_stats() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let bn = BatchNorm2d::new(&graph, 1, false, "bn")?;
    let x = graph.input(&sample_input())?;
    let y = bn.forward(&x)?;
    y.forward()?;

    let expected = Tensor::new(
        &[-1.341_639_4, -0.447_213_15, 0.447_213_15, 1.341_639_4],
        &[2, 1, 1, 2],
    );
    assert_abs_diff_eq!(y.value()?.unwrap(), expected, epsilon = 1e-5);

    // running_mean = 0.9 * 0 + 0.1 * 4
    // running_var  = 0.9 * 1 + 0.1 * 20/3
    assert_abs_diff_eq!(
        bn.running_mean().value()?.unwrap(),
        Tensor::new(&[0.4], &[1]),
        epsilon = 1e-6
    );
    assert_abs_diff_eq!(
        bn.running_var().value()?.unwrap(),
        Tensor::new(&[1.566_666_7], &[1]),
        epsilon = 1e-6
    );
    Ok(())
}

#[test]
fn test_batch_norm_eval_uses_running_stats() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let bn = BatchNorm2d::new(&graph, 1, false, "bn")?;
    let x = graph.input(&sample_input())?;
    let y = bn.forward(&x)?;

    // 训练模式下先跑一次以更新 running 统计量
    y.forward()?;
    graph.eval();
    y.forward()?;

    let expected = Tensor::new(
        &[0.479_359_75, 2.077_225_6, 3.675_091_5, 5.272_957],
        &[2, 1, 1, 2],
    );
    assert_abs_diff_eq!(y.value()?.unwrap(), expected, epsilon = 1e-5);

    // 评估模式不再更新 running 统计量
    assert_abs_diff_eq!(
        bn.running_mean().value()?.unwrap(),
        Tensor::new(&[0.4], &[1]),
        epsilon = 1e-6
    );
    Ok(())
}

#[test]
fn test_batch_norm_fresh_eval_is_near_identity() -> Result<(), GraphError> {
    let graph = Graph::new();
    graph.eval();
    let bn = BatchNorm2d::new(&graph, 2, false, "bn")?;
    let data = Tensor::new(&[1., -2., 3., 4.], &[1, 2, 1, 2]);
    let x = graph.input(&data)?;
    let y = bn.forward(&x)?;
    y.forward()?;

    // running_mean=0、running_var=1 时输出为 x / sqrt(1 + eps)
    assert_abs_diff_eq!(y.value()?.unwrap(), data, epsilon = 1e-4);
    Ok(())
}

#[test]
fn test_batch_norm_train_requires_more_than_one_value_per_channel() -> Result<(), GraphError> {
    let graph = Graph::new();
    let bn = BatchNorm2d::new(&graph, 3, false, "bn")?;
    let x = graph.input(&Tensor::ones(&[1, 3, 1, 1]))?;
    let y = bn.forward(&x)?;
    assert_err!(y.forward(), GraphError::InvalidOperation(_));

    // 评估模式下单个值没有问题
    graph.eval();
    y.forward()?;
    Ok(())
}

#[test]
fn test_batch_norm_rejects_channel_mismatch() -> Result<(), GraphError> {
    let graph = Graph::new();
    let bn = BatchNorm2d::new(&graph, 4, false, "bn")?;
    let x = graph.input(&Tensor::ones(&[2, 3, 2, 2]))?;
    assert_err!(bn.forward(&x), GraphError::ShapeMismatch { expected, .. } if expected == &[3]);
    Ok(())
}

#[test]
fn test_batch_norm_train_backward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let bn = BatchNorm2d::new(&graph, 1, false, "bn")?;
    let x = graph.parameter(&[2, 1, 1, 2], "x")?;
    x.set_value(&sample_input())?;

    // relu 之后只有 x̂ > 0 的位置有上游梯度：g = [0, 0, 1, 1]
    let loss = bn.forward(&x)?.relu()?.sum()?;
    loss.backward()?;

    // dx = inv_std * (g - mean(g) - x̂ * mean(g * x̂))
    let expected = Tensor::new(
        &[0.044_721_3, -0.134_163_9, 0.134_163_9, -0.044_721_3],
        &[2, 1, 1, 2],
    );
    assert_abs_diff_eq!(x.grad()?.unwrap(), expected, epsilon = 1e-4);
    Ok(())
}

#[test]
fn test_batch_norm_eval_backward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let bn = BatchNorm2d::new(&graph, 1, false, "bn")?;
    bn.running_var().set_value(&Tensor::new(&[4.], &[1]))?;
    graph.eval();

    let x = graph.parameter(&[2, 1, 1, 2], "x")?;
    x.set_value(&sample_input())?;
    let loss = bn.forward(&x)?.sum()?;
    loss.backward()?;

    // 评估模式下统计量是常数：dx = g / sqrt(running_var + eps)
    assert_abs_diff_eq!(
        x.grad()?.unwrap(),
        Tensor::full(0.5, &[2, 1, 1, 2]),
        epsilon = 1e-5
    );
    Ok(())
}

#[test]
fn test_batch_norm_affine_grads() -> Result<(), GraphError> {
    let graph = Graph::new();
    let bn = BatchNorm2d::new(&graph, 1, true, "bn")?;
    assert!(bn.is_affine());
    assert_eq!(bn.parameters().len(), 2);
    assert_eq!(bn.num_params(), 2);

    let x = graph.input(&sample_input())?;
    let loss = bn.forward(&x)?.sum()?;
    loss.backward()?;

    let params = bn.parameters();
    let (gamma, beta) = (&params[0], &params[1]);
    assert_eq!(gamma.name()?, "bn_gamma");
    // dgamma = Σ x̂ = 0，dbeta = Σ g = 4
    assert_abs_diff_eq!(gamma.grad()?.unwrap(), Tensor::zeros(&[1]), epsilon = 1e-5);
    assert_abs_diff_eq!(beta.grad()?.unwrap(), Tensor::new(&[4.], &[1]), epsilon = 1e-6);
    // 状态节点不接收梯度
    assert_eq!(bn.running_mean().grad()?, None);
    Ok(())
}

#[test]
fn test_batch_norm_without_affine_has_no_parameters() -> Result<(), GraphError> {
    let graph = Graph::new();
    let bn = BatchNorm2d::new(&graph, 8, false, "bn")?;
    assert!(bn.parameters().is_empty());
    assert_eq!(bn.num_features(), 8);
    assert_eq!(bn.running_mean().value()?, Some(Tensor::zeros(&[8])));
    assert_eq!(bn.running_var().value()?, Some(Tensor::ones(&[8])));
    Ok(())
}
