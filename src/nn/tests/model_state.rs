/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 参数与状态的保存/加载测试
 */

use crate::assert_err;
use crate::nn::{BatchNorm2d, Conv2d, Graph, GraphError, Init};
use crate::tensor::Tensor;

fn temp_path(file_name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("des_net_{}_{file_name}", std::process::id()))
}

#[test]
fn test_save_and_load_params_round_trip() -> Result<(), GraphError> {
    let path = temp_path("round_trip.bin");

    let source = Graph::new_with_seed(1);
    let conv = Conv2d::new(&source, 1, 4, 3, 1, 1, true, "conv")?;
    conv.kernel().init(&Init::Normal { mean: 0.0, std: 1.0 })?;
    if let Some(bias) = conv.bias() {
        bias.init(&Init::Constant(0.01))?;
    }
    let bn = BatchNorm2d::new(&source, 4, false, "bn")?;
    bn.running_mean().set_value(&Tensor::new(&[1., 2., 3., 4.], &[4]))?;
    source.save_params(&path)?;

    let target = Graph::new_with_seed(2);
    let conv2 = Conv2d::new(&target, 1, 4, 3, 1, 1, true, "conv")?;
    let bn2 = BatchNorm2d::new(&target, 4, false, "bn")?;
    target.load_params(&path)?;

    assert_eq!(conv2.kernel().value()?, conv.kernel().value()?);
    assert_eq!(
        conv2.bias().map(|b| b.value()).transpose()?,
        Some(Some(Tensor::full(0.01, &[4])))
    );
    assert_eq!(bn2.running_mean().value()?, bn.running_mean().value()?);
    assert_eq!(bn2.running_var().value()?, Some(Tensor::ones(&[4])));

    std::fs::remove_file(&path).ok();
    Ok(())
}

#[test]
fn test_save_requires_initialized_params() -> Result<(), GraphError> {
    let path = temp_path("uninitialized.bin");
    let graph = Graph::new();
    Conv2d::new(&graph, 1, 2, 3, 1, 1, false, "conv")?;
    assert_err!(graph.save_params(&path), GraphError::ComputationError(_));
    std::fs::remove_file(&path).ok();
    Ok(())
}

#[test]
fn test_load_skips_unknown_and_rejects_shape_mismatch() -> Result<(), GraphError> {
    let path = temp_path("mismatch.bin");

    let source = Graph::new();
    source.parameter_with_init(&[2, 2], &Init::Ones, "w")?;
    source.parameter_with_init(&[3], &Init::Zeros, "extra")?;
    source.save_params(&path)?;

    // 多出来的 extra 被跳过
    let target = Graph::new();
    let w = target.parameter(&[2, 2], "w")?;
    target.load_params(&path)?;
    assert_eq!(w.value()?, Some(Tensor::ones(&[2, 2])));

    // 同名但形状不同则报错
    let wrong = Graph::new();
    wrong.parameter(&[4], "w")?;
    assert_err!(wrong.load_params(&path), GraphError::ShapeMismatch { .. });

    std::fs::remove_file(&path).ok();
    Ok(())
}

#[test]
fn test_failed_load_leaves_values_untouched() -> Result<(), GraphError> {
    let path = temp_path("partial.bin");

    let source = Graph::new();
    source.parameter_with_init(&[2], &Init::Constant(5.0), "a")?;
    source.parameter_with_init(&[3], &Init::Constant(5.0), "b")?;
    source.save_params(&path)?;

    // a 的形状一致，b 不一致：整个加载失败，a 也不能被改写
    let target = Graph::new();
    let a = target.parameter_with_init(&[2], &Init::Ones, "a")?;
    let b = target.parameter_with_init(&[4], &Init::Ones, "b")?;
    let result = target.load_params(&path);
    assert_err!(result, GraphError::ShapeMismatch { .. });
    assert_eq!(a.value()?, Some(Tensor::ones(&[2])));
    assert_eq!(b.value()?, Some(Tensor::ones(&[4])));

    std::fs::remove_file(&path).ok();
    Ok(())
}

#[test]
fn test_load_rejects_foreign_file() {
    let path = temp_path("garbage.bin");
    std::fs::write(&path, b"not a params file").unwrap();
    let graph = Graph::new();
    assert_err!(graph.load_params(&path), GraphError::ComputationError(_));
    std::fs::remove_file(&path).ok();
}
