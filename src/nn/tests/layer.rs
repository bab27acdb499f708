/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : Layer 与 Module trait 测试
 */

use crate::assert_err;
use crate::nn::{Conv2d, Graph, GraphError, Init, Module, VarReduceOps};
use crate::tensor::Tensor;

#[test]
fn test_conv2d_layer_declares_parameters() -> Result<(), GraphError> {
    let graph = Graph::new();
    let conv = Conv2d::new(&graph, 1, 32, 3, 2, 1, false, "conv1")?;

    assert_eq!(conv.kernel().name()?, "conv1_K");
    assert_eq!(conv.kernel().value_expected_shape()?, vec![32, 1, 3, 3]);
    assert!(conv.bias().is_none());
    assert_eq!(conv.kernel().value()?, None);
    assert_eq!(conv.parameters().len(), 1);
    assert_eq!(conv.num_params(), 32 * 9);
    assert_eq!(
        (conv.in_channels(), conv.out_channels(), conv.kernel_size()),
        (1, 32, 3)
    );
    assert_eq!((conv.stride(), conv.padding()), (2, 1));
    Ok(())
}

#[test]
fn test_conv2d_layer_with_bias() -> Result<(), GraphError> {
    let graph = Graph::new();
    let conv = Conv2d::new(&graph, 2, 4, 3, 1, 1, true, "conv")?;
    let bias = conv.bias().unwrap();
    assert_eq!(bias.name()?, "conv_b");
    assert_eq!(bias.value_expected_shape()?, vec![4]);
    assert_eq!(conv.num_params(), 4 * 2 * 9 + 4);
    Ok(())
}

#[test]
fn test_conv2d_layer_forward_and_backward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let conv = Conv2d::new(&graph, 1, 2, 3, 1, 1, true, "conv")?;
    conv.kernel().init(&Init::Ones)?;
    conv.bias().unwrap().init(&Init::Zeros)?;

    let x = graph.input(&Tensor::ones(&[1, 1, 4, 4]))?;
    let y = conv.forward(&x)?;
    assert_eq!(y.value_expected_shape()?, vec![1, 2, 4, 4]);
    y.sum()?.backward()?;

    // 4x4 全1输入、3x3 全1卷积核、填充1：角上4、边上6、内部9
    #[rustfmt::skip]
    let plane = [
        4., 6., 6., 4.,
        6., 9., 9., 6.,
        6., 9., 9., 6.,
        4., 6., 6., 4.,
    ];
    let expected: Vec<f32> = plane.iter().chain(plane.iter()).copied().collect();
    assert_eq!(y.value()?, Some(Tensor::new(&expected, &[1, 2, 4, 4])));
    assert_eq!(
        conv.bias().unwrap().grad()?,
        Some(Tensor::full(16., &[2]))
    );
    Ok(())
}

#[test]
fn test_conv2d_layer_duplicate_name() -> Result<(), GraphError> {
    let graph = Graph::new();
    Conv2d::new(&graph, 1, 2, 3, 1, 1, false, "conv")?;
    let again = Conv2d::new(&graph, 1, 2, 3, 1, 1, false, "conv");
    assert!(matches!(again, Err(GraphError::DuplicateNodeName(_))));
    Ok(())
}

#[test]
fn test_uninitialized_kernel_fails_forward() -> Result<(), GraphError> {
    let graph = Graph::new();
    let conv = Conv2d::new(&graph, 1, 2, 3, 1, 1, false, "conv")?;
    let y = conv.forward(&graph.input(&Tensor::ones(&[1, 1, 4, 4]))?)?;
    assert_err!(y.forward(), GraphError::InvalidOperation(_));
    Ok(())
}
