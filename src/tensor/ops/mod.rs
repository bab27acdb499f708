/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : 张量的四则运算。支持以下情况：
 *                 1. 其中一个操作数为纯数而另一个为张量：则返回的张量形状与该张量相同。
 *                 2. 两个操作数均为张量：支持 NumPy 风格的广播（broadcasting）。
 */

mod eq;
mod others;

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// 为`Tensor`批量实现某个二元运算的全部（不）带引用组合
macro_rules! impl_tensor_binary_op {
    ($trait:ident, $method:ident, $op:tt, $operator:expr) => {
        /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 与 f32↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
        impl $trait<f32> for Tensor {
            type Output = Self;

            fn $method(self, scalar: f32) -> Self {
                Self::from_array(&self.data $op scalar)
            }
        }
        impl $trait<f32> for &Tensor {
            type Output = Tensor;

            fn $method(self, scalar: f32) -> Tensor {
                Tensor::from_array(&self.data $op scalar)
            }
        }
        impl $trait<Tensor> for f32 {
            type Output = Tensor;

            fn $method(self, tensor: Tensor) -> Tensor {
                Tensor::from_array(tensor.data.mapv(|x| self $op x))
            }
        }
        impl $trait<&Tensor> for f32 {
            type Output = Tensor;

            fn $method(self, tensor: &Tensor) -> Tensor {
                Tensor::from_array(tensor.data.mapv(|x| self $op x))
            }
        }
        /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 与 f32↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

        /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 与（不）带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
        impl $trait for Tensor {
            type Output = Self;

            fn $method(self, other: Self) -> Self {
                binary_within_tensors(&self, &other, $operator, |a, b| a $op b)
            }
        }
        impl $trait<&Tensor> for Tensor {
            type Output = Self;

            fn $method(self, other: &Tensor) -> Self {
                binary_within_tensors(&self, other, $operator, |a, b| a $op b)
            }
        }
        impl $trait<Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, other: Tensor) -> Tensor {
                binary_within_tensors(self, &other, $operator, |a, b| a $op b)
            }
        }
        impl $trait<&Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, other: &Tensor) -> Tensor {
                binary_within_tensors(self, other, $operator, |a, b| a $op b)
            }
        }
        /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 与（不）带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    };
}

impl_tensor_binary_op!(Add, add, +, Operator::Add);
impl_tensor_binary_op!(Sub, sub, -, Operator::Sub);
impl_tensor_binary_op!(Mul, mul, *, Operator::Mul);
impl_tensor_binary_op!(Div, div, /, Operator::Div);

impl Neg for Tensor {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_array(-self.data)
    }
}

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        Tensor::from_array(-&self.data)
    }
}

/// 两个张量的逐元素运算，支持 NumPy 风格广播（broadcasting）
///
/// # Panics
/// 如果形状不兼容（无法广播）
fn binary_within_tensors<F>(tensor_1: &Tensor, tensor_2: &Tensor, operator: Operator, f: F) -> Tensor
where
    F: Fn(f32, f32) -> f32,
{
    assert!(
        tensor_1.can_broadcast_with(tensor_2),
        "{}",
        TensorError::OperatorError {
            operator,
            tensor1_shape: tensor_1.shape().to_vec(),
            tensor2_shape: tensor_2.shape().to_vec(),
        }
    );

    let ndim = tensor_1.dimension().max(tensor_2.dimension());
    let out_shape = broadcast_shape(tensor_1.shape(), tensor_2.shape(), ndim);
    // 形状兼容已在上面断言，这里的广播不会失败
    let (Some(a), Some(b)) = (
        tensor_1.data.broadcast(out_shape.as_slice()),
        tensor_2.data.broadcast(out_shape.as_slice()),
    ) else {
        unreachable!("广播兼容性已检查")
    };
    let result = ndarray::Zip::from(&a).and(&b).map_collect(|&x, &y| f(x, y));
    Tensor::from_array(result)
}

fn broadcast_shape(shape_1: &[usize], shape_2: &[usize], ndim: usize) -> Vec<usize> {
    let padded = |shape: &[usize]| {
        let mut full = vec![1; ndim - shape.len()];
        full.extend_from_slice(shape);
        full
    };
    padded(shape_1)
        .into_iter()
        .zip(padded(shape_2))
        .map(|(a, b)| a.max(b))
        .collect()
}
