/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : 张量：基于ndarray的f32稠密多维数组，是计算图中所有节点值/梯度的载体
 */

use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod image;
mod index;
mod linalg;
mod ops;
mod property;
mod statistics;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、i32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]...
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为更高维度的数组，`shape`可以是[n,c,h,w,...]；
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        match Array::from_shape_vec(IxDyn(shape), data.to_vec()) {
            Ok(data) => Self { data },
            Err(_) => panic!(
                "{}",
                TensorError::DataLengthMismatch {
                    data_len: data.len(),
                    shape: shape.to_vec(),
                }
            ),
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(value: f32, shape: &[usize]) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个服从正态分布的随机张量（Box-Muller变换，使用指定的RNG）
    pub fn normal_with_rng(mean: f32, std_dev: f32, shape: &[usize], rng: &mut StdRng) -> Self {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f32 = rng.r#gen();
            let u2: f32 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Self::new(&data, shape)
    }

    /// 创建一个伯努利掩码张量：每个元素以`keep_prob`的概率为1，否则为0
    pub fn bernoulli_with_rng(keep_prob: f32, shape: &[usize], rng: &mut StdRng) -> Self {
        let data = (0..shape.iter().product::<usize>())
            .map(|_| if rng.r#gen::<f32>() < keep_prob { 1.0 } else { 0.0 })
            .collect::<Vec<_>>();
        Self::new(&data, shape)
    }

    /// 沿新的第0维把若干形状相同的张量堆叠起来：n个[a,b,..] -> [n,a,b,..]
    pub fn stack(tensors: &[Self]) -> Result<Self, TensorError> {
        let first = tensors.first().ok_or(TensorError::EmptyList)?;
        if tensors.iter().any(|t| !t.is_same_shape(first)) {
            return Err(TensorError::InconsitentShape);
        }
        let mut shape = vec![tensors.len()];
        shape.extend_from_slice(first.shape());
        let data = tensors
            .iter()
            .flat_map(|t| t.data.iter().copied())
            .collect::<Vec<_>>();
        Ok(Self::new(&data, &shape))
    }

    /// 所有运算结果都经由此处构造，保证底层数据为标准（行优先、连续）布局
    pub(crate) fn from_array(data: ArrayD<f32>) -> Self {
        if data.is_standard_layout() {
            Self { data }
        } else {
            Self {
                data: data.as_standard_layout().into_owned(),
            }
        }
    }
}
