use crate::errors::TensorError;
use crate::tensor::Tensor;

impl Tensor {
    /// 对每个元素应用`f`，返回同形状的新张量
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        Self::from_array(self.data.mapv(f))
    }

    /// 通用的条件过滤函数，可以灵活处理张量中的元素
    ///
    /// # 参数
    /// * `condition` - 条件函数，接收元素值并返回bool
    /// * `true_fn` - 当条件为true时的值转换函数
    /// * `false_fn` - 当条件为false时的值转换函数
    ///
    /// 类似 `np.where(condition(x), true_fn(x), false_fn(x))`，NaN原样保留
    pub fn where_with_f32<F, T, U>(&self, condition: F, true_fn: T, false_fn: U) -> Self
    where
        F: Fn(f32) -> bool,
        T: Fn(f32) -> f32,
        U: Fn(f32) -> f32,
    {
        self.map(|x| {
            if x.is_nan() {
                f32::NAN
            } else if condition(x) {
                true_fn(x)
            } else {
                false_fn(x)
            }
        })
    }

    /// 重塑形状，新旧形状的元素个数必须一致
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        if shape.iter().product::<usize>() != self.size() {
            return Err(TensorError::ReshapeMismatch {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            });
        }
        Ok(Self::new(self.data_as_slice(), shape))
    }

    /// 所有元素之和
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }
}
