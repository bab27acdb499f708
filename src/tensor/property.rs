/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : 本类仅包含一些属性方法，不包含任何运算方法，所以不会需要用到mut
 */

use super::Tensor;

impl Tensor {
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[n,c,h,w,...]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 张量的维（dim）数、阶（rank）数
    /// 即`shape()`的元素个数--如：形状为`[]`的标量阶数为0，向量阶数为1，矩阵阶数为2，以此类推
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 计算张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 若张量只含1个元素，则返回该元素，否则返回None
    pub fn get_data_number(&self) -> Option<f32> {
        if self.size() == 1 {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    /// 按行优先顺序返回底层数据（张量总是标准布局，见`from_array`）
    pub fn data_as_slice(&self) -> &[f32] {
        self.data
            .as_slice()
            .unwrap_or_else(|| unreachable!("张量数据必须是标准布局"))
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// 判断两个张量能否按 NumPy 规则广播
    /// - 从右向左对齐维度
    /// - 每个维度必须相等，或其中一个为 1
    pub fn can_broadcast_with(&self, other: &Self) -> bool {
        self.shape()
            .iter()
            .rev()
            .zip(other.shape().iter().rev())
            .all(|(&a, &b)| a == b || a == 1 || b == 1)
    }

    /// 除第0维（batch）以外每个样本的元素个数
    pub(crate) fn sample_size(&self) -> usize {
        self.shape().iter().skip(1).product()
    }
}
