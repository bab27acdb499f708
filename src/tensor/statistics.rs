/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : 归一化相关的统计量：按样本、按通道、按行
 *
 * 约定：第0维为batch维，按样本统计时将每个样本（除第0维以外的所有元素）展平后计算。
 */

use super::Tensor;

impl Tensor {
    /// 每个样本的均值，返回形状[batch]
    pub fn mean_per_sample(&self) -> Self {
        let n = self.shape()[0];
        let means = self
            .data_as_slice()
            .chunks(self.sample_size().max(1))
            .map(|sample| sample.iter().sum::<f32>() / sample.len() as f32)
            .collect::<Vec<_>>();
        Self::new(&means, &[n])
    }

    /// 每个样本的标准差，返回形状[batch]
    ///
    /// `unbiased`为true时除以(m-1)（与`torch.std`默认一致），否则除以m；
    /// 样本只有1个元素时无偏标准差没有定义，此时返回0。
    pub fn std_per_sample(&self, unbiased: bool) -> Self {
        let n = self.shape()[0];
        let means = self.mean_per_sample();
        let stds = self
            .data_as_slice()
            .chunks(self.sample_size().max(1))
            .zip(means.data_as_slice())
            .map(|(sample, &mean)| std_of(sample, mean, unbiased))
            .collect::<Vec<_>>();
        Self::new(&stds, &[n])
    }

    /// 4D张量[N, C, H, W]每个通道在(N, H, W)上的均值，返回形状[C]
    pub fn channel_mean(&self) -> Self {
        let (n, c, hw) = self.nchw_dims();
        let data = self.data_as_slice();
        let count = (n * hw) as f32;
        let means = (0..c)
            .map(|ci| channel_iter(data, n, c, hw, ci).sum::<f32>() / count)
            .collect::<Vec<_>>();
        Self::new(&means, &[c])
    }

    /// 4D张量[N, C, H, W]每个通道在(N, H, W)上的方差，返回形状[C]
    ///
    /// `unbiased`为true时除以(m-1)，否则除以m（m = N*H*W）
    pub fn channel_var(&self, unbiased: bool) -> Self {
        let (n, c, hw) = self.nchw_dims();
        let data = self.data_as_slice();
        let means = self.channel_mean();
        let count = n * hw;
        let denominator = if unbiased && count > 1 { count - 1 } else { count };
        let vars = means
            .data_as_slice()
            .iter()
            .enumerate()
            .map(|(ci, &mean)| {
                channel_iter(data, n, c, hw, ci)
                    .map(|x| (x - mean) * (x - mean))
                    .sum::<f32>()
                    / denominator as f32
            })
            .collect::<Vec<_>>();
        Self::new(&vars, &[c])
    }

    /// 2D张量[N, D]每一行的L2范数，返回形状[N]
    pub fn l2_norm_per_row(&self) -> Self {
        let n = self.shape()[0];
        let norms = self
            .data_as_slice()
            .chunks(self.sample_size().max(1))
            .map(|row| row.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect::<Vec<_>>();
        Self::new(&norms, &[n])
    }

    fn nchw_dims(&self) -> (usize, usize, usize) {
        assert_eq!(self.dimension(), 4, "按通道统计要求4D张量[N, C, H, W]");
        let shape = self.shape();
        (shape[0], shape[1], shape[2] * shape[3])
    }
}

fn std_of(sample: &[f32], mean: f32, unbiased: bool) -> f32 {
    let m = sample.len();
    if unbiased && m < 2 {
        return 0.0;
    }
    let denominator = if unbiased { m - 1 } else { m };
    let sum_sq = sample.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>();
    (sum_sq / denominator as f32).sqrt()
}

/// 遍历NCHW布局数据中某个通道的全部元素
fn channel_iter(
    data: &[f32],
    n: usize,
    c: usize,
    hw: usize,
    ci: usize,
) -> impl Iterator<Item = f32> + '_ {
    (0..n).flat_map(move |ni| {
        let start = (ni * c + ci) * hw;
        data[start..start + hw].iter().copied()
    })
}
