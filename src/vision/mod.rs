/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 本模块负责把图像整理成 DesNet 可以直接使用的输入：
 *                 任意尺寸、任意颜色格式的图像块 → 32x32 灰度 → [1, 32, 32] 张量，
 *                 多个图像块再堆叠为 [N, 1, 32, 32] 的批次。
 *                 “灰度”等同于英文中luma、luminance、grey、gray的概念。
 */

use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::errors::TensorError;
use crate::model::PATCH_SIZE;
use crate::tensor::Tensor;

#[cfg(test)]
mod tests;

pub struct Vision;

impl Vision {
    /// 把图像转为8位灰度并（双线性）缩放到 `PATCH_SIZE` x `PATCH_SIZE`，返回形状[1, 32, 32]的张量
    ///
    /// 像素值保持在[0, 255]，不做归一化（DesNet 前向时自行按样本标准化）。
    pub fn patch_from_image(image: &DynamicImage) -> Tensor {
        let side = PATCH_SIZE as u32;
        let mut gray = image.to_luma8();
        if gray.dimensions() != (side, side) {
            gray = image::imageops::resize(&gray, side, side, FilterType::Triangle);
        }
        let plane = Tensor::from_gray_image(&gray);
        Tensor::new(plane.data_as_slice(), &[1, PATCH_SIZE, PATCH_SIZE])
    }

    /// 从本地文件加载一个图像块
    pub fn load_patch<P: AsRef<Path>>(path: P) -> Result<Tensor, image::ImageError> {
        let image = image::open(path)?;
        Ok(Self::patch_from_image(&image))
    }

    /// 把若干[1, 32, 32]的图像块堆叠成[N, 1, 32, 32]的批次
    pub fn stack_patches(patches: &[Tensor]) -> Result<Tensor, TensorError> {
        Tensor::stack(patches)
    }
}
