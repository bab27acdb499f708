use super::Tensor;
use image::GrayImage;

impl Tensor {
    /// 把8位灰度图转为形状[H, W]的张量，像素值保持在[0, 255]
    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.pixels().map(|p| f32::from(p.0[0])).collect::<Vec<_>>();
        Self::new(&data, &[height as usize, width as usize])
    }
}
