use crate::errors::TensorError;
use crate::model::PATCH_SIZE;
use crate::tensor::Tensor;
use crate::vision::Vision;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

#[test]
fn test_patch_from_gray_image_keeps_pixels_at_patch_size() {
    let gray = GrayImage::from_fn(32, 32, |x, y| Luma([((x + y) * 4) as u8]));
    let patch = Vision::patch_from_image(&DynamicImage::ImageLuma8(gray));
    assert_eq!(patch.shape(), &[1, PATCH_SIZE, PATCH_SIZE]);
    assert_eq!(patch[[0, 0, 0]], 0.);
    assert_eq!(patch[[0, 3, 5]], 32.);
    assert_eq!(patch[[0, 31, 31]], 248.);
}

#[test]
fn test_patch_from_rgb_image_is_resized_to_gray() {
    // 64x48 的纯色 RGB 图：缩放后仍是同一灰度值
    let rgb = RgbImage::from_pixel(64, 48, Rgb([200, 200, 200]));
    let patch = Vision::patch_from_image(&DynamicImage::ImageRgb8(rgb));
    assert_eq!(patch.shape(), &[1, 32, 32]);
    assert_eq!(patch, Tensor::full(200., &[1, 32, 32]));
}

#[test]
fn test_stack_patches() {
    let patches = vec![Tensor::zeros(&[1, 32, 32]), Tensor::ones(&[1, 32, 32])];
    let batch = Vision::stack_patches(&patches).unwrap();
    assert_eq!(batch.shape(), &[2, 1, 32, 32]);
    assert_eq!(batch[[1, 0, 7, 9]], 1.);

    assert_eq!(Vision::stack_patches(&[]), Err(TensorError::EmptyList));
    let mixed = vec![Tensor::zeros(&[1, 32, 32]), Tensor::zeros(&[1, 16, 16])];
    assert_eq!(
        Vision::stack_patches(&mixed),
        Err(TensorError::InconsitentShape)
    );
}

#[test]
fn test_load_patch_from_file() {
    let path = std::env::temp_dir().join(format!("des_net_patch_{}.png", std::process::id()));
    GrayImage::from_pixel(40, 40, Luma([77])).save(&path).unwrap();

    let patch = Vision::load_patch(&path).unwrap();
    assert_eq!(patch, Tensor::full(77., &[1, 32, 32]));

    std::fs::remove_file(&path).ok();
    assert!(Vision::load_patch(&path).is_err());
}
