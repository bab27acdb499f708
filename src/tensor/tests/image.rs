use crate::tensor::Tensor;
use image::{GrayImage, Luma};

#[test]
fn test_from_gray_image() {
    let mut image = GrayImage::new(3, 2);
    image.put_pixel(0, 0, Luma([0]));
    image.put_pixel(2, 0, Luma([255]));
    image.put_pixel(1, 1, Luma([128]));

    let t = Tensor::from_gray_image(&image);
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t[[0, 0]], 0.);
    assert_eq!(t[[0, 2]], 255.);
    assert_eq!(t[[1, 1]], 128.);
    assert_eq!(t.sum(), 255. + 128.);
}
