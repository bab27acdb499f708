use crate::errors::TensorError;
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_new() {
    let t = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t.dimension(), 2);
    assert_eq!(t.size(), 6);
    assert_eq!(t[[1, 0]], 4.);
    assert_eq!(t.data_as_slice(), &[1., 2., 3., 4., 5., 6.]);
}

#[test]
#[should_panic(expected = "数据长度5与形状[2, 3]所需的元素个数不一致")]
fn test_new_with_wrong_data_len() {
    Tensor::new(&[1., 2., 3., 4., 5.], &[2, 3]);
}

#[test]
fn test_zeros_ones_full() {
    assert_eq!(Tensor::zeros(&[2, 2]).sum(), 0.);
    assert_eq!(Tensor::ones(&[2, 3]).sum(), 6.);
    assert_eq!(Tensor::full(0.5, &[4]).sum(), 2.);
}

#[test]
fn test_get_data_number() {
    assert_eq!(Tensor::new(&[3.5], &[1, 1]).get_data_number(), Some(3.5));
    assert_eq!(Tensor::ones(&[2]).get_data_number(), None);
}

#[test]
fn test_index_mut() {
    let mut t = Tensor::zeros(&[1, 2, 2, 2]);
    t[[0, 1, 1, 0]] = 7.;
    assert_eq!(t[[0, 1, 1, 0]], 7.);
    assert_eq!(t.sum(), 7.);
}

#[test]
fn test_normal_with_rng_is_reproducible() {
    let mut rng_1 = StdRng::seed_from_u64(42);
    let mut rng_2 = StdRng::seed_from_u64(42);
    let a = Tensor::normal_with_rng(0., 1., &[3, 5], &mut rng_1);
    let b = Tensor::normal_with_rng(0., 1., &[3, 5], &mut rng_2);
    assert_eq!(a, b);
    assert_eq!(a.shape(), &[3, 5]);
}

#[test]
fn test_normal_with_rng_statistics() {
    let mut rng = StdRng::seed_from_u64(7);
    let t = Tensor::normal_with_rng(2., 0.5, &[1, 20000], &mut rng);
    let mean = t.mean_per_sample().data_as_slice()[0];
    let std = t.std_per_sample(false).data_as_slice()[0];
    assert!((mean - 2.).abs() < 0.02, "均值偏离过大: {mean}");
    assert!((std - 0.5).abs() < 0.02, "标准差偏离过大: {std}");
}

#[test]
fn test_bernoulli_with_rng() {
    let mut rng = StdRng::seed_from_u64(1);
    let mask = Tensor::bernoulli_with_rng(0.7, &[100, 100], &mut rng);
    assert!(mask.data_as_slice().iter().all(|&x| x == 0. || x == 1.));
    let ratio = mask.sum() / mask.size() as f32;
    assert!((ratio - 0.7).abs() < 0.02, "保留比例偏离过大: {ratio}");
}

#[test]
fn test_stack() {
    let a = Tensor::new(&[1., 2.], &[1, 2]);
    let b = Tensor::new(&[3., 4.], &[1, 2]);
    let stacked = Tensor::stack(&[a.clone(), b]).unwrap();
    assert_eq!(stacked.shape(), &[2, 1, 2]);
    assert_eq!(stacked.data_as_slice(), &[1., 2., 3., 4.]);

    assert_eq!(Tensor::stack(&[]), Err(TensorError::EmptyList));
    assert_eq!(
        Tensor::stack(&[a, Tensor::ones(&[2])]),
        Err(TensorError::InconsitentShape)
    );
}
