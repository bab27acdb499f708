use crate::assert_err;
use crate::nn::{Dropout, Graph, GraphError, VarActivationOps, VarReduceOps};
use crate::tensor::Tensor;

#[test]
fn test_dropout_train_mode_zeroes_and_rescales() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(7);
    let x = graph.input(&Tensor::ones(&[1, 1000]))?;
    let y = x.dropout(0.5)?;
    y.forward()?;

    let output = y.value()?.unwrap();
    let zeros = output.data_as_slice().iter().filter(|&&v| v == 0.0).count();
    let scaled = output.data_as_slice().iter().filter(|&&v| v == 2.0).count();
    assert_eq!(zeros + scaled, 1000);
    assert!((400..600).contains(&zeros), "置零个数{zeros}偏离期望太多");
    Ok(())
}

#[test]
fn test_dropout_eval_mode_is_identity() -> Result<(), GraphError> {
    let graph = Graph::new();
    graph.eval();
    let data = Tensor::new(&[1., -2., 3., 4.], &[2, 2]);
    let x = graph.input(&data)?;
    let y = Dropout::new(0.4)?.forward(&x)?;
    y.forward()?;
    assert_eq!(y.value()?, Some(data));
    Ok(())
}

#[test]
fn test_dropout_same_seed_same_mask() -> Result<(), GraphError> {
    let run = |seed| -> Result<Tensor, GraphError> {
        let graph = Graph::new_with_seed(seed);
        let y = graph.input(&Tensor::ones(&[4, 16]))?.dropout(0.3)?;
        y.forward()?;
        Ok(y.value()?.unwrap())
    };
    assert_eq!(run(3)?, run(3)?);
    assert_ne!(run(3)?, run(4)?);
    Ok(())
}

#[test]
fn test_dropout_backward_uses_mask() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(11);
    let x = graph.parameter(&[2, 8], "x")?;
    x.set_value(&Tensor::ones(&[2, 8]))?;
    let y = x.dropout(0.25)?;
    let loss = y.sum()?;
    loss.backward()?;

    // 输入全为1时，输出恰好就是掩码（0 或 1/0.75）
    assert_eq!(x.grad()?, y.value()?);
    Ok(())
}

#[test]
fn test_dropout_rejects_invalid_probability() -> Result<(), GraphError> {
    assert_err!(Dropout::new(1.0), GraphError::InvalidOperation(_));
    assert_err!(Dropout::new(-0.1), GraphError::InvalidOperation(_));

    let graph = Graph::new();
    let x = graph.input(&Tensor::ones(&[1, 4]))?;
    assert_err!(x.dropout(1.0), GraphError::InvalidOperation(_));

    // p = 0 合法，训练模式下也是恒等映射
    let y = x.dropout(0.0)?;
    y.forward()?;
    assert_eq!(y.value()?, Some(Tensor::ones(&[1, 4])));
    Ok(())
}
