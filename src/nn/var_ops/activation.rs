/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Var 激活函数扩展 trait
 *
 * 提供激活函数的链式调用支持，用户需 import 此 trait 后才能使用。
 */

use crate::nn::{GraphError, Var};

/// 激活函数扩展 trait
///
/// - `relu()`: `ReLU` 激活
/// - `dropout(p)`: 训练模式下随机置零（评估模式为恒等映射）
pub trait VarActivationOps {
    /// `ReLU` 激活：max(0, x)
    fn relu(&self) -> Result<Var, GraphError>;

    /// Dropout：以概率 p 置零并把其余元素放大 1/(1-p)，p 须在 [0, 1) 内
    fn dropout(&self, p: f32) -> Result<Var, GraphError>;
}

impl VarActivationOps for Var {
    fn relu(&self) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_relu_node(self.node_id(), None)?;
        Ok(self.wrap(id))
    }

    fn dropout(&self, p: f32) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_dropout_node(self.node_id(), p, None)?;
        Ok(self.wrap(id))
    }
}
