use crate::nn::{GraphError, Var};

/// 归约扩展 trait
pub trait VarReduceOps {
    /// 全部元素求和，得到 [1, 1] 标量（可直接用于 backward）
    fn sum(&self) -> Result<Var, GraphError>;
}

impl VarReduceOps for Var {
    fn sum(&self) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_sum_node(self.node_id(), None)?;
        Ok(self.wrap(id))
    }
}
