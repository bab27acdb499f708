/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Var 归一化扩展 trait
 */

use crate::nn::{GraphError, Var};

/// L2 归一化的默认 eps（加在平方和上）
pub const L2_NORMALIZE_EPS: f32 = 1e-10;
/// 按样本标准化的默认 eps（加在标准差上）
pub const STANDARDIZE_EPS: f32 = 1e-7;

/// 归一化扩展 trait
pub trait VarNormOps {
    /// 按行 L2 归一化：x / sqrt(Σx² + 1e-10)，输入须为 [N, D]
    fn l2_normalize(&self) -> Result<Var, GraphError>;

    /// 按样本标准化：(x - mean) / (std + 1e-7)，统计量对梯度视作常数
    fn standardize_per_sample(&self) -> Result<Var, GraphError>;
}

impl VarNormOps for Var {
    fn l2_normalize(&self) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_l2_normalize_node(self.node_id(), L2_NORMALIZE_EPS, None)?;
        Ok(self.wrap(id))
    }

    fn standardize_per_sample(&self) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_sample_standardize_node(self.node_id(), STANDARDIZE_EPS, None)?;
        Ok(self.wrap(id))
    }
}
