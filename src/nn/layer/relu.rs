use crate::nn::{GraphError, Var, VarActivationOps};

/// ReLU 层（无参数）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReLU;

impl ReLU {
    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        x.relu()
    }
}
