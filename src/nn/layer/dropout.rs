use crate::nn::{GraphError, Var, VarActivationOps};

/// Dropout 层：训练模式下以概率 p 置零，评估模式下为恒等映射
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    /// `p` 必须在 [0, 1) 范围内
    pub fn new(p: f32) -> Result<Self, GraphError> {
        if !(0.0..1.0).contains(&p) {
            return Err(GraphError::InvalidOperation(format!(
                "Dropout 概率必须在 [0, 1) 范围内，得到 {p}"
            )));
        }
        Ok(Self { p })
    }

    pub const fn p(&self) -> f32 {
        self.p
    }

    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        x.dropout(self.p)
    }
}
