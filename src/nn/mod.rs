/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : 负责神经网络（neural network）的构建：计算图、节点、层
 */

mod graph;
pub mod layer;
mod module;
mod nodes;
mod var;
mod var_ops;

pub use graph::{Graph, GraphCheckpoint, GraphError, GraphInner};
pub use layer::{BatchNorm2d, Conv2d, Dropout, ReLU};
pub use module::Module;
pub use nodes::NodeId;
pub use var::{Init, Var};
pub use var_ops::{VarActivationOps, VarNormOps, VarReduceOps, VarShapeOps};

#[cfg(test)]
mod tests;
