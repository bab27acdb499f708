/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Layer 模块 - 组合 Node 构建常见网络结构（PyTorch 风格 API）
 *
 * 带参数的层（Conv2d、BatchNorm2d）在创建时就向图中声明参数/状态节点，
 * 每次 `forward` 只追加新的算子节点。
 */

mod batch_norm2d;
mod conv2d;
mod dropout;
mod relu;

pub use batch_norm2d::BatchNorm2d;
pub use conv2d::Conv2d;
pub use dropout::Dropout;
pub use relu::ReLU;
