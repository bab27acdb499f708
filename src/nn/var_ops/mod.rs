/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Var 扩展 trait 模块
 *
 * 按功能领域组织 Var 的扩展方法，用户按需 import。
 *
 * # 模块结构
 * - `activation`: 激活与正则（relu, dropout）
 * - `normalize`: 归一化（l2_normalize, standardize_per_sample）
 * - `reduce`: 归约（sum）
 * - `shape`: 形状变换（flatten）
 *
 * # 使用示例
 * ```ignore
 * use des_net::nn::{Var, VarActivationOps, VarNormOps, VarReduceOps, VarShapeOps};
 *
 * let h = x.standardize_per_sample()?.relu()?;
 * let desc = h.flatten()?.l2_normalize()?;
 * let loss = desc.sum()?;
 * ```
 */

mod activation;
mod normalize;
mod reduce;
mod shape;

pub use activation::VarActivationOps;
pub use normalize::VarNormOps;
pub use reduce::VarReduceOps;
pub use shape::VarShapeOps;
