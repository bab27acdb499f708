/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 基于 nn 模块搭建的完整模型
 */

mod des_net;

pub use des_net::{
    BIAS_INIT_VALUE, DESCRIPTOR_DIM, DesNet, ORTHOGONAL_GAIN, PATCH_SIZE, Stage,
};

#[cfg(test)]
mod tests;
