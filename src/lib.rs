//! # DesNet
//!
//! `des_net`用纯rust实现了局部图像块描述子网络DesNet：把32x32的灰度图像块映射为
//! 128维、L2归一化的描述子，可用于图像匹配、关键点描述等场景。
//!
//! 为此crate自带一个精简的、PyTorch风格的神经网络框架（`nn`模块）：
//! 基于ndarray的张量、支持反向传播（VJP）的计算图，以及卷积、批归一化、Dropout等层。
//!

pub mod errors;
pub mod model;
pub mod nn;
pub mod tensor;
pub mod utils;
pub mod vision;
