/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : GraphInner 参数序列化（save_params/load_params）
 *
 * 文件内容为 bincode 编码的 `ParamsFile`：魔数 + 版本 + 按节点名索引的张量列表。
 * 保存范围是所有参数节点和状态节点（如 BatchNorm 的 running 统计量）。
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::NodeType;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct ParamsFile {
    magic: [u8; 4],
    version: u32,
    entries: Vec<(String, Tensor)>,
}

impl GraphInner {
    /// 参数文件魔数
    const PARAMS_MAGIC: [u8; 4] = *b"DNPR";
    /// 参数文件版本
    const PARAMS_VERSION: u32 = 1;

    /// 保存所有参数与状态节点的值到二进制文件
    pub fn save_params<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let mut entries = Vec::new();
        for id in self.persistent_nodes() {
            let node = self.get_node(id)?;
            let value = node.value().ok_or_else(|| {
                GraphError::ComputationError(format!("{node}没有值，无法保存"))
            })?;
            entries.push((node.name().to_string(), value.clone()));
        }

        let file = File::create(path.as_ref())
            .map_err(|e| GraphError::ComputationError(format!("无法创建参数文件: {e}")))?;
        let mut writer = BufWriter::new(file);
        let params_file = ParamsFile {
            magic: Self::PARAMS_MAGIC,
            version: Self::PARAMS_VERSION,
            entries,
        };
        bincode::serialize_into(&mut writer, &params_file)
            .map_err(|e| GraphError::ComputationError(format!("写入参数失败: {e}")))?;
        writer
            .flush()
            .map_err(|e| GraphError::ComputationError(format!("刷新缓冲区失败: {e}")))?;

        log::info!(
            "已保存{}个参数/状态张量到{}",
            params_file.entries.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// 从二进制文件加载参数与状态
    ///
    /// 按节点名匹配；文件中多出的名称会被跳过（记录警告），形状不符则报错。
    pub fn load_params<P: AsRef<Path>>(&mut self, path: P) -> Result<(), GraphError> {
        let file = File::open(path.as_ref())
            .map_err(|e| GraphError::ComputationError(format!("无法打开参数文件: {e}")))?;
        let params_file: ParamsFile = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| GraphError::ComputationError(format!("读取参数文件失败: {e}")))?;

        if params_file.magic != Self::PARAMS_MAGIC {
            return Err(GraphError::ComputationError(
                "无效的参数文件：请确保使用 save_params() 保存的文件".to_string(),
            ));
        }
        if params_file.version != Self::PARAMS_VERSION {
            return Err(GraphError::ComputationError(format!(
                "不支持的参数文件版本: {}",
                params_file.version
            )));
        }

        let name_to_id: HashMap<String, NodeId> = self
            .persistent_nodes()
            .into_iter()
            .filter_map(|id| {
                self.get_node(id)
                    .ok()
                    .map(|node| (node.name().to_string(), id))
            })
            .collect();

        // 先校验全部形状再写入，失败时图保持原样
        let mut matched = Vec::with_capacity(params_file.entries.len());
        for (name, tensor) in &params_file.entries {
            match name_to_id.get(name) {
                Some(&node_id) => {
                    let expected = self.get_node_expected_shape(node_id)?;
                    if tensor.shape() != expected.as_slice() {
                        return Err(GraphError::ShapeMismatch {
                            expected,
                            got: tensor.shape().to_vec(),
                            message: format!("参数文件中{name}的形状与图中节点不一致"),
                        });
                    }
                    matched.push((node_id, tensor));
                }
                None => log::warn!("参数文件中的{name}在图{}中不存在，已跳过", self.name()),
            }
        }

        let loaded = matched.len();
        for (node_id, tensor) in matched {
            self.set_node_value(node_id, tensor)?;
        }

        log::info!(
            "从{}加载了{loaded}个参数/状态张量",
            path.as_ref().display()
        );
        Ok(())
    }

    fn persistent_nodes(&self) -> Vec<NodeId> {
        self.nodes_of(|node| {
            matches!(node.node_type(), NodeType::Parameter(_) | NodeType::State(_))
        })
    }
}
