/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : GraphInner checkpoint/rollback
 *
 * 每次用新输入求值都会向图中追加一批临时节点（输入节点和其下游的算子节点）。
 * 先记录 checkpoint，求值完成后 rollback，即可把这些节点连同相关的边一起丢弃，
 * 而参数和状态节点（创建于 checkpoint 之前）保持不变。
 */

use super::GraphInner;
use crate::nn::NodeId;

/// 图在某一时刻的节点水位线
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphCheckpoint {
    last_node_id: u64,
}

impl GraphInner {
    pub const fn checkpoint(&self) -> GraphCheckpoint {
        GraphCheckpoint {
            last_node_id: self.next_id,
        }
    }

    /// 删除 checkpoint 之后创建的全部节点，返回删除的节点数
    ///
    /// 节点 id 不会回收，之后新建的节点 id 仍然单调递增。
    pub fn rollback(&mut self, checkpoint: GraphCheckpoint) -> usize {
        let is_transient = |id: &NodeId| id.0 > checkpoint.last_node_id;

        let before = self.nodes.len();
        self.nodes.retain(|id, _| !is_transient(id));
        self.backward_edges.retain(|id, _| !is_transient(id));
        self.forward_edges.retain(|id, _| !is_transient(id));
        for children in self.forward_edges.values_mut() {
            children.retain(|id| !is_transient(id));
        }
        self.forward_edges.retain(|_, children| !children.is_empty());

        before - self.nodes.len()
    }
}
