//! orders 切片：订单列表
//!
//! 不变式：列表顺序为服务端全量拉取的插入顺序；按 `id` 打补丁的记录
//! 保持原位置，只更新补丁中给出的字段。

use tracing::debug;

use crate::domain::events::OrderPatch;
use crate::domain::model::OrderRecord;

/// orders 切片状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersState {
    pub orders: Vec<OrderRecord>,
    /// 是否已完成过一次全量拉取
    pub loaded: bool,
}

impl OrdersState {
    pub fn find(&self, id: &str) -> Option<&OrderRecord> {
        self.orders.iter().find(|o| o.id == id)
    }
}

/// orders 切片动作
#[derive(Debug, Clone)]
pub enum OrdersAction {
    /// 全量替换（列表拉取成功）
    Replace(Vec<OrderRecord>),
    /// 按 id 原位打补丁（入站 order_update 事件）
    Patch(OrderPatch),
    /// 清空（会话销毁）
    Clear,
}

/// orders reducer
pub fn reduce(state: &mut OrdersState, action: OrdersAction) {
    match action {
        OrdersAction::Replace(orders) => {
            state.orders = orders;
            state.loaded = true;
        }
        OrdersAction::Patch(patch) => {
            match state.orders.iter_mut().find(|o| o.id == patch.id) {
                Some(record) => apply_patch(record, patch),
                None => {
                    // 未命中的补丁不修改任何状态
                    debug!(order_id = %patch.id, "Order patch target not in store, ignoring");
                }
            }
        }
        OrdersAction::Clear => {
            state.orders.clear();
            state.loaded = false;
        }
    }
}

fn apply_patch(record: &mut OrderRecord, patch: OrderPatch) {
    if let Some(order_number) = patch.order_number {
        record.order_number = order_number;
    }
    if let Some(status) = patch.status {
        record.status = status;
    }
    for (key, value) in patch.extra {
        record.extra.insert(key, value);
    }
}
