//! notifications 切片：持久通知与未读计数
//!
//! 不变式：`unread_count` 始终等于 `is_read == false` 的记录数。
//! 全量替换时重算；插入未读记录时递增；单条已读时递减（下限为零）；
//! 全部已读时清零。

use crate::domain::model::Notification;

/// notifications 切片状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationsState {
    /// 最新在前的有序通知列表
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub loaded: bool,
}

impl NotificationsState {
    pub fn find(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    fn count_unread(notifications: &[Notification]) -> usize {
        notifications.iter().filter(|n| !n.is_read).count()
    }
}

/// notifications 切片动作
#[derive(Debug, Clone)]
pub enum NotificationsAction {
    /// 全量替换（列表拉取成功），未读计数重算
    Replace(Vec<Notification>),
    /// 头部插入一条合成通知（入站 system_alert 事件）
    Prepend(Notification),
    /// 单条标记已读（服务端确认之后才会派发）
    MarkRead(String),
    /// 全部标记已读
    MarkAllRead,
    /// 清空（会话销毁）
    Clear,
}

/// notifications reducer
pub fn reduce(state: &mut NotificationsState, action: NotificationsAction) {
    match action {
        NotificationsAction::Replace(notifications) => {
            state.unread_count = NotificationsState::count_unread(&notifications);
            state.notifications = notifications;
            state.loaded = true;
        }
        NotificationsAction::Prepend(notification) => {
            if !notification.is_read {
                state.unread_count += 1;
            }
            state.notifications.insert(0, notification);
        }
        NotificationsAction::MarkRead(id) => {
            // 仅当记录存在且原先未读时递减；不存在则静默无操作
            if let Some(notification) = state.notifications.iter_mut().find(|n| n.id == id) {
                if !notification.is_read {
                    notification.is_read = true;
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
            }
        }
        NotificationsAction::MarkAllRead => {
            for notification in &mut state.notifications {
                notification.is_read = true;
            }
            state.unread_count = 0;
        }
        NotificationsAction::Clear => {
            state.notifications.clear();
            state.unread_count = 0;
            state.loaded = false;
        }
    }
}
