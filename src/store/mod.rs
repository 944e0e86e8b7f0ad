//! 状态存储模块
//!
//! 归一化的内存状态切片（auth / orders / drivers / customers / notifications），
//! 每个切片由纯 reducer 函数驱动状态迁移。`StateStore` 是唯一的修改入口：
//! 外部组件只能通过 `dispatch_*` 提交动作、通过快照方法读取，
//! 不存在绕过 reducer 的直接修改路径。
//!
//! 每次 dispatch 是一次同步的 reducer 调用，持有写锁期间完成，
//! 不同事件产生的状态更新彼此原子。

pub mod auth;
pub mod customers;
pub mod drivers;
pub mod notifications;
pub mod orders;

pub use auth::{AuthAction, AuthState};
pub use customers::{CustomersAction, CustomersState};
pub use drivers::{DriversAction, DriversState};
pub use notifications::{NotificationsAction, NotificationsState};
pub use orders::{OrdersAction, OrdersState};

use tokio::sync::RwLock;

/// 应用状态存储
#[derive(Default)]
pub struct StateStore {
    auth: RwLock<AuthState>,
    orders: RwLock<OrdersState>,
    drivers: RwLock<DriversState>,
    customers: RwLock<CustomersState>,
    notifications: RwLock<NotificationsState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dispatch_auth(&self, action: AuthAction) {
        let mut state = self.auth.write().await;
        auth::reduce(&mut state, action);
    }

    pub async fn dispatch_orders(&self, action: OrdersAction) {
        let mut state = self.orders.write().await;
        orders::reduce(&mut state, action);
    }

    pub async fn dispatch_drivers(&self, action: DriversAction) {
        let mut state = self.drivers.write().await;
        drivers::reduce(&mut state, action);
    }

    pub async fn dispatch_customers(&self, action: CustomersAction) {
        let mut state = self.customers.write().await;
        customers::reduce(&mut state, action);
    }

    pub async fn dispatch_notifications(&self, action: NotificationsAction) {
        let mut state = self.notifications.write().await;
        notifications::reduce(&mut state, action);
    }

    pub async fn auth(&self) -> AuthState {
        self.auth.read().await.clone()
    }

    pub async fn orders(&self) -> OrdersState {
        self.orders.read().await.clone()
    }

    pub async fn drivers(&self) -> DriversState {
        self.drivers.read().await.clone()
    }

    pub async fn customers(&self) -> CustomersState {
        self.customers.read().await.clone()
    }

    pub async fn notifications(&self) -> NotificationsState {
        self.notifications.read().await.clone()
    }
}
