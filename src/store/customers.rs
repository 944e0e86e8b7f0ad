//! customers 切片：客户列表

use crate::domain::model::CustomerRecord;

/// customers 切片状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomersState {
    pub customers: Vec<CustomerRecord>,
    pub loaded: bool,
}

/// customers 切片动作
#[derive(Debug, Clone)]
pub enum CustomersAction {
    Replace(Vec<CustomerRecord>),
    Clear,
}

/// customers reducer
pub fn reduce(state: &mut CustomersState, action: CustomersAction) {
    match action {
        CustomersAction::Replace(customers) => {
            state.customers = customers;
            state.loaded = true;
        }
        CustomersAction::Clear => {
            state.customers.clear();
            state.loaded = false;
        }
    }
}
