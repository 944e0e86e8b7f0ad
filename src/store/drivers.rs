//! drivers 切片：车队司机与实时位置

use tracing::debug;

use crate::domain::events::DriverLocationUpdate;
use crate::domain::model::DriverRecord;

/// drivers 切片状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriversState {
    pub drivers: Vec<DriverRecord>,
    pub loaded: bool,
}

impl DriversState {
    pub fn find(&self, id: &str) -> Option<&DriverRecord> {
        self.drivers.iter().find(|d| d.id == id)
    }
}

/// drivers 切片动作
#[derive(Debug, Clone)]
pub enum DriversAction {
    Replace(Vec<DriverRecord>),
    /// 入站 driver_location 事件：按司机 id 更新坐标
    LocationUpdate(DriverLocationUpdate),
    Clear,
}

/// drivers reducer
pub fn reduce(state: &mut DriversState, action: DriversAction) {
    match action {
        DriversAction::Replace(drivers) => {
            state.drivers = drivers;
            state.loaded = true;
        }
        DriversAction::LocationUpdate(update) => {
            match state.drivers.iter_mut().find(|d| d.id == update.driver_id) {
                Some(driver) => {
                    driver.latitude = Some(update.latitude);
                    driver.longitude = Some(update.longitude);
                }
                None => {
                    debug!(driver_id = %update.driver_id, "Location update for unknown driver, ignoring");
                }
            }
        }
        DriversAction::Clear => {
            state.drivers.clear();
            state.loaded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn driver(id: &str) -> DriverRecord {
        DriverRecord {
            id: id.to_string(),
            name: format!("driver-{}", id),
            latitude: None,
            longitude: None,
            extra: Map::new(),
        }
    }

    /// 测试：位置更新只命中对应司机
    #[test]
    fn test_location_update_targets_single_driver() {
        let mut state = DriversState::default();
        reduce(
            &mut state,
            DriversAction::Replace(vec![driver("d-1"), driver("d-2")]),
        );

        reduce(
            &mut state,
            DriversAction::LocationUpdate(DriverLocationUpdate {
                driver_id: "d-2".to_string(),
                latitude: 31.23,
                longitude: 121.47,
            }),
        );

        assert_eq!(state.find("d-1").unwrap().latitude, None);
        assert_eq!(state.find("d-2").unwrap().latitude, Some(31.23));
        assert_eq!(state.find("d-2").unwrap().longitude, Some(121.47));
    }

    /// 测试：未知司机的位置更新不修改状态
    #[test]
    fn test_location_update_unknown_driver_is_noop() {
        let mut state = DriversState::default();
        reduce(&mut state, DriversAction::Replace(vec![driver("d-1")]));
        let before = state.clone();

        reduce(
            &mut state,
            DriversAction::LocationUpdate(DriverLocationUpdate {
                driver_id: "ghost".to_string(),
                latitude: 0.0,
                longitude: 0.0,
            }),
        );

        assert_eq!(state, before);
    }
}
