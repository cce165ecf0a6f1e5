//! Ground-ops backend: variable names, status mapping and the menu adapter.

mod keys;
mod menu;
mod status;

pub use keys::{GroundOpsKeys, DEFAULT_GROUND_OPS_PREFIX};
pub use menu::{
    parse_operator_prompt, read_operator_selection, MenuAdapter, MenuCommand, MenuConfig,
    MenuError, OperatorSelection, DEFAULT_MENU_READY_TIMEOUT, DEFAULT_OPERATOR_EXTRA_DELAY,
    DEFAULT_OPERATOR_SETTLE,
};
pub use status::{
    ServiceKind, ServiceStatus, StatusMapping, StatusTracker, CONNECTION_STATES, SERVICE_STATES,
};
