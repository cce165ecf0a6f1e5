//! Effects requested by the service machines.

use crate::aircraft::Door;
use crate::loadsheet::LoadsheetKind;

use super::automation::AutomationStep;

/// Something the runner must do on behalf of a machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetDoor { door: Door, open: bool },
    SetFuel(f64),
    SetPassengers(u32),
    SetSeat { index: usize, occupied: bool },
    RequestLoadsheet(LoadsheetKind),
    Automate(AutomationStep),
}
