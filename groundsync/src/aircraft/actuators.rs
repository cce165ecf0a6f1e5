//! Write wrappers around aircraft-backend variables.
//!
//! Setters always write. Deduplication is the job of the service state
//! machines, which track what they already asked for.

use std::fmt;

use tracing::{debug, info};

use super::keys::AircraftKeys;
use crate::variables::{BackendError, SharedBackend, VarValue};

/// Doors the ground services operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Door {
    ForwardCargo,
    AftCargo,
    ForwardRight,
    AftRight,
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Door::ForwardCargo => "forward cargo",
            Door::AftCargo => "aft cargo",
            Door::ForwardRight => "forward right",
            Door::AftRight => "aft right",
        };
        write!(f, "{}", s)
    }
}

/// Ground equipment connected to the aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroundEquipment {
    Chocks,
    Gpu,
    Pca,
}

impl fmt::Display for GroundEquipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroundEquipment::Chocks => "chocks",
            GroundEquipment::Gpu => "GPU",
            GroundEquipment::Pca => "PCA",
        };
        write!(f, "{}", s)
    }
}

/// Reads and writes aircraft state.
#[derive(Clone)]
pub struct AircraftActuators {
    backend: SharedBackend,
    keys: AircraftKeys,
}

impl AircraftActuators {
    pub fn new(backend: SharedBackend, keys: AircraftKeys) -> Self {
        Self { backend, keys }
    }

    pub fn keys(&self) -> &AircraftKeys {
        &self.keys
    }

    pub async fn set_door(&self, door: Door, open: bool) -> Result<(), BackendError> {
        info!(door = %door, open, "Setting door");
        self.backend
            .write(self.keys.door(door), VarValue::Bool(open))
            .await
    }

    pub async fn door_open(&self, door: Door) -> Result<bool, BackendError> {
        Ok(self.backend.read(self.keys.door(door)).await?.as_bool())
    }

    pub async fn set_equipment(
        &self,
        equipment: GroundEquipment,
        connected: bool,
    ) -> Result<(), BackendError> {
        info!(equipment = %equipment, connected, "Setting ground equipment");
        self.backend
            .write(self.keys.equipment(equipment), VarValue::Bool(connected))
            .await
    }

    pub async fn equipment_connected(
        &self,
        equipment: GroundEquipment,
    ) -> Result<bool, BackendError> {
        Ok(self
            .backend
            .read(self.keys.equipment(equipment))
            .await?
            .as_bool())
    }

    pub async fn set_fuel(&self, quantity: f64) -> Result<(), BackendError> {
        debug!(quantity, "Setting fuel quantity");
        self.backend
            .write(&self.keys.fuel_quantity, VarValue::Number(quantity))
            .await
    }

    pub async fn fuel(&self) -> Result<f64, BackendError> {
        let name = &self.keys.fuel_quantity;
        self.backend
            .read(name)
            .await?
            .as_f64()
            .ok_or_else(|| BackendError::Format {
                name: name.clone(),
                reason: "fuel quantity is not a number".to_string(),
            })
    }

    pub async fn set_passengers(&self, count: u32) -> Result<(), BackendError> {
        debug!(count, "Setting passenger count");
        self.backend
            .write(&self.keys.passenger_count, VarValue::from(count))
            .await
    }

    pub async fn passengers(&self) -> Result<u32, BackendError> {
        let name = &self.keys.passenger_count;
        let value = self.backend.read(name).await?;
        value
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| BackendError::Format {
                name: name.clone(),
                reason: format!("'{}' is not a passenger count", value),
            })
    }

    pub async fn set_seat(&self, index: usize, occupied: bool) -> Result<(), BackendError> {
        debug!(seat = index, occupied, "Setting seat");
        self.backend
            .write(&self.keys.seat(index), VarValue::Bool(occupied))
            .await
    }

    pub async fn seat(&self, index: usize) -> Result<bool, BackendError> {
        Ok(self.backend.read(&self.keys.seat(index)).await?.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::MemoryBackend;
    use std::sync::Arc;

    fn actuators() -> (Arc<MemoryBackend>, AircraftActuators) {
        let backend = Arc::new(MemoryBackend::new());
        let actuators = AircraftActuators::new(backend.clone(), AircraftKeys::default());
        (backend, actuators)
    }

    #[tokio::test]
    async fn test_setters_write_unconditionally() {
        let (backend, actuators) = actuators();
        actuators.set_door(Door::ForwardCargo, true).await.unwrap();
        actuators.set_door(Door::ForwardCargo, true).await.unwrap();

        assert_eq!(backend.writes_to("aircraft.doors.cargo_fwd").len(), 2);
        assert!(actuators.door_open(Door::ForwardCargo).await.unwrap());
    }

    #[tokio::test]
    async fn test_fuel_and_passengers() {
        let (backend, actuators) = actuators();
        actuators.set_fuel(2500.0).await.unwrap();
        actuators.set_passengers(120).await.unwrap();

        assert_eq!(actuators.fuel().await.unwrap(), 2500.0);
        assert_eq!(actuators.passengers().await.unwrap(), 120);

        backend.set("aircraft.payload.pax_count", "many");
        assert!(matches!(
            actuators.passengers().await,
            Err(BackendError::Format { .. })
        ));
    }

    #[tokio::test]
    async fn test_seat_elements() {
        let (backend, actuators) = actuators();
        actuators.set_seat(7, true).await.unwrap();
        assert_eq!(
            backend.get("aircraft.payload.seats[7]"),
            Some(VarValue::Bool(true))
        );
        assert!(actuators.seat(7).await.unwrap());
    }
}
