//! Ground equipment sequencing.
//!
//! There is no state machine here: connection state lives in the backends.
//! The controller only orders the steps and spaces them out so the ground
//! crew animations do not overlap.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use super::automation::AutomationError;
use crate::aircraft::{AircraftActuators, GroundEquipment};
use crate::ground_ops::{GroundOpsKeys, MenuAdapter, MenuCommand, ServiceStatus, CONNECTION_STATES};
use crate::variables::VariableObserver;

/// Default pause after each equipment step.
pub const DEFAULT_EQUIPMENT_SETTLE: Duration = Duration::from_millis(1500);

const AIRCRAFT_EQUIPMENT: [GroundEquipment; 3] = [
    GroundEquipment::Chocks,
    GroundEquipment::Gpu,
    GroundEquipment::Pca,
];

/// Connects and disconnects ground equipment in a fixed order.
#[derive(Clone)]
pub struct GroundEquipmentController {
    actuators: AircraftActuators,
    menu: MenuAdapter,
    observer: VariableObserver,
    keys: GroundOpsKeys,
    settle: Duration,
}

impl GroundEquipmentController {
    pub fn new(
        actuators: AircraftActuators,
        menu: MenuAdapter,
        observer: VariableObserver,
        keys: GroundOpsKeys,
        settle: Duration,
    ) -> Self {
        Self {
            actuators,
            menu,
            observer,
            keys,
            settle,
        }
    }

    /// Chocks, GPU, PCA, then jetway and stairs. Already connected items are skipped.
    pub async fn connect_all(&self) -> Result<(), AutomationError> {
        info!("Connecting ground equipment");
        for equipment in AIRCRAFT_EQUIPMENT {
            self.set(equipment, true).await?;
        }
        for command in [MenuCommand::Jetway, MenuCommand::Stairs] {
            if !self.docked(command).await? {
                self.menu.call(command).await?;
                sleep(self.settle).await;
            }
        }
        Ok(())
    }

    /// Exact reverse of [`connect_all`](Self::connect_all).
    pub async fn disconnect_all(&self) -> Result<(), AutomationError> {
        info!("Disconnecting ground equipment");
        for command in [MenuCommand::Stairs, MenuCommand::Jetway] {
            if self.docked(command).await? {
                self.menu.call(command).await?;
                sleep(self.settle).await;
            }
        }
        for equipment in AIRCRAFT_EQUIPMENT.into_iter().rev() {
            self.set(equipment, false).await?;
        }
        Ok(())
    }

    async fn set(&self, equipment: GroundEquipment, connected: bool) -> Result<(), AutomationError> {
        // an unreadable state counts as the opposite, so the write is attempted
        let current = self
            .actuators
            .equipment_connected(equipment)
            .await
            .unwrap_or(!connected);
        if current == connected {
            debug!(equipment = %equipment, connected, "Equipment already in place");
            return Ok(());
        }
        self.actuators.set_equipment(equipment, connected).await?;
        sleep(self.settle).await;
        Ok(())
    }

    /// Whether the jetway or stairs are attached or on their way.
    async fn docked(&self, command: MenuCommand) -> Result<bool, AutomationError> {
        let key = match command {
            MenuCommand::Stairs => &self.keys.stairs_state,
            _ => &self.keys.jetway_state,
        };
        let status = self
            .observer
            .current(key)
            .await?
            .and_then(|v| v.as_i64())
            .map(|code| CONNECTION_STATES.map(code))
            .unwrap_or_default();
        Ok(matches!(
            status,
            ServiceStatus::Requested | ServiceStatus::Active | ServiceStatus::Completed
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::AircraftKeys;
    use crate::events::EventBus;
    use crate::ground_ops::MenuConfig;
    use crate::variables::{MemoryBackend, ObserverConfig, VarValue};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    async fn controller(backend: Arc<MemoryBackend>) -> (GroundEquipmentController, CancellationToken) {
        let cancel = CancellationToken::new();
        let (observer, _) = VariableObserver::start(
            backend.clone(),
            EventBus::new(),
            ObserverConfig {
                poll_interval: Duration::from_millis(10),
            },
            cancel.clone(),
        );
        let keys = GroundOpsKeys::default();
        for key in [&keys.jetway_state, &keys.stairs_state, &keys.menu_ready] {
            observer.subscribe(key.clone(), |_| {}).await.unwrap();
        }
        let menu = MenuAdapter::new(
            backend.clone(),
            observer.clone(),
            keys.clone(),
            MenuConfig {
                ready_timeout: Duration::from_millis(20),
                operator_settle: Duration::ZERO,
                operator_extra_delay: Duration::ZERO,
                ..Default::default()
            },
        );
        let actuators = AircraftActuators::new(backend, AircraftKeys::default());
        (
            GroundEquipmentController::new(actuators, menu, observer, keys, Duration::ZERO),
            cancel,
        )
    }

    #[tokio::test]
    async fn test_connect_all_order_and_skips() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("aircraft.ground.chocks", false);
        backend.set("aircraft.ground.gpu", true);
        backend.set("aircraft.ground.pca", false);
        backend.set("FSDT_GSX_JETWAY", 1.0);
        backend.set("FSDT_GSX_STAIRS", 6.0);
        backend.set("FSDT_GSX_MENU_READY", true);
        let (controller, cancel) = controller(backend.clone()).await;

        controller.connect_all().await.unwrap();

        let names: Vec<String> = backend.writes().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "aircraft.ground.chocks",
                "aircraft.ground.pca",
                "FSDT_GSX_MENU_OPEN",
                "FSDT_GSX_MENU_CHOICE",
            ]
        );
        // jetway is line 6
        assert_eq!(
            backend.writes_to("FSDT_GSX_MENU_CHOICE"),
            vec![VarValue::Number(5.0)]
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_disconnect_all_is_reverse() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("aircraft.ground.chocks", true);
        backend.set("aircraft.ground.gpu", true);
        backend.set("aircraft.ground.pca", true);
        backend.set("FSDT_GSX_JETWAY", 6.0);
        backend.set("FSDT_GSX_STAIRS", 6.0);
        backend.set("FSDT_GSX_MENU_READY", true);
        let (controller, cancel) = controller(backend.clone()).await;

        controller.disconnect_all().await.unwrap();

        assert_eq!(
            backend.writes_to("FSDT_GSX_MENU_CHOICE"),
            vec![VarValue::Number(6.0), VarValue::Number(5.0)]
        );
        let equipment: Vec<String> = backend
            .writes()
            .into_iter()
            .map(|(n, _)| n)
            .filter(|n| n.starts_with("aircraft."))
            .collect();
        assert_eq!(
            equipment,
            vec![
                "aircraft.ground.pca",
                "aircraft.ground.gpu",
                "aircraft.ground.chocks",
            ]
        );
        cancel.cancel();
    }
}
