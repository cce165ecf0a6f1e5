//! Application context: every long-lived component, built once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::error::ServiceError;
use crate::aircraft::AircraftKeys;
use crate::config::ConfigFile;
use crate::connection::{ConnectionOrchestrator, ConnectionSteps};
use crate::events::EventBus;
use crate::flightplan::{FlightPlan, FlightPlanSource, SimbriefSource, StaticFlightPlan};
use crate::ground_ops::{GroundOpsKeys, MenuConfig};
use crate::loadsheet::{HttpLoadsheetClient, LoadsheetConfig, LoadsheetCoordinator, LoadsheetTransport};
use crate::services::{AutomationConfig, ServicesConfig};
use crate::variables::SharedBackend;
use crate::xplane::{default_menu_file, WebApiClient, WebApiConfig};

/// How often an established transport is checked.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Per-session settings derived from configuration.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub poll_interval: Duration,
    pub health_interval: Duration,
    pub menu: MenuConfig,
    pub services: ServicesConfig,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            poll_interval: crate::variables::DEFAULT_POLL_INTERVAL,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            menu: MenuConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &ConfigFile) -> Self {
        let menu_file = config
            .ground_ops
            .menu_file
            .clone()
            .or_else(default_menu_file)
            .unwrap_or_else(|| {
                warn!("No menu file configured and no X-Plane install found");
                PathBuf::new()
            });

        let services = &config.services;
        Self {
            poll_interval: Duration::from_millis(config.observer.poll_interval_ms),
            health_interval: DEFAULT_HEALTH_INTERVAL,
            menu: MenuConfig {
                menu_file,
                ready_timeout: Duration::from_millis(config.ground_ops.menu_ready_timeout_ms),
                operator_settle: Duration::from_millis(config.ground_ops.operator_settle_ms),
                operator_extra_delay: Duration::from_millis(
                    config.ground_ops.operator_extra_delay_ms,
                ),
            },
            services: ServicesConfig {
                open_cargo_doors: services.open_cargo_doors,
                refuel_rate: services.refuel_rate,
                fuel_unit: services.fuel_unit,
                automation: AutomationConfig {
                    auto_refuel: services.auto_refuel,
                    call_catering: services.call_catering,
                    auto_boarding: services.auto_boarding,
                    auto_deboarding: services.auto_deboarding,
                    auto_ground_equipment: services.auto_ground_equipment,
                },
                equipment_settle: Duration::from_millis(services.equipment_settle_ms),
                tick_interval: Duration::from_millis(config.observer.service_tick_ms),
                ..ServicesConfig::default()
            },
        }
    }
}

/// Dependency container handed to the runtime.
///
/// `S` runs the connection chain and `T` carries loadsheet requests; both are
/// generic so tests can substitute fakes.
pub struct AppContext<S, T> {
    pub bus: EventBus,
    pub backend: SharedBackend,
    pub connection: Arc<ConnectionOrchestrator<S>>,
    pub loadsheets: Arc<LoadsheetCoordinator<T>>,
    pub plans: Arc<dyn FlightPlanSource>,
    pub ground_keys: GroundOpsKeys,
    pub aircraft_keys: AircraftKeys,
    pub settings: RuntimeSettings,
}

/// Context wired to the X-Plane web API and the HTTP loadsheet server.
pub type XPlaneContext = AppContext<WebApiClient, HttpLoadsheetClient>;

impl<S: ConnectionSteps, T: LoadsheetTransport> AppContext<S, T> {
    /// Assemble a context from already-built parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: EventBus,
        backend: SharedBackend,
        connection: ConnectionOrchestrator<S>,
        loadsheets: LoadsheetCoordinator<T>,
        plans: Arc<dyn FlightPlanSource>,
        ground_keys: GroundOpsKeys,
        aircraft_keys: AircraftKeys,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            bus,
            backend,
            connection: Arc::new(connection),
            loadsheets: Arc::new(loadsheets),
            plans,
            ground_keys,
            aircraft_keys,
            settings,
        }
    }
}

impl XPlaneContext {
    /// Build the production context from the user's configuration.
    pub fn from_config(config: &ConfigFile) -> Result<Self, ServiceError> {
        let bus = EventBus::new();

        let client = WebApiClient::new(WebApiConfig {
            host: config.connection.host.clone(),
            port: config.connection.port,
            aircraft_probe: config.connection.aircraft_probe.clone(),
            session_ready: config.connection.session_ready.clone(),
            session_timeout: Duration::from_secs(config.connection.session_timeout_secs),
            ..WebApiConfig::default()
        })
        .map_err(|e| ServiceError::HttpClientError(e.to_string()))?;
        let backend: SharedBackend = Arc::new(client.clone());
        let connection = ConnectionOrchestrator::new(
            client,
            bus.clone(),
            Duration::from_secs(config.connection.retry_delay_secs),
        );

        let transport = HttpLoadsheetClient::new(
            &config.loadsheet.base_url,
            Duration::from_secs(config.loadsheet.timeout_secs),
        )
        .map_err(|e| ServiceError::HttpClientError(e.to_string()))?;
        let loadsheets = LoadsheetCoordinator::new(
            transport,
            LoadsheetConfig {
                min_interval: Duration::from_secs(config.loadsheet.min_interval_secs),
                max_retries: config.loadsheet.max_retries,
                probe_health: config.loadsheet.probe_health,
                ..LoadsheetConfig::default()
            },
            bus.clone(),
        );

        let plans: Arc<dyn FlightPlanSource> = match &config.flightplan.simbrief_user_id {
            Some(user_id) => {
                info!(user_id = %user_id, "Using SimBrief flight plans");
                Arc::new(
                    SimbriefSource::new(user_id.clone())
                        .map_err(|e| ServiceError::HttpClientError(e.to_string()))?,
                )
            }
            None => {
                info!("No SimBrief user configured, using an empty flight plan");
                Arc::new(StaticFlightPlan::new(FlightPlan::default()))
            }
        };

        Ok(Self::new(
            bus,
            backend,
            connection,
            loadsheets,
            plans,
            GroundOpsKeys::with_prefix(&config.ground_ops.prefix),
            AircraftKeys::default(),
            RuntimeSettings::from_config(config),
        ))
    }
}
