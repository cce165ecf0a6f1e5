//! Integration tests for the GroundSync runtime.
//!
//! These tests drive the whole runtime against in-memory fakes:
//! - Connection chain and simulator detection
//! - Session start: subscriptions, seed replay, phase detection
//! - Service reconciliation writing back to the aircraft
//! - Loadsheet requests reaching the transport
//! - A full turnaround from arrival to the next departure
//! - Reconnect after the transport drops

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use groundsync::aircraft::AircraftKeys;
use groundsync::connection::{ConnectionError, ConnectionOrchestrator, ConnectionSteps};
use groundsync::events::EventBus;
use groundsync::flight::FlightState;
use groundsync::flightplan::{FlightPlan, FlightPlanError, FlightPlanSource};
use groundsync::ground_ops::GroundOpsKeys;
use groundsync::loadsheet::{
    LoadsheetConfig, LoadsheetCoordinator, LoadsheetKind, LoadsheetTransport, TransportError,
    TransportResponse,
};
use groundsync::service::{AppContext, GroundSyncRuntime, RuntimeSettings, ServiceError};
use groundsync::services::ServicesConfig;
use groundsync::variables::{MemoryBackend, VarValue};

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Default)]
struct StepState {
    simulator_absent: AtomicBool,
    unhealthy: AtomicBool,
    transport_connects: AtomicUsize,
    resets: AtomicUsize,
}

/// Connection steps that always succeed unless told otherwise.
struct FakeSteps(Arc<StepState>);

impl ConnectionSteps for FakeSteps {
    async fn simulator_running(&self) -> bool {
        !self.0.simulator_absent.load(Ordering::SeqCst)
    }

    async fn connect_transport(&self) -> Result<(), ConnectionError> {
        self.0.transport_connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connect_aircraft(&self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn wait_session_ready(&self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn transport_healthy(&self) -> bool {
        !self.0.unhealthy.load(Ordering::SeqCst)
    }

    async fn reset(&self) {
        self.0.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loadsheet server that accepts everything and records what it was asked.
#[derive(Clone, Default)]
struct RecordingTransport {
    generated: Arc<Mutex<Vec<LoadsheetKind>>>,
}

impl LoadsheetTransport for RecordingTransport {
    async fn generate(&self, kind: LoadsheetKind) -> Result<TransportResponse, TransportError> {
        self.generated.lock().push(kind);
        Ok(TransportResponse {
            status: 200,
            body: "ok".to_string(),
        })
    }

    async fn health(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn resend(&self) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: 200,
            body: String::new(),
        })
    }

    async fn clear(&self) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: 200,
            body: String::new(),
        })
    }
}

/// Flight plan source whose plan can be swapped mid-test.
#[derive(Clone)]
struct SwitchablePlan(Arc<Mutex<FlightPlan>>);

#[async_trait]
impl FlightPlanSource for SwitchablePlan {
    async fn fetch(&self) -> Result<FlightPlan, FlightPlanError> {
        Ok(self.0.lock().clone())
    }
}

fn plan(id: &str) -> FlightPlan {
    FlightPlan {
        id: Some(id.to_string()),
        passengers: 100,
        planned_fuel: 7050.0,
        ..Default::default()
    }
}

struct Harness {
    backend: Arc<MemoryBackend>,
    plan: Arc<Mutex<FlightPlan>>,
    steps: Arc<StepState>,
    transport: RecordingTransport,
    bus: EventBus,
    ground: GroundOpsKeys,
    aircraft: AircraftKeys,
    cancel: CancellationToken,
}

impl Harness {
    fn new() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
            plan: Arc::new(Mutex::new(plan("1"))),
            steps: Arc::new(StepState::default()),
            transport: RecordingTransport::default(),
            bus: EventBus::new(),
            ground: GroundOpsKeys::default(),
            aircraft: AircraftKeys::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Aircraft parked at the gate with engines off.
    fn parked(self) -> Self {
        self.backend.set(&self.aircraft.on_ground, true);
        self.backend.set(&self.aircraft.engines_running, false);
        self.backend.set(&self.aircraft.parking_brake, true);
        self.backend.set(&self.aircraft.fuel_quantity, 2000.0);
        self
    }

    fn spawn(&self) -> JoinHandle<Result<(), ServiceError>> {
        let connection = ConnectionOrchestrator::new(
            FakeSteps(self.steps.clone()),
            self.bus.clone(),
            Duration::from_millis(20),
        );
        let loadsheets = LoadsheetCoordinator::new(
            self.transport.clone(),
            LoadsheetConfig {
                probe_health: false,
                backoff_step: Duration::from_millis(10),
                ..LoadsheetConfig::default()
            },
            self.bus.clone(),
        );
        let settings = RuntimeSettings {
            poll_interval: Duration::from_millis(10),
            health_interval: Duration::from_millis(50),
            services: ServicesConfig {
                tick_interval: Duration::from_millis(20),
                plan_refresh: Duration::from_millis(20),
                ..ServicesConfig::default()
            },
            ..RuntimeSettings::default()
        };

        let context = AppContext::new(
            self.bus.clone(),
            self.backend.clone(),
            connection,
            loadsheets,
            Arc::new(SwitchablePlan(self.plan.clone())),
            self.ground.clone(),
            self.aircraft.clone(),
            settings,
        );
        let runtime = Arc::new(GroundSyncRuntime::new(context));
        let cancel = self.cancel.clone();
        tokio::spawn(async move { runtime.run(cancel).await })
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn pax_writes(harness: &Harness) -> Vec<VarValue> {
    harness.backend.writes_to(&harness.aircraft.passenger_count)
}

async fn wait_for_phase(
    rx: &mut tokio::sync::broadcast::Receiver<groundsync::events::FlightPhaseEvent>,
    phase: FlightState,
) -> bool {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if event.current == phase => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .unwrap_or(false)
}

// =============================================================================
// Connection
// =============================================================================

#[tokio::test]
async fn test_simulator_absent_is_fatal() {
    let harness = Harness::new();
    harness.steps.simulator_absent.store(true, Ordering::SeqCst);

    let result = tokio::time::timeout(Duration::from_secs(2), harness.spawn())
        .await
        .expect("runtime should stop on its own")
        .unwrap();

    assert!(matches!(result, Err(ServiceError::SimulatorNotRunning)));
    assert_eq!(harness.steps.transport_connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_stops_cleanly() {
    let harness = Harness::new().parked();
    let handle = harness.spawn();

    assert!(
        eventually(Duration::from_secs(2), || {
            harness.steps.transport_connects.load(Ordering::SeqCst) == 1
        })
        .await
    );
    harness.cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("runtime should stop after cancel")
        .unwrap();
    assert!(result.is_ok());
    // the final teardown resets the connection
    assert!(harness.steps.resets.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_reconnects_after_transport_loss() {
    let harness = Harness::new().parked();
    let handle = harness.spawn();

    assert!(
        eventually(Duration::from_secs(2), || {
            harness.steps.transport_connects.load(Ordering::SeqCst) == 1
        })
        .await
    );

    harness.steps.unhealthy.store(true, Ordering::SeqCst);
    assert!(
        eventually(Duration::from_secs(2), || {
            harness.steps.transport_connects.load(Ordering::SeqCst) >= 2
        })
        .await
    );
    assert!(harness.steps.resets.load(Ordering::SeqCst) >= 1);
    harness.steps.unhealthy.store(false, Ordering::SeqCst);

    harness.cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("runtime should stop after cancel")
        .unwrap();
    assert!(result.is_ok());
}

// =============================================================================
// Services
// =============================================================================

#[tokio::test]
async fn test_departure_services_end_to_end() {
    let harness = Harness::new().parked();
    let mut phases = harness.bus.subscribe_flight_phase();
    let handle = harness.spawn();

    // parked on the ground with a plan: departure starts
    assert!(wait_for_phase(&mut phases, FlightState::Departure).await);

    // refueling starts with the hose connected
    harness.backend.set(&harness.ground.fuel_hose_connected, true);
    harness.backend.set(&harness.ground.refueling_state, 5.0);

    let generated = harness.transport.generated.clone();
    assert!(
        eventually(Duration::from_secs(2), || {
            generated.lock().contains(&LoadsheetKind::Preliminary)
        })
        .await
    );

    let fuel_key = harness.aircraft.fuel_quantity.clone();
    assert!(
        eventually(Duration::from_secs(2), || {
            harness
                .backend
                .writes_to(&fuel_key)
                .iter()
                .any(|v| matches!(v, VarValue::Number(f) if *f > 2000.0))
        })
        .await
    );

    // boarding mirrors the ground-ops passenger count
    harness.backend.set(&harness.ground.boarding_state, 5.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.backend.set(&harness.ground.passengers_boarded, 40.0);

    let pax_key = harness.aircraft.passenger_count.clone();
    assert!(
        eventually(Duration::from_secs(2), || {
            harness
                .backend
                .writes_to(&pax_key)
                .contains(&VarValue::Number(40.0))
        })
        .await
    );

    harness.cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("runtime should stop after cancel")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_services_idle_before_departure() {
    // airborne at start: no departure services may run
    let harness = Harness::new();
    harness.backend.set(&harness.aircraft.on_ground, false);
    harness.backend.set(&harness.aircraft.engines_running, true);
    harness.backend.set(&harness.aircraft.parking_brake, false);
    let mut phases = harness.bus.subscribe_flight_phase();
    let handle = harness.spawn();

    assert!(wait_for_phase(&mut phases, FlightState::Flight).await);

    harness.backend.set(&harness.ground.boarding_state, 5.0);
    harness.backend.set(&harness.ground.passengers_boarded, 40.0);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(harness
        .backend
        .writes_to(&harness.aircraft.passenger_count)
        .is_empty());

    harness.cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
}

#[tokio::test]
async fn test_full_turnaround_to_next_departure() {
    let harness = Harness::new().parked();
    let mut phases = harness.bus.subscribe_flight_phase();
    let handle = harness.spawn();
    let generated = harness.transport.generated.clone();

    assert!(wait_for_phase(&mut phases, FlightState::Departure).await);

    // boarding runs to completion and asks for the final loadsheet
    harness.backend.set(&harness.ground.boarding_state, 5.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.backend.set(&harness.ground.passengers_boarded, 100.0);
    assert!(
        eventually(Duration::from_secs(2), || {
            pax_writes(&harness).contains(&VarValue::Number(100.0))
        })
        .await
    );
    harness.backend.set(&harness.ground.boarding_state, 6.0);
    assert!(
        eventually(Duration::from_secs(2), || {
            generated.lock().contains(&LoadsheetKind::Final)
        })
        .await
    );

    // cargo loading opened and closed the doors along with boarding
    let loading_door_writes = harness
        .backend
        .writes_to(&harness.aircraft.forward_cargo_door)
        .len();

    // taxi, fly, land, park
    harness.backend.set(&harness.aircraft.engines_running, true);
    harness.backend.set(&harness.aircraft.parking_brake, false);
    assert!(wait_for_phase(&mut phases, FlightState::TaxiOut).await);
    harness.backend.set(&harness.aircraft.on_ground, false);
    assert!(wait_for_phase(&mut phases, FlightState::Flight).await);
    harness.backend.set(&harness.aircraft.on_ground, true);
    assert!(wait_for_phase(&mut phases, FlightState::TaxiIn).await);
    harness.backend.set(&harness.aircraft.engines_running, false);
    harness.backend.set(&harness.aircraft.parking_brake, true);
    assert!(wait_for_phase(&mut phases, FlightState::Arrival).await);

    // deboarding opens the cargo doors for unloading
    let door_key = harness.aircraft.forward_cargo_door.clone();
    let door_writes = |harness: &Harness| -> Vec<VarValue> {
        let writes = harness.backend.writes_to(&door_key);
        writes.get(loading_door_writes..).unwrap_or_default().to_vec()
    };
    harness.backend.set(&harness.ground.deboarding_state, 5.0);
    assert!(
        eventually(Duration::from_secs(2), || {
            door_writes(&harness).contains(&VarValue::Bool(true))
        })
        .await
    );
    harness.backend.set(&harness.ground.passengers_deboarded, 60.0);
    assert!(
        eventually(Duration::from_secs(2), || {
            pax_writes(&harness).contains(&VarValue::Number(40.0))
        })
        .await
    );
    harness.backend.set(&harness.ground.deboarding_cargo_percent, 100.0);
    assert!(
        eventually(Duration::from_secs(2), || {
            door_writes(&harness).last() == Some(&VarValue::Bool(false))
        })
        .await
    );

    // ground ops reports done: everybody is off and the turnaround begins
    harness.backend.set(&harness.ground.deboarding_state, 6.0);
    assert!(wait_for_phase(&mut phases, FlightState::Turnaround).await);
    assert!(
        eventually(Duration::from_secs(2), || {
            pax_writes(&harness).last() == Some(&VarValue::Number(0.0))
        })
        .await
    );

    // the same plan keeps us waiting; a new one starts the next departure
    tokio::time::sleep(Duration::from_millis(100)).await;
    *harness.plan.lock() = plan("2");
    assert!(wait_for_phase(&mut phases, FlightState::Departure).await);

    harness.cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("runtime should stop after cancel")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_arrival_without_boarding_uses_planned_passengers() {
    // started airborne: nobody boarded here, the plan says 100 are aboard
    let harness = Harness::new();
    harness.backend.set(&harness.aircraft.on_ground, false);
    harness.backend.set(&harness.aircraft.engines_running, true);
    harness.backend.set(&harness.aircraft.parking_brake, false);
    let mut phases = harness.bus.subscribe_flight_phase();
    let handle = harness.spawn();

    assert!(wait_for_phase(&mut phases, FlightState::Flight).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    harness.backend.set(&harness.aircraft.on_ground, true);
    assert!(wait_for_phase(&mut phases, FlightState::TaxiIn).await);
    harness.backend.set(&harness.aircraft.engines_running, false);
    harness.backend.set(&harness.aircraft.parking_brake, true);
    assert!(wait_for_phase(&mut phases, FlightState::Arrival).await);

    harness.backend.set(&harness.ground.deboarding_state, 5.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.backend.set(&harness.ground.passengers_deboarded, 30.0);

    assert!(
        eventually(Duration::from_secs(2), || {
            pax_writes(&harness).contains(&VarValue::Number(70.0))
        })
        .await
    );

    harness.cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
}
