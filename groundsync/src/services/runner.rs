//! Service tick loop.
//!
//! Variable changes arrive on a channel from the observer handler. Each
//! change becomes a [`Signal`], is fed to the machines the current flight
//! phase allows, and the resulting [`Action`]s are executed against the
//! aircraft. A coarser tick advances time-driven work (refueling), phase
//! detection and automation.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::action::Action;
use super::automation::{AutomationConfig, AutomationInputs, AutomationStep, ServiceAutomation};
use super::boarding::{BoardingMachine, DeboardingMachine};
use super::cargo::CargoMachine;
use super::catering::CateringMachine;
use super::equipment::DEFAULT_EQUIPMENT_SETTLE;
use super::refuel::{RefuelMachine, DEFAULT_REFUEL_RATE};
use super::seats::{clamp_passengers, SeatMap};
use super::signal::{Signal, SignalSnapshot, SignalTranslator};
use super::ServiceMachine;
use crate::aircraft::{AircraftActuators, GroundEquipment};
use crate::events::{EquipmentEvent, EventBus};
use crate::flight::{FlightState, FlightStateMachine, PhaseDetector, PhaseInputs};
use crate::flightplan::{FlightPlan, FlightPlanError, FlightPlanSource, FuelUnit};
use crate::ground_ops::{ServiceKind, StatusTracker};
use crate::loadsheet::LoadsheetKind;
use crate::variables::VariableChange;

/// Default service tick.
pub const DEFAULT_SERVICE_TICK: Duration = Duration::from_secs(1);

/// Default interval between flight plan refreshes while waiting for a flight.
pub const DEFAULT_PLAN_REFRESH: Duration = Duration::from_secs(60);

/// Service loop settings.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub open_cargo_doors: bool,
    /// Fuel added per tick while refueling.
    pub refuel_rate: f64,
    pub fuel_unit: FuelUnit,
    pub automation: AutomationConfig,
    pub equipment_settle: Duration,
    pub tick_interval: Duration,
    pub plan_refresh: Duration,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            open_cargo_doors: true,
            refuel_rate: DEFAULT_REFUEL_RATE,
            fuel_unit: FuelUnit::Kilograms,
            automation: AutomationConfig::default(),
            equipment_settle: DEFAULT_EQUIPMENT_SETTLE,
            tick_interval: DEFAULT_SERVICE_TICK,
            plan_refresh: DEFAULT_PLAN_REFRESH,
        }
    }
}

/// Owns every service machine and drives them from variable changes.
pub struct ServiceRunner {
    translator: SignalTranslator,
    actuators: AircraftActuators,
    bus: EventBus,
    config: ServicesConfig,

    flight: FlightStateMachine,
    detector: PhaseDetector,
    inputs: PhaseInputs,
    snapshot: SignalSnapshot,

    boarding: BoardingMachine,
    deboarding: DeboardingMachine,
    refuel: RefuelMachine,
    catering: CateringMachine,
    cargo: CargoMachine,
    pushback: StatusTracker,
    jetway: StatusTracker,
    stairs: StatusTracker,

    automation: ServiceAutomation,
    plan: FlightPlan,
    rng: StdRng,

    automation_tx: Option<mpsc::UnboundedSender<AutomationStep>>,
    loadsheet_tx: Option<mpsc::UnboundedSender<LoadsheetKind>>,
}

impl ServiceRunner {
    pub fn new(
        config: ServicesConfig,
        translator: SignalTranslator,
        actuators: AircraftActuators,
        bus: EventBus,
    ) -> Self {
        Self {
            translator,
            actuators,
            flight: FlightStateMachine::new(bus.clone()),
            detector: PhaseDetector::new(),
            inputs: PhaseInputs::default(),
            snapshot: SignalSnapshot::new(),
            boarding: BoardingMachine::new(),
            deboarding: DeboardingMachine::new(),
            refuel: RefuelMachine::new(config.refuel_rate, config.fuel_unit),
            catering: CateringMachine::new(),
            cargo: CargoMachine::new(config.open_cargo_doors),
            pushback: StatusTracker::new(ServiceKind::Pushback),
            jetway: StatusTracker::new(ServiceKind::Jetway),
            stairs: StatusTracker::new(ServiceKind::Stairs),
            automation: ServiceAutomation::new(config.automation.clone()),
            plan: FlightPlan::default(),
            rng: StdRng::from_entropy(),
            automation_tx: None,
            loadsheet_tx: None,
            bus,
            config,
        }
    }

    /// Use a fixed random source for seat assignment.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Send automation steps to an executor.
    pub fn with_automation(mut self, tx: mpsc::UnboundedSender<AutomationStep>) -> Self {
        self.automation_tx = Some(tx);
        self
    }

    /// Send loadsheet requests to a worker.
    pub fn with_loadsheets(mut self, tx: mpsc::UnboundedSender<LoadsheetKind>) -> Self {
        self.loadsheet_tx = Some(tx);
        self
    }

    pub fn phase(&self) -> FlightState {
        self.flight.current()
    }

    pub fn flight_mut(&mut self) -> &mut FlightStateMachine {
        &mut self.flight
    }

    pub fn boarding(&self) -> &BoardingMachine {
        &self.boarding
    }

    pub fn deboarding(&self) -> &DeboardingMachine {
        &self.deboarding
    }

    pub fn refuel(&self) -> &RefuelMachine {
        &self.refuel
    }

    pub fn catering(&self) -> &CateringMachine {
        &self.catering
    }

    pub fn cargo(&self) -> &CargoMachine {
        &self.cargo
    }

    pub fn flight_plan(&self) -> &FlightPlan {
        &self.plan
    }

    pub fn has_flight_plan(&self) -> bool {
        self.inputs.plan_loaded
    }

    /// Install a flight plan. Seats are drawn when the next departure starts.
    pub fn set_flight_plan(&mut self, plan: FlightPlan) {
        info!(
            id = plan.id.as_deref().unwrap_or("-"),
            passengers = plan.passengers,
            fuel = plan.planned_fuel,
            "Flight plan installed"
        );
        self.inputs.plan_loaded = true;
        self.inputs.plan_id = plan.id.clone();
        self.refuel.set_planned(plan.fuel_in(self.config.fuel_unit));
        self.plan = plan;
    }

    /// Translate and dispatch one variable change.
    pub fn handle_change(&mut self, change: &VariableChange) -> Vec<Action> {
        match self.translator.translate(change) {
            Some(signal) => self.handle_signal(&signal),
            None => Vec::new(),
        }
    }

    /// Dispatch one signal to the machines the current phase allows.
    pub fn handle_signal(&mut self, signal: &Signal) -> Vec<Action> {
        let mut actions = Vec::new();
        self.snapshot.record(signal);
        match *signal {
            Signal::OnGround(v) => self.inputs.on_ground = Some(v),
            Signal::EnginesRunning(v) => self.inputs.engines_running = Some(v),
            Signal::ParkingBrake(v) => self.inputs.parking_brake = Some(v),
            Signal::GroundSpeed(v) => self.inputs.ground_speed = Some(v),
            Signal::Chocks(v) => self.publish_equipment(GroundEquipment::Chocks, v),
            Signal::Gpu(v) => self.publish_equipment(GroundEquipment::Gpu, v),
            Signal::Pca(v) => self.publish_equipment(GroundEquipment::Pca, v),
            Signal::PushbackState(code) => {
                self.pushback.update(code, &self.bus);
            }
            Signal::Jetway(code) => {
                self.jetway.update(code, &self.bus);
            }
            Signal::Stairs(code) => {
                self.stairs.update(code, &self.bus);
            }
            Signal::FuelQuantity(_) => {
                actions.extend(self.refuel.on_signal(signal, &self.bus));
            }
            _ => {}
        }

        actions.extend(self.dispatch(signal));
        actions.extend(self.update_phase());
        actions
    }

    /// Feed `signal` to the machines of the current phase.
    fn dispatch(&mut self, signal: &Signal) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.flight.current() {
            FlightState::Departure => {
                actions.extend(self.boarding.on_signal(signal, &self.bus));
                if !matches!(signal, Signal::FuelQuantity(_)) {
                    actions.extend(self.refuel.on_signal(signal, &self.bus));
                }
                actions.extend(self.catering.on_signal(signal, &self.bus));
                actions.extend(self.cargo.on_signal(signal, &self.bus));
            }
            FlightState::Arrival => {
                actions.extend(self.deboarding.on_signal(signal, &self.bus));
                actions.extend(self.cargo.on_signal(signal, &self.bus));
                self.inputs.deboarding_completed = self.deboarding.is_completed();
            }
            _ => {}
        }
        actions
    }

    /// Advance time-driven work: refueling, phase detection, automation.
    pub fn tick(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.flight.current() == FlightState::Departure {
            actions.extend(self.refuel.on_tick(&self.bus));
        }
        actions.extend(self.update_phase());

        let inputs = AutomationInputs {
            phase: self.flight.current(),
            refueling: self.refuel.status(),
            catering: self.catering.status(),
            boarding: self.boarding.status(),
            deboarding: self.deboarding.status(),
            boarding_completed: self.boarding.is_completed(),
        };
        actions.extend(
            self.automation
                .plan(&inputs)
                .into_iter()
                .map(Action::Automate),
        );
        actions
    }

    fn publish_equipment(&self, equipment: GroundEquipment, connected: bool) {
        debug!(equipment = %equipment, connected, "Ground equipment changed");
        self.bus.publish_equipment(EquipmentEvent {
            equipment,
            connected,
        });
    }

    fn update_phase(&mut self) -> Vec<Action> {
        match self.detector.evaluate(&mut self.flight, &self.inputs) {
            Some(phase) => self.enter_phase(phase),
            None => Vec::new(),
        }
    }

    fn enter_phase(&mut self, phase: FlightState) -> Vec<Action> {
        let replay = match phase {
            FlightState::Departure => {
                self.start_departure();
                self.snapshot.departure()
            }
            FlightState::Arrival => {
                self.start_arrival();
                self.snapshot.arrival()
            }
            FlightState::Turnaround => {
                self.inputs.deboarding_completed = false;
                Vec::new()
            }
            _ => Vec::new(),
        };

        if !replay.is_empty() {
            debug!(phase = %phase, signals = replay.len(), "Replaying ground-ops state");
        }
        replay
            .iter()
            .flat_map(|signal| self.dispatch(signal))
            .collect()
    }

    fn start_departure(&mut self) {
        self.boarding.reset(&self.bus);
        self.refuel.reset(&self.bus);
        self.catering.reset(&self.bus);
        self.cargo.reset(&self.bus);
        self.refuel
            .set_planned(self.plan.fuel_in(self.config.fuel_unit));

        if let Err(e) = self.boarding.prepare(self.plan.passengers, &mut self.rng) {
            warn!(error = %e, "Invalid passenger plan, boarding nobody");
            let _ = self.boarding.prepare(0, &mut self.rng);
        }
    }

    fn start_arrival(&mut self) {
        self.deboarding.reset(&self.bus);
        self.cargo.reset(&self.bus);
        self.inputs.deboarding_completed = false;

        // flights started airborne never boarded; fall back to the plan
        let (on_board, seats) = if self.boarding.current() > 0 {
            (self.boarding.current(), self.boarding.seats().clone())
        } else {
            let passengers = self.plan.passengers;
            let count = clamp_passengers(passengers).unwrap_or(0);
            let seats = SeatMap::assign(i64::from(count), &mut self.rng).unwrap_or_default();
            (count, seats)
        };
        self.deboarding.prepare(on_board, seats);
    }

    /// Apply actions to the aircraft and hand off asynchronous work.
    pub async fn execute(&self, actions: Vec<Action>) {
        for action in actions {
            let result = match action {
                Action::SetDoor { door, open } => self.actuators.set_door(door, open).await,
                Action::SetFuel(quantity) => self.actuators.set_fuel(quantity).await,
                Action::SetPassengers(count) => self.actuators.set_passengers(count).await,
                Action::SetSeat { index, occupied } => {
                    self.actuators.set_seat(index, occupied).await
                }
                Action::RequestLoadsheet(kind) => {
                    match &self.loadsheet_tx {
                        Some(tx) if tx.send(kind).is_ok() => {}
                        _ => debug!(kind = %kind, "No loadsheet worker, request dropped"),
                    }
                    Ok(())
                }
                Action::Automate(step) => {
                    match &self.automation_tx {
                        Some(tx) if tx.send(step).is_ok() => {}
                        _ => debug!(step = ?step, "No automation executor, step dropped"),
                    }
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "Aircraft write failed");
            }
        }
    }

    /// Run until cancelled or the change channel closes.
    pub async fn run(
        mut self,
        mut changes: mpsc::UnboundedReceiver<VariableChange>,
        plans: Arc<dyn FlightPlanSource>,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut plan_ticker = interval(self.config.plan_refresh);
        plan_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (plan_tx, mut plan_rx) = mpsc::unbounded_channel::<Result<FlightPlan, FlightPlanError>>();
        let mut plan_pending = false;

        info!(tick_ms = self.config.tick_interval.as_millis() as u64, "Service loop started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                change = changes.recv() => {
                    let Some(change) = change else { break };
                    let actions = self.handle_change(&change);
                    self.execute(actions).await;
                }

                _ = ticker.tick() => {
                    let actions = self.tick();
                    self.execute(actions).await;
                }

                _ = plan_ticker.tick(), if !plan_pending && self.wants_plan() => {
                    plan_pending = true;
                    let plans = plans.clone();
                    let tx = plan_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(plans.fetch().await);
                    });
                }

                Some(result) = plan_rx.recv() => {
                    plan_pending = false;
                    match result {
                        Ok(plan) => {
                            if plan.id.is_none() || plan.id != self.plan.id || !self.has_flight_plan() {
                                self.set_flight_plan(plan);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Flight plan unavailable");
                            if !self.has_flight_plan() {
                                self.set_flight_plan(FlightPlan::default());
                            }
                        }
                    }
                }
            }
        }

        info!("Service loop stopped");
    }

    fn wants_plan(&self) -> bool {
        !self.inputs.plan_loaded
            || matches!(
                self.flight.current(),
                FlightState::Preflight | FlightState::Turnaround
            )
    }
}
