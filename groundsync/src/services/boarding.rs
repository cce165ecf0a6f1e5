//! Boarding and deboarding.
//!
//! Passengers are counted by the ground-ops backend; the machines mirror the
//! count into the aircraft's passenger total and per-seat occupancy, and
//! decide completion. Boarding completes when ground ops reports done, or
//! when cargo is loaded and everybody is on board, whichever comes first.

use rand::Rng;
use tracing::{debug, info, warn};

use super::action::Action;
use super::seats::{clamp_passengers, SeatError, SeatMap};
use super::signal::Signal;
use super::ServiceMachine;
use crate::events::EventBus;
use crate::ground_ops::{ServiceKind, ServiceStatus, StatusTracker};
use crate::loadsheet::LoadsheetKind;

/// Cargo percentage treated as fully (un)loaded.
pub const CARGO_DONE_PERCENT: f64 = 99.0;

/// Boarding session.
#[derive(Debug, Clone)]
pub struct BoardingMachine {
    tracker: StatusTracker,
    planned: u32,
    current: u32,
    cargo_percent: f64,
    seats: SeatMap,
    seats_written: usize,
    active: bool,
    completed: bool,
}

impl BoardingMachine {
    pub fn new() -> Self {
        Self {
            tracker: StatusTracker::new(ServiceKind::Boarding),
            planned: 0,
            current: 0,
            cargo_percent: 0.0,
            seats: SeatMap::empty(),
            seats_written: 0,
            active: false,
            completed: false,
        }
    }

    /// Start a new flight: set the planned passengers and draw their seats.
    ///
    /// Counts above the cabin size are clamped; negative counts are rejected
    /// and leave the session untouched.
    pub fn prepare<R: Rng + ?Sized>(&mut self, planned: i64, rng: &mut R) -> Result<u32, SeatError> {
        let seats = SeatMap::assign(planned, rng)?;
        self.planned = clamp_passengers(planned)?;
        self.seats = seats;
        self.current = 0;
        self.cargo_percent = 0.0;
        self.seats_written = 0;
        self.active = false;
        self.completed = false;
        info!(planned = self.planned, "Boarding prepared");
        Ok(self.planned)
    }

    pub fn status(&self) -> ServiceStatus {
        self.tracker.status()
    }

    pub fn planned(&self) -> u32 {
        self.planned
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn seats(&self) -> &SeatMap {
        &self.seats
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn board_to(&mut self, count: u32, actions: &mut Vec<Action>) {
        let count = count.min(self.planned);
        if count != self.current {
            self.current = count;
            actions.push(Action::SetPassengers(count));
        }
        let target = (count as usize).min(self.seats.occupied_count());
        for &seat in &self.seats.boarding_order()[self.seats_written.min(target)..target] {
            actions.push(Action::SetSeat {
                index: seat,
                occupied: true,
            });
        }
        self.seats_written = self.seats_written.max(target);
    }

    fn complete(&mut self, reason: &str, actions: &mut Vec<Action>) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.active = false;
        self.board_to(self.planned, actions);
        info!(
            passengers = self.current,
            cargo_percent = self.cargo_percent,
            reason,
            "Boarding complete"
        );
        actions.push(Action::RequestLoadsheet(LoadsheetKind::Final));
    }

    fn check_local_completion(&mut self, actions: &mut Vec<Action>) {
        if self.active && self.cargo_percent >= CARGO_DONE_PERCENT && self.current >= self.planned {
            self.complete("all passengers and cargo loaded", actions);
        }
    }
}

impl Default for BoardingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMachine for BoardingMachine {
    fn on_signal(&mut self, signal: &Signal, bus: &EventBus) -> Vec<Action> {
        let mut actions = Vec::new();
        match *signal {
            Signal::BoardingState(code) => match self.tracker.update(code, bus) {
                Some(ServiceStatus::Active) if !self.active && !self.completed => {
                    self.active = true;
                    self.seats_written = 0;
                    self.current = 0;
                    actions.push(Action::SetPassengers(0));
                }
                Some(ServiceStatus::Completed) => self.complete("ground ops reported done", &mut actions),
                _ => {}
            },
            Signal::PassengersBoarded(count) if self.active => {
                if count < 0 {
                    warn!(count, "Ignoring negative boarded passenger count");
                } else {
                    debug!(count, planned = self.planned, "Passengers boarded");
                    self.board_to(u32::try_from(count).unwrap_or(u32::MAX), &mut actions);
                    self.check_local_completion(&mut actions);
                }
            }
            Signal::CargoBoardPercent(percent) if self.active => {
                self.cargo_percent = percent;
                self.check_local_completion(&mut actions);
            }
            _ => {}
        }
        actions
    }

    fn reset(&mut self, bus: &EventBus) {
        self.tracker.reset(bus);
        self.current = 0;
        self.cargo_percent = 0.0;
        self.seats_written = 0;
        self.active = false;
        self.completed = false;
    }
}

/// Deboarding session.
#[derive(Debug, Clone)]
pub struct DeboardingMachine {
    tracker: StatusTracker,
    on_board: u32,
    remaining: u32,
    cargo_percent: f64,
    seats: SeatMap,
    seats_left: usize,
    active: bool,
    completed: bool,
}

impl DeboardingMachine {
    pub fn new() -> Self {
        Self {
            tracker: StatusTracker::new(ServiceKind::Deboarding),
            on_board: 0,
            remaining: 0,
            cargo_percent: 0.0,
            seats: SeatMap::empty(),
            seats_left: 0,
            active: false,
            completed: false,
        }
    }

    /// Start a deboarding session for the passengers currently on board.
    pub fn prepare(&mut self, on_board: u32, seats: SeatMap) {
        self.on_board = on_board;
        self.remaining = on_board;
        self.seats_left = seats.occupied_count().min(on_board as usize);
        self.seats = seats;
        self.cargo_percent = 0.0;
        self.active = false;
        self.completed = false;
        info!(on_board, "Deboarding prepared");
    }

    pub fn status(&self) -> ServiceStatus {
        self.tracker.status()
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn deboard_to(&mut self, remaining: u32, actions: &mut Vec<Action>) {
        let remaining = remaining.min(self.on_board);
        if remaining != self.remaining {
            self.remaining = remaining;
            actions.push(Action::SetPassengers(remaining));
        }
        let keep = (remaining as usize).min(self.seats_left);
        for &seat in self.seats.boarding_order()[keep..self.seats_left].iter().rev() {
            actions.push(Action::SetSeat {
                index: seat,
                occupied: false,
            });
        }
        self.seats_left = keep;
    }

    fn complete(&mut self, reason: &str, actions: &mut Vec<Action>) {
        if self.completed {
            return;
        }
        self.completed = true;
        self.active = false;
        self.deboard_to(0, actions);
        info!(cargo_percent = self.cargo_percent, reason, "Deboarding complete");
    }

    fn check_local_completion(&mut self, actions: &mut Vec<Action>) {
        if self.active && self.cargo_percent >= CARGO_DONE_PERCENT && self.remaining == 0 {
            self.complete("all passengers and cargo off", actions);
        }
    }
}

impl Default for DeboardingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMachine for DeboardingMachine {
    fn on_signal(&mut self, signal: &Signal, bus: &EventBus) -> Vec<Action> {
        let mut actions = Vec::new();
        match *signal {
            Signal::DeboardingState(code) => match self.tracker.update(code, bus) {
                Some(ServiceStatus::Active) if !self.active && !self.completed => {
                    self.active = true;
                }
                Some(ServiceStatus::Completed) => {
                    self.complete("ground ops reported done", &mut actions)
                }
                _ => {}
            },
            Signal::PassengersDeboarded(count) if self.active => {
                if count < 0 {
                    warn!(count, "Ignoring negative deboarded passenger count");
                } else {
                    let deboarded = u32::try_from(count).unwrap_or(u32::MAX);
                    debug!(deboarded, on_board = self.on_board, "Passengers deboarded");
                    self.deboard_to(self.on_board.saturating_sub(deboarded), &mut actions);
                    self.check_local_completion(&mut actions);
                }
            }
            Signal::CargoDeboardPercent(percent) if self.active => {
                self.cargo_percent = percent;
                self.check_local_completion(&mut actions);
            }
            _ => {}
        }
        actions
    }

    fn reset(&mut self, bus: &EventBus) {
        self.tracker.reset(bus);
        self.remaining = self.on_board;
        self.seats_left = self.seats.occupied_count().min(self.on_board as usize);
        self.cargo_percent = 0.0;
        self.active = false;
        self.completed = false;
    }
}
