//! Ground-service status and raw-code mapping.
//!
//! The ground-ops backend reports each service as a small integer. Services
//! and connection-style equipment (jetway, stairs) use different tables, so
//! every [`ServiceKind`] names the table it maps through.

use std::fmt;

use tracing::{debug, info};

use crate::events::{EventBus, ServiceStatusEvent};

/// Derived status of one ground service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceStatus {
    #[default]
    Inactive,
    Requested,
    Active,
    Completed,
    /// Connection-style equipment that has been pulled back.
    Disconnected,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Inactive => "inactive",
            ServiceStatus::Requested => "requested",
            ServiceStatus::Active => "active",
            ServiceStatus::Completed => "completed",
            ServiceStatus::Disconnected => "disconnected",
        };
        write!(f, "{}", s)
    }
}

/// Ground services tracked by the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Boarding,
    Deboarding,
    Catering,
    Refueling,
    CargoLoading,
    CargoUnloading,
    Pushback,
    Jetway,
    Stairs,
}

impl ServiceKind {
    /// The raw-code table this service maps through.
    pub fn mapping(&self) -> &'static StatusMapping {
        match self {
            ServiceKind::Jetway | ServiceKind::Stairs => &CONNECTION_STATES,
            _ => &SERVICE_STATES,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceKind::Boarding => "boarding",
            ServiceKind::Deboarding => "deboarding",
            ServiceKind::Catering => "catering",
            ServiceKind::Refueling => "refueling",
            ServiceKind::CargoLoading => "cargo loading",
            ServiceKind::CargoUnloading => "cargo unloading",
            ServiceKind::Pushback => "pushback",
            ServiceKind::Jetway => "jetway",
            ServiceKind::Stairs => "stairs",
        };
        write!(f, "{}", s)
    }
}

/// Named table from raw backend codes to [`ServiceStatus`].
#[derive(Debug)]
pub struct StatusMapping {
    pub name: &'static str,
    table: &'static [(i64, ServiceStatus)],
    fallback: ServiceStatus,
}

impl StatusMapping {
    /// Map a raw code; unknown codes use the table's fallback.
    pub fn map(&self, code: i64) -> ServiceStatus {
        self.table
            .iter()
            .find(|(raw, _)| *raw == code)
            .map(|(_, status)| *status)
            .unwrap_or(self.fallback)
    }
}

/// Boarding, deboarding, catering, refueling and pushback.
///
/// 1 = not available, 2 = bypassed, 3 = can be called, 4 = requested,
/// 5 = in progress, 6 = done.
pub static SERVICE_STATES: StatusMapping = StatusMapping {
    name: "service",
    table: &[
        (0, ServiceStatus::Inactive),
        (1, ServiceStatus::Inactive),
        (2, ServiceStatus::Inactive),
        (3, ServiceStatus::Inactive),
        (4, ServiceStatus::Requested),
        (5, ServiceStatus::Active),
        (6, ServiceStatus::Completed),
    ],
    fallback: ServiceStatus::Inactive,
};

/// Jetway and stairs. Code 2 means the equipment was pulled back.
pub static CONNECTION_STATES: StatusMapping = StatusMapping {
    name: "connection",
    table: &[
        (0, ServiceStatus::Inactive),
        (1, ServiceStatus::Inactive),
        (2, ServiceStatus::Disconnected),
        (3, ServiceStatus::Inactive),
        (4, ServiceStatus::Requested),
        (5, ServiceStatus::Active),
        (6, ServiceStatus::Completed),
    ],
    fallback: ServiceStatus::Inactive,
};

/// Tracks the derived status of one service and publishes transitions.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    service: ServiceKind,
    status: ServiceStatus,
    raw: Option<i64>,
}

impl StatusTracker {
    pub fn new(service: ServiceKind) -> Self {
        Self {
            service,
            status: ServiceStatus::Inactive,
            raw: None,
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    /// Last raw code seen, if any.
    pub fn raw(&self) -> Option<i64> {
        self.raw
    }

    /// Feed a raw code. Returns the new status when the derived status changed.
    ///
    /// An active service never falls back without passing through
    /// `Completed`: any code that would leave `Active` for something other
    /// than `Completed` is recorded as completion.
    pub fn update(&mut self, raw: i64, bus: &EventBus) -> Option<ServiceStatus> {
        self.raw = Some(raw);
        let mut next = self.service.mapping().map(raw);

        if self.status == ServiceStatus::Active
            && next != ServiceStatus::Active
            && next != ServiceStatus::Completed
        {
            debug!(
                service = %self.service,
                raw,
                mapped = %next,
                "Active service left without completion, treating as completed"
            );
            next = ServiceStatus::Completed;
        }

        self.apply(next, bus)
    }

    /// Force `Inactive`, publishing the transition if there is one.
    pub fn reset(&mut self, bus: &EventBus) -> Option<ServiceStatus> {
        self.raw = None;
        self.apply(ServiceStatus::Inactive, bus)
    }

    fn apply(&mut self, next: ServiceStatus, bus: &EventBus) -> Option<ServiceStatus> {
        if next == self.status {
            return None;
        }
        let previous = self.status;
        self.status = next;
        info!(
            service = %self.service,
            from = %previous,
            to = %next,
            "Service status changed"
        );
        bus.publish_service_status(ServiceStatusEvent {
            service: self.service,
            previous,
            current: next,
        });
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_code_two_depends_on_table() {
        assert_eq!(ServiceKind::Boarding.mapping().map(2), ServiceStatus::Inactive);
        assert_eq!(ServiceKind::Jetway.mapping().map(2), ServiceStatus::Disconnected);
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(SERVICE_STATES.map(42), ServiceStatus::Inactive);
        assert_eq!(SERVICE_STATES.map(-1), ServiceStatus::Inactive);
    }

    #[test]
    fn test_event_once_per_derived_transition() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_service_status();
        let mut tracker = StatusTracker::new(ServiceKind::Catering);

        // 1 and 3 both map to Inactive
        assert_eq!(tracker.update(1, &bus), None);
        assert_eq!(tracker.update(3, &bus), None);
        assert_eq!(tracker.update(4, &bus), Some(ServiceStatus::Requested));
        assert_eq!(tracker.update(4, &bus), None);
        assert_eq!(tracker.update(5, &bus), Some(ServiceStatus::Active));
        assert_eq!(tracker.update(6, &bus), Some(ServiceStatus::Completed));

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].previous, ServiceStatus::Inactive);
        assert_eq!(events[2].current, ServiceStatus::Completed);
    }

    #[test]
    fn test_active_never_drops_to_inactive() {
        let bus = EventBus::new();
        let mut tracker = StatusTracker::new(ServiceKind::Boarding);
        tracker.update(5, &bus);

        assert_eq!(tracker.update(1, &bus), Some(ServiceStatus::Completed));
        assert_eq!(tracker.status(), ServiceStatus::Completed);

        // a new cycle may start from Completed
        assert_eq!(tracker.update(3, &bus), Some(ServiceStatus::Inactive));
    }

    #[test]
    fn test_reset_publishes() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_service_status();
        let mut tracker = StatusTracker::new(ServiceKind::Refueling);
        tracker.update(5, &bus);
        assert_eq!(tracker.reset(&bus), Some(ServiceStatus::Inactive));
        assert_eq!(tracker.raw(), None);
        assert_eq!(rx.try_recv().unwrap().current, ServiceStatus::Active);
        assert_eq!(rx.try_recv().unwrap().current, ServiceStatus::Inactive);
    }

    proptest! {
        /// One event per derived change, and an active service always
        /// completes before it can go idle again.
        #[test]
        fn prop_events_follow_status_changes(
            codes in prop::collection::vec(0i64..8, 0..50),
            connection_table: bool,
        ) {
            let kind = if connection_table { ServiceKind::Jetway } else { ServiceKind::Boarding };
            let bus = EventBus::new();
            let mut rx = bus.subscribe_service_status();
            let mut tracker = StatusTracker::new(kind);

            let mut changes = 0;
            for code in codes {
                let before = tracker.status();
                let reported = tracker.update(code, &bus);
                let after = tracker.status();

                prop_assert_eq!(reported.is_some(), before != after);
                if before != after {
                    changes += 1;
                }
                if before == ServiceStatus::Active {
                    prop_assert!(matches!(
                        after,
                        ServiceStatus::Active | ServiceStatus::Completed
                    ));
                }
            }

            let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
            prop_assert_eq!(events.len(), changes);
            for event in &events {
                prop_assert_eq!(event.service, kind);
                prop_assert_ne!(event.previous, event.current);
                prop_assert!(!(event.previous == ServiceStatus::Active
                    && event.current == ServiceStatus::Inactive));
            }
        }
    }
}
