//! Passenger seat assignment.

use rand::seq::index::sample;
use rand::Rng;
use thiserror::Error;
use tracing::warn;

/// Seats in the cabin.
pub const SEAT_COUNT: usize = 132;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeatError {
    #[error("Passenger count cannot be negative (got {0})")]
    NegativeCount(i64),
}

/// Clamp a planned passenger count to the cabin size.
pub fn clamp_passengers(requested: i64) -> Result<u32, SeatError> {
    if requested < 0 {
        return Err(SeatError::NegativeCount(requested));
    }
    if requested as u64 > SEAT_COUNT as u64 {
        warn!(
            requested,
            seats = SEAT_COUNT,
            "More passengers planned than seats, clamping"
        );
        return Ok(SEAT_COUNT as u32);
    }
    Ok(requested as u32)
}

/// Seat occupancy for one flight.
///
/// Seats are drawn once, uniformly without replacement. The draw order is
/// kept as the boarding order, so the first `n` seats of
/// [`SeatMap::boarding_order`] are the ones taken after `n` passengers board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMap {
    occupied: [bool; SEAT_COUNT],
    order: Vec<usize>,
}

impl SeatMap {
    pub fn empty() -> Self {
        Self {
            occupied: [false; SEAT_COUNT],
            order: Vec::new(),
        }
    }

    /// Draw seats for `requested` passengers.
    pub fn assign<R: Rng + ?Sized>(requested: i64, rng: &mut R) -> Result<Self, SeatError> {
        let count = clamp_passengers(requested)? as usize;
        let order = sample(rng, SEAT_COUNT, count).into_vec();
        let mut occupied = [false; SEAT_COUNT];
        for &seat in &order {
            occupied[seat] = true;
        }
        Ok(Self { occupied, order })
    }

    pub fn occupation(&self) -> &[bool; SEAT_COUNT] {
        &self.occupied
    }

    pub fn occupied_count(&self) -> usize {
        self.order.len()
    }

    pub fn boarding_order(&self) -> &[usize] {
        &self.order
    }
}

impl Default for SeatMap {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exact_count_of_distinct_seats() {
        let mut rng = StdRng::seed_from_u64(7);
        let seats = SeatMap::assign(98, &mut rng).unwrap();

        assert_eq!(seats.occupation().iter().filter(|s| **s).count(), 98);
        let mut order = seats.boarding_order().to_vec();
        order.sort_unstable();
        order.dedup();
        assert_eq!(order.len(), 98);
    }

    #[test]
    fn test_overbooked_flight_fills_cabin() {
        let mut rng = StdRng::seed_from_u64(1);
        let seats = SeatMap::assign(150, &mut rng).unwrap();

        assert_eq!(seats.occupied_count(), SEAT_COUNT);
        assert!(seats.occupation().iter().all(|s| *s));
    }

    #[test]
    fn test_negative_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            SeatMap::assign(-3, &mut rng),
            Err(SeatError::NegativeCount(-3))
        );
    }

    #[test]
    fn test_same_seed_same_seats() {
        let a = SeatMap::assign(40, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = SeatMap::assign(40, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_passengers() {
        let seats = SeatMap::assign(0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(seats.occupied_count(), 0);
    }

    proptest! {
        /// Seat occupation always has exactly min(requested, 132) true entries.
        #[test]
        fn prop_occupied_matches_clamped_request(requested in 0i64..400, seed: u64) {
            let seats = SeatMap::assign(requested, &mut StdRng::seed_from_u64(seed)).unwrap();
            let expected = (requested as usize).min(SEAT_COUNT);

            prop_assert_eq!(seats.occupation().iter().filter(|s| **s).count(), expected);
            prop_assert_eq!(seats.occupied_count(), expected);
        }
    }
}
