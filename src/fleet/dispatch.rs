//! Dispatch strategies for assigning requests to cars.
//!
//! A strategy is a pure selection policy over a snapshot of the fleet. The
//! controller holds the active strategy behind its lock, so policies are
//! swappable at runtime. Every policy filters to cars that can accept the
//! request before choosing among them.

use std::collections::HashMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;

use super::car::Car;
use super::types::{CarState, Direction, Request};

/// Policy for choosing which car answers a request.
pub trait DispatchStrategy: Send {
    /// Select a car for the request, or `None` when no car can accept it.
    /// The caller queues unplaceable requests; strategies never retry.
    fn select(&mut self, request: &Request, cars: &[Arc<Car>]) -> Option<Arc<Car>>;
}

fn compatible_cars(request: &Request, cars: &[Arc<Car>]) -> Vec<Arc<Car>> {
    cars.iter()
        .filter(|car| car.can_accept(request))
        .cloned()
        .collect()
}

/// Default strategy scoring each car by distance, heading, and load.
///
/// Cars already sweeping toward the pickup in the request's direction score
/// best; cars that would have to reverse first score worst. The lowest score
/// wins, with ties going to the first car in fleet order.
#[derive(Debug, Default)]
pub struct LookDispatch;

impl LookDispatch {
    pub fn new() -> Self {
        Self
    }

    fn score(state: &CarState, pickup_floor: i32, request_direction: Direction) -> f64 {
        let mut score = f64::from(state.distance_to(pickup_floor));

        if state.is_idle() {
            return score + state.total_pending_stops() as f64 * 0.5;
        }

        let current = state.current_floor;
        match state.direction {
            Direction::Up => {
                if pickup_floor >= current {
                    // On the current sweep; cheap if the rider travels the
                    // same way, pricier if they want the return leg.
                    score *= if request_direction == Direction::Up {
                        0.5
                    } else {
                        1.5
                    };
                } else {
                    // Pickup is behind the sweep; a reversal comes first.
                    score *= 2.0;
                }
            }
            Direction::Down => {
                if pickup_floor <= current {
                    score *= if request_direction == Direction::Down {
                        0.5
                    } else {
                        1.5
                    };
                } else {
                    score *= 2.0;
                }
            }
            Direction::Idle => {}
        }

        score += state.total_pending_stops() as f64 * 0.3;

        if f64::from(state.current_load) >= f64::from(state.capacity) * 0.8 {
            score *= 1.5;
        }

        score
    }
}

impl DispatchStrategy for LookDispatch {
    fn select(&mut self, request: &Request, cars: &[Arc<Car>]) -> Option<Arc<Car>> {
        let compatible = compatible_cars(request, cars);
        if compatible.is_empty() {
            return None;
        }

        let mut best: Option<(OrderedFloat<f64>, Arc<Car>)> = None;
        for car in compatible {
            let state = car.state();
            let score = OrderedFloat(Self::score(
                &state,
                request.pickup_floor(),
                request.direction(),
            ));
            match &best {
                Some((best_score, _)) if score >= *best_score => {}
                _ => best = Some((score, car)),
            }
        }

        best.map(|(_, car)| car)
    }
}

/// Picks the closest idle compatible car, falling back to the closest
/// compatible car regardless of state.
#[derive(Debug, Default)]
pub struct NearestDispatch;

impl NearestDispatch {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchStrategy for NearestDispatch {
    fn select(&mut self, request: &Request, cars: &[Arc<Car>]) -> Option<Arc<Car>> {
        let compatible = compatible_cars(request, cars);
        if compatible.is_empty() {
            return None;
        }
        let pickup = request.pickup_floor();

        let idle: Vec<Arc<Car>> = compatible
            .iter()
            .filter(|car| car.state().is_idle())
            .cloned()
            .collect();

        let candidates = if idle.is_empty() { compatible } else { idle };
        candidates
            .into_iter()
            .min_by_key(|car| car.state().distance_to(pickup))
    }
}

/// Round-robin assignment over the whole fleet.
///
/// The rotating index advances over every car, compatible or not, so
/// assignment follows fleet order rather than availability. Useful for even
/// load distribution and for predictable behavior in tests.
#[derive(Debug, Default)]
pub struct FcfsDispatch {
    next_index: usize,
}

impl FcfsDispatch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DispatchStrategy for FcfsDispatch {
    fn select(&mut self, request: &Request, cars: &[Arc<Car>]) -> Option<Arc<Car>> {
        let compatible = compatible_cars(request, cars);
        if compatible.is_empty() {
            return None;
        }

        let n = cars.len();
        for _ in 0..n {
            let idx = self.next_index % n;
            self.next_index = (self.next_index + 1) % n;

            if compatible.iter().any(|car| car.id() == cars[idx].id()) {
                return Some(cars[idx].clone());
            }
        }

        compatible.first().cloned()
    }
}

/// Prefers cars whose assigned floor zone contains the pickup floor.
///
/// Cars without a zone, or requests outside every zone, fall back to
/// nearest-car selection among the compatible cars.
pub struct ZonedDispatch {
    zones: HashMap<usize, (i32, i32)>,
    fallback: NearestDispatch,
}

impl Default for ZonedDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ZonedDispatch {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
            fallback: NearestDispatch::new(),
        }
    }

    pub fn with_zones(zones: HashMap<usize, (i32, i32)>) -> Self {
        Self {
            zones,
            fallback: NearestDispatch::new(),
        }
    }

    /// Assign a `[min_floor, max_floor]` zone to a car.
    pub fn set_zone(&mut self, car_id: usize, min_floor: i32, max_floor: i32) {
        self.zones.insert(car_id, (min_floor, max_floor));
    }
}

impl DispatchStrategy for ZonedDispatch {
    fn select(&mut self, request: &Request, cars: &[Arc<Car>]) -> Option<Arc<Car>> {
        let compatible = compatible_cars(request, cars);
        if compatible.is_empty() {
            return None;
        }
        let pickup = request.pickup_floor();

        let in_zone: Vec<Arc<Car>> = compatible
            .iter()
            .filter(|car| {
                self.zones
                    .get(&car.id())
                    .map_or(false, |&(min, max)| (min..=max).contains(&pickup))
            })
            .cloned()
            .collect();

        if !in_zone.is_empty() {
            return in_zone
                .into_iter()
                .min_by_key(|car| car.state().distance_to(pickup));
        }

        self.fallback.select(request, &compatible)
    }
}
