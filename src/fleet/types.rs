//! Core domain types for the elevator fleet.
//!
//! Standalone value types shared by the car state machine, the dispatch
//! strategies, and the controller.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::error::FleetError;

/// Travel direction of a car or a request.
///
/// `Idle` means the car is stationary with no pending stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Idle,
}

impl Direction {
    /// The opposite direction; `Idle` stays `Idle`.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Idle => Direction::Idle,
        }
    }
}

/// Door state of a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    Closing,
}

/// A unique identifier for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

fn next_request_id() -> RequestId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// An immutable travel request from one floor to another.
///
/// Identity is by `id`: two requests with identical floors are distinct
/// entities. The travel direction is derived from the floor pair.
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    pickup_floor: i32,
    destination_floor: i32,
    passengers: u32,
    created_at: Instant,
}

impl Request {
    /// Create a request, validating that the floors differ and at least one
    /// passenger is travelling.
    pub fn new(
        pickup_floor: i32,
        destination_floor: i32,
        passengers: u32,
    ) -> Result<Self, FleetError> {
        if pickup_floor == destination_floor {
            return Err(FleetError::SameFloor {
                floor: pickup_floor,
            });
        }
        if passengers < 1 {
            return Err(FleetError::InvalidPassengerCount { passengers });
        }

        Ok(Self {
            id: next_request_id(),
            pickup_floor,
            destination_floor,
            passengers,
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn pickup_floor(&self) -> i32 {
        self.pickup_floor
    }

    pub fn destination_floor(&self) -> i32 {
        self.destination_floor
    }

    pub fn passengers(&self) -> u32 {
        self.passengers
    }

    /// When the request was submitted.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Direction of travel implied by the floor pair.
    pub fn direction(&self) -> Direction {
        if self.destination_floor > self.pickup_floor {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Request {}

impl Hash for Request {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Read-only snapshot of a single car.
///
/// Snapshots are copied out of the car under its lock, so a snapshot never
/// shows a partially-updated car. Dispatch strategies and event sinks work
/// exclusively from these.
#[derive(Debug, Clone)]
pub struct CarState {
    pub car_id: usize,
    pub current_floor: i32,
    pub direction: Direction,
    pub door_state: DoorState,
    /// Passengers currently inside.
    pub current_load: u32,
    pub capacity: u32,
    /// Floors still to visit while sweeping up.
    pub pending_stops_up: BTreeSet<i32>,
    /// Floors still to visit while sweeping down.
    pub pending_stops_down: BTreeSet<i32>,
}

impl CarState {
    /// True when the car has no pending work at all.
    pub fn is_idle(&self) -> bool {
        self.direction == Direction::Idle
            && self.pending_stops_up.is_empty()
            && self.pending_stops_down.is_empty()
    }

    /// Remaining room for new passengers.
    pub fn available_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.current_load)
    }

    /// Total number of floors the car still needs to visit.
    pub fn total_pending_stops(&self) -> usize {
        self.pending_stops_up.len() + self.pending_stops_down.len()
    }

    /// Absolute distance from the car to a floor.
    pub fn distance_to(&self, floor: i32) -> u32 {
        self.current_floor.abs_diff(floor)
    }
}
