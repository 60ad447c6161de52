//! Typed validation errors for fleet construction and request submission.

use thiserror::Error;

/// Errors raised when a car, fleet, or request is built from invalid input.
///
/// These are hard failures surfaced at the call that creates the offending
/// object. Requests that are merely unserviceable by the current fleet are
/// not errors; they go to the controller's pending queue instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("min_floor ({min}) is greater than max_floor ({max})")]
    InvalidFloorRange { min: i32, max: i32 },

    #[error("start_floor ({start}) must be between min_floor ({min}) and max_floor ({max})")]
    StartFloorOutOfRange { start: i32, min: i32, max: i32 },

    #[error("capacity must be >= 1, got {capacity}")]
    InvalidCapacity { capacity: u32 },

    #[error("pickup floor ({floor}) cannot equal destination floor")]
    SameFloor { floor: i32 },

    #[error("passengers must be >= 1, got {passengers}")]
    InvalidPassengerCount { passengers: u32 },

    #[error("start_floors length ({actual}) must match car count ({expected})")]
    StartFloorCountMismatch { expected: usize, actual: usize },

    #[error("at least one car is required")]
    EmptyFleet,

    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
}

/// Shorthand result type for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;
