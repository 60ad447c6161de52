//! Standalone elevator fleet simulation.
//!
//! All core scheduling and dispatch logic lives here, independent of any
//! particular driver. The demo binary and the integration tests both drive
//! the fleet through [`FleetController`].

mod builder;
mod car;
mod controller;
mod dispatch;
mod error;
mod observer;
mod types;

// Re-export the public surface so callers use `fleet::Car` and friends.
pub use builder::FleetBuilder;
pub use car::Car;
pub use controller::{CarStatus, FleetController, FleetStatus};
pub use dispatch::{DispatchStrategy, FcfsDispatch, LookDispatch, NearestDispatch, ZonedDispatch};
pub use error::{FleetError, FleetResult};
pub use observer::{CarObserver, CompositeObserver, LoggingObserver, MetricsObserver};
pub use types::{CarState, Direction, DoorState, Request, RequestId};
