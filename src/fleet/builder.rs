//! Fluent construction of a fleet controller.

use std::sync::Arc;
use std::time::Duration;

use super::car::Car;
use super::controller::FleetController;
use super::dispatch::{DispatchStrategy, LookDispatch};
use super::error::{FleetError, FleetResult};
use super::observer::CarObserver;

/// Builder assembling cars, strategy, observers, and tick interval into a
/// ready [`FleetController`].
///
/// All configuration is validated in [`FleetBuilder::build`].
///
/// # Example
///
/// ```rust,ignore
/// let controller = FleetBuilder::new()
///     .with_floors(0, 20)
///     .with_cars(4, 10)
///     .with_strategy(Box::new(LookDispatch::new()))
///     .with_tick_interval(Duration::from_millis(100))
///     .build()?;
/// ```
pub struct FleetBuilder {
    min_floor: i32,
    max_floor: i32,
    car_count: usize,
    capacity: u32,
    start_floors: Option<Vec<i32>>,
    strategy: Option<Box<dyn DispatchStrategy>>,
    tick_interval: Duration,
    observers: Vec<Arc<dyn CarObserver>>,
}

impl Default for FleetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetBuilder {
    pub fn new() -> Self {
        Self {
            min_floor: 0,
            max_floor: 10,
            car_count: 1,
            capacity: 8,
            start_floors: None,
            strategy: None,
            tick_interval: Duration::from_millis(500),
            observers: Vec::new(),
        }
    }

    /// Floor range served by every car.
    pub fn with_floors(mut self, min_floor: i32, max_floor: i32) -> Self {
        self.min_floor = min_floor;
        self.max_floor = max_floor;
        self
    }

    /// Number of cars and per-car passenger capacity.
    pub fn with_cars(mut self, count: usize, capacity: u32) -> Self {
        self.car_count = count;
        self.capacity = capacity;
        self
    }

    /// Explicit starting floor per car; the length must match the car count.
    /// Without this, every car starts at the bottom of the range.
    pub fn with_start_floors(mut self, start_floors: Vec<i32>) -> Self {
        self.start_floors = Some(start_floors);
        self
    }

    /// Dispatch policy; defaults to [`LookDispatch`].
    pub fn with_strategy(mut self, strategy: Box<dyn DispatchStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Interval between background ticks.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Attach an event sink to every car.
    pub fn with_observer(mut self, observer: Arc<dyn CarObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Validate the configuration and build the controller.
    pub fn build(self) -> FleetResult<Arc<FleetController>> {
        if self.car_count < 1 {
            return Err(FleetError::EmptyFleet);
        }
        if let Some(start_floors) = &self.start_floors {
            if start_floors.len() != self.car_count {
                return Err(FleetError::StartFloorCountMismatch {
                    expected: self.car_count,
                    actual: start_floors.len(),
                });
            }
        }

        let mut cars = Vec::with_capacity(self.car_count);
        for id in 0..self.car_count {
            let start_floor = self
                .start_floors
                .as_ref()
                .map_or(self.min_floor, |floors| floors[id]);

            let car = Arc::new(Car::new(
                id,
                self.min_floor,
                self.max_floor,
                self.capacity,
                start_floor,
            )?);

            for observer in &self.observers {
                car.add_observer(observer.clone());
            }

            cars.push(car);
        }

        let strategy = self
            .strategy
            .unwrap_or_else(|| Box::new(LookDispatch::new()));

        FleetController::new(cars, strategy, self.tick_interval).map(Arc::new)
    }
}
