//! Event sinks for car lifecycle events.
//!
//! Sinks are synchronous and fire-and-forget: the car invokes them after the
//! triggering state change, with its lock already released. A panicking sink
//! is caught and logged by the car rather than allowed to disturb it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info};

use super::types::{CarState, Request};

/// Callbacks invoked by a car at key points of its lifecycle.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about. The `state` argument is the snapshot
/// taken at the moment the event fired.
///
/// Sinks must not call back into the fleet controller; they run while the
/// controller may be mid-tick.
pub trait CarObserver: Send + Sync {
    /// Called when a car arrives at a new floor.
    fn on_floor_reached(&self, _state: &CarState, _floor: i32) {}

    /// Called when the doors open at a stop.
    fn on_door_opened(&self, _state: &CarState) {}

    /// Called when the doors close again.
    fn on_door_closed(&self, _state: &CarState) {}

    /// Called when a car accepts a new request.
    fn on_request_accepted(&self, _state: &CarState, _request: &Request) {}

    /// Called when a request completes (passengers delivered).
    fn on_request_completed(&self, _state: &CarState, _request: &Request) {}

    /// Called when a car's sweep direction changes.
    fn on_direction_changed(&self, _state: &CarState) {}
}

/// Sink that logs every event through the `log` facade.
pub struct LoggingObserver;

impl CarObserver for LoggingObserver {
    fn on_floor_reached(&self, state: &CarState, floor: i32) {
        info!(
            "[car {}] reached floor {} (direction: {:?}, load: {}/{})",
            state.car_id, floor, state.direction, state.current_load, state.capacity
        );
    }

    fn on_door_opened(&self, state: &CarState) {
        debug!(
            "[car {}] doors opened at floor {}",
            state.car_id, state.current_floor
        );
    }

    fn on_door_closed(&self, state: &CarState) {
        debug!(
            "[car {}] doors closed at floor {}",
            state.car_id, state.current_floor
        );
    }

    fn on_request_accepted(&self, state: &CarState, request: &Request) {
        info!(
            "[car {}] accepted request: floor {} -> {} ({} passenger(s))",
            state.car_id,
            request.pickup_floor(),
            request.destination_floor(),
            request.passengers()
        );
    }

    fn on_request_completed(&self, state: &CarState, request: &Request) {
        info!(
            "[car {}] completed request: floor {} -> {} (waited {:.1}s)",
            state.car_id,
            request.pickup_floor(),
            request.destination_floor(),
            request.created_at().elapsed().as_secs_f64()
        );
    }

    fn on_direction_changed(&self, state: &CarState) {
        info!(
            "[car {}] direction changed to {:?} at floor {}",
            state.car_id, state.direction, state.current_floor
        );
    }
}

/// Sink that accumulates request and movement metrics.
///
/// Shareable across cars and threads; counters live behind a mutex.
#[derive(Default)]
pub struct MetricsObserver {
    inner: Mutex<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    requests_completed: usize,
    total_wait: Duration,
    floor_visits: usize,
    load_samples: Vec<u32>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of requests delivered so far.
    pub fn requests_completed(&self) -> usize {
        self.locked().requests_completed
    }

    /// Mean time from submission to delivery over completed requests.
    pub fn average_wait(&self) -> Duration {
        let inner = self.locked();
        if inner.requests_completed == 0 {
            return Duration::ZERO;
        }
        inner.total_wait / inner.requests_completed as u32
    }

    /// Total floor arrivals observed across all cars.
    pub fn floor_visits(&self) -> usize {
        self.locked().floor_visits
    }

    /// Mean load sampled at each floor arrival.
    pub fn average_load(&self) -> f64 {
        let inner = self.locked();
        if inner.load_samples.is_empty() {
            return 0.0;
        }
        let total: u64 = inner.load_samples.iter().map(|&l| u64::from(l)).sum();
        total as f64 / inner.load_samples.len() as f64
    }
}

impl CarObserver for MetricsObserver {
    fn on_floor_reached(&self, state: &CarState, _floor: i32) {
        let mut inner = self.locked();
        inner.floor_visits += 1;
        inner.load_samples.push(state.current_load);
    }

    fn on_request_completed(&self, _state: &CarState, request: &Request) {
        let mut inner = self.locked();
        inner.requests_completed += 1;
        inner.total_wait += request.created_at().elapsed();
    }
}

/// Sink that fans each event out to several child sinks.
pub struct CompositeObserver {
    children: Vec<Arc<dyn CarObserver>>,
}

impl CompositeObserver {
    pub fn new(children: Vec<Arc<dyn CarObserver>>) -> Self {
        Self { children }
    }

    pub fn add(&mut self, observer: Arc<dyn CarObserver>) {
        self.children.push(observer);
    }
}

impl CarObserver for CompositeObserver {
    fn on_floor_reached(&self, state: &CarState, floor: i32) {
        for child in &self.children {
            child.on_floor_reached(state, floor);
        }
    }

    fn on_door_opened(&self, state: &CarState) {
        for child in &self.children {
            child.on_door_opened(state);
        }
    }

    fn on_door_closed(&self, state: &CarState) {
        for child in &self.children {
            child.on_door_closed(state);
        }
    }

    fn on_request_accepted(&self, state: &CarState, request: &Request) {
        for child in &self.children {
            child.on_request_accepted(state, request);
        }
    }

    fn on_request_completed(&self, state: &CarState, request: &Request) {
        for child in &self.children {
            child.on_request_completed(state, request);
        }
    }

    fn on_direction_changed(&self, state: &CarState) {
        for child in &self.children {
            child.on_direction_changed(state);
        }
    }
}
