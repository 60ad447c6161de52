//! Car scheduling state machine.
//!
//! Each car serves its stops with a LOOK sweep: it keeps moving in the
//! current direction until no stops remain ahead, then reverses. Stops are
//! kept in two ordered sets, one per sweep direction, and every request is
//! tracked against both of its floors until delivered.

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use super::error::{FleetError, FleetResult};
use super::observer::CarObserver;
use super::types::{CarState, Direction, DoorState, Request};

/// One car of the fleet.
///
/// Floor bounds and capacity are fixed at construction; everything else
/// lives behind a private lock. `step` advances the car one simulated time
/// unit. All public operations are safe to call from any thread.
pub struct Car {
    id: usize,
    min_floor: i32,
    max_floor: i32,
    capacity: u32,
    inner: Mutex<CarInner>,
    observers: Mutex<Vec<Arc<dyn CarObserver>>>,
}

struct CarInner {
    current_floor: i32,
    direction: Direction,
    door_state: DoorState,
    current_load: u32,
    up_stops: BTreeSet<i32>,
    down_stops: BTreeSet<i32>,
    /// floor -> requests still needing action there (pickup or drop-off).
    active_requests: HashMap<i32, Vec<Arc<Request>>>,
}

/// Event recorded while the car lock is held, delivered to sinks after it
/// is released. Each event carries the snapshot taken at its trigger point.
enum CarEvent {
    FloorReached { state: CarState, floor: i32 },
    DoorOpened { state: CarState },
    DoorClosed { state: CarState },
    RequestAccepted { state: CarState, request: Arc<Request> },
    RequestCompleted { state: CarState, request: Arc<Request> },
    DirectionChanged { state: CarState },
}

impl Car {
    /// Create a car serving floors `min_floor..=max_floor`, starting idle
    /// at `start_floor` with its doors closed.
    pub fn new(
        id: usize,
        min_floor: i32,
        max_floor: i32,
        capacity: u32,
        start_floor: i32,
    ) -> FleetResult<Self> {
        if min_floor > max_floor {
            return Err(FleetError::InvalidFloorRange {
                min: min_floor,
                max: max_floor,
            });
        }
        if !(min_floor..=max_floor).contains(&start_floor) {
            return Err(FleetError::StartFloorOutOfRange {
                start: start_floor,
                min: min_floor,
                max: max_floor,
            });
        }
        if capacity < 1 {
            return Err(FleetError::InvalidCapacity { capacity });
        }

        Ok(Self {
            id,
            min_floor,
            max_floor,
            capacity,
            inner: Mutex::new(CarInner {
                current_floor: start_floor,
                direction: Direction::Idle,
                door_state: DoorState::Closed,
                current_load: 0,
                up_stops: BTreeSet::new(),
                down_stops: BTreeSet::new(),
                active_requests: HashMap::new(),
            }),
            observers: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn min_floor(&self) -> i32 {
        self.min_floor
    }

    pub fn max_floor(&self) -> i32 {
        self.max_floor
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Register a sink for this car's events.
    pub fn add_observer(&self, observer: Arc<dyn CarObserver>) {
        self.lock_observers().push(observer);
    }

    /// Remove a previously registered sink (matched by identity).
    pub fn remove_observer(&self, observer: &Arc<dyn CarObserver>) {
        self.lock_observers()
            .retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    /// Snapshot of the car's current state.
    pub fn state(&self) -> CarState {
        let inner = self.lock_inner();
        self.snapshot(&inner)
    }

    /// Whether this car could ever serve the request: both floors must lie
    /// within the served range and the party must fit in an empty car.
    ///
    /// Capacity here is checked against the request alone; current load is
    /// enforced at boarding time inside [`Car::step`].
    pub fn can_accept(&self, request: &Request) -> bool {
        let in_range = |floor: i32| (self.min_floor..=self.max_floor).contains(&floor);

        in_range(request.pickup_floor())
            && in_range(request.destination_floor())
            && request.passengers() <= self.capacity
    }

    /// Enqueue a request on this car.
    ///
    /// Returns false without mutating anything when the request is not
    /// compatible. Otherwise both of its floors join the stop set matching
    /// the request's travel direction, and an idle car turns toward the
    /// pickup floor.
    pub fn add_request(&self, request: Arc<Request>) -> bool {
        if !self.can_accept(&request) {
            return false;
        }

        let mut events = Vec::new();
        {
            let mut inner = self.lock_inner();
            let pickup = request.pickup_floor();
            let destination = request.destination_floor();

            inner
                .active_requests
                .entry(pickup)
                .or_default()
                .push(request.clone());
            inner
                .active_requests
                .entry(destination)
                .or_default()
                .push(request.clone());

            if request.direction() == Direction::Up {
                inner.up_stops.insert(pickup);
                inner.up_stops.insert(destination);
            } else {
                inner.down_stops.insert(pickup);
                inner.down_stops.insert(destination);
            }

            if inner.direction == Direction::Idle {
                inner.direction = if pickup > inner.current_floor {
                    Direction::Up
                } else if pickup < inner.current_floor {
                    Direction::Down
                } else {
                    request.direction()
                };
            }

            events.push(CarEvent::RequestAccepted {
                state: self.snapshot(&inner),
                request: request.clone(),
            });
        }
        self.deliver(events);
        true
    }

    /// Advance the car one simulated time unit.
    ///
    /// An idle car does nothing. Otherwise the car serves the current floor
    /// if it is a stop, moves one floor if any stops remain, serves the new
    /// floor if it is also a stop, and finally recomputes its direction.
    pub fn step(&self) {
        let mut events = Vec::new();
        {
            let mut inner = self.lock_inner();
            if inner.direction == Direction::Idle {
                return;
            }

            if Self::is_stop_floor(&inner) {
                self.process_arrival(&mut inner, &mut events);
            }

            if !inner.up_stops.is_empty() || !inner.down_stops.is_empty() {
                self.advance_one_floor(&mut inner);
                events.push(CarEvent::FloorReached {
                    state: self.snapshot(&inner),
                    floor: inner.current_floor,
                });

                // A pickup and an adjacent drop-off can both resolve in one
                // tick.
                if Self::is_stop_floor(&inner) {
                    self.process_arrival(&mut inner, &mut events);
                }
            }

            self.update_direction(&mut inner, &mut events);
        }
        self.deliver(events);
    }

    /// Whether the current floor is a pending stop for the current sweep.
    fn is_stop_floor(inner: &CarInner) -> bool {
        let floor = inner.current_floor;
        match inner.direction {
            Direction::Up => inner.up_stops.contains(&floor),
            Direction::Down => inner.down_stops.contains(&floor),
            Direction::Idle => {
                inner.up_stops.contains(&floor) || inner.down_stops.contains(&floor)
            }
        }
    }

    /// Serve the current floor: open doors, alight and board passengers,
    /// close doors.
    fn process_arrival(&self, inner: &mut CarInner, events: &mut Vec<CarEvent>) {
        let floor = inner.current_floor;

        inner.door_state = DoorState::Open;
        events.push(CarEvent::DoorOpened {
            state: self.snapshot(inner),
        });

        match inner.direction {
            Direction::Up => {
                inner.up_stops.remove(&floor);
            }
            Direction::Down => {
                inner.down_stops.remove(&floor);
            }
            Direction::Idle => {}
        }

        let mut completed: Vec<Arc<Request>> = Vec::new();
        if let Some(requests) = inner.active_requests.get(&floor).cloned() {
            for request in requests {
                if request.destination_floor() == floor {
                    // Passengers exiting.
                    inner.current_load =
                        inner.current_load.saturating_sub(request.passengers());
                    completed.push(request.clone());
                    events.push(CarEvent::RequestCompleted {
                        state: self.snapshot(inner),
                        request,
                    });
                } else if request.pickup_floor() == floor
                    && inner.current_load + request.passengers() <= self.capacity
                {
                    // Passengers entering. A party that does not fit stays
                    // registered at this floor and boards on a later visit.
                    inner.current_load += request.passengers();
                }
            }
        }

        for request in &completed {
            Self::remove_request(&mut inner.active_requests, floor, request);
            Self::remove_request(&mut inner.active_requests, request.pickup_floor(), request);
        }

        inner.door_state = DoorState::Closed;
        events.push(CarEvent::DoorClosed {
            state: self.snapshot(inner),
        });
    }

    fn remove_request(
        map: &mut HashMap<i32, Vec<Arc<Request>>>,
        floor: i32,
        request: &Arc<Request>,
    ) {
        if let Some(requests) = map.get_mut(&floor) {
            requests.retain(|r| r.id() != request.id());
            if requests.is_empty() {
                map.remove(&floor);
            }
        }
    }

    /// Move one floor in the current direction, clamped to the served range.
    fn advance_one_floor(&self, inner: &mut CarInner) {
        match inner.direction {
            Direction::Up if inner.current_floor < self.max_floor => {
                inner.current_floor += 1;
            }
            Direction::Down if inner.current_floor > self.min_floor => {
                inner.current_floor -= 1;
            }
            _ => {}
        }
    }

    /// Recompute the sweep direction (the LOOK discipline): keep going while
    /// stops remain strictly ahead, reverse when work exists on the other
    /// side or behind, go idle when nothing is left.
    fn update_direction(&self, inner: &mut CarInner, events: &mut Vec<CarEvent>) {
        let previous = inner.direction;
        let floor = inner.current_floor;

        match inner.direction {
            Direction::Up => {
                let stops_above = inner
                    .up_stops
                    .range((Bound::Excluded(floor), Bound::Unbounded))
                    .next()
                    .is_some();
                if stops_above {
                    return;
                }
                if !inner.down_stops.is_empty() || !inner.up_stops.is_empty() {
                    // Remaining up-stops can only be below us now, picked up
                    // while sweeping; they need the reverse leg too.
                    inner.direction = Direction::Down;
                } else {
                    inner.direction = Direction::Idle;
                }
            }
            Direction::Down => {
                let stops_below = inner
                    .down_stops
                    .range((Bound::Unbounded, Bound::Excluded(floor)))
                    .next_back()
                    .is_some();
                if stops_below {
                    return;
                }
                if !inner.up_stops.is_empty() || !inner.down_stops.is_empty() {
                    inner.direction = Direction::Up;
                } else {
                    inner.direction = Direction::Idle;
                }
            }
            Direction::Idle => return,
        }

        if inner.direction != previous {
            events.push(CarEvent::DirectionChanged {
                state: self.snapshot(inner),
            });
        }
    }

    fn snapshot(&self, inner: &CarInner) -> CarState {
        CarState {
            car_id: self.id,
            current_floor: inner.current_floor,
            direction: inner.direction,
            door_state: inner.door_state,
            current_load: inner.current_load,
            capacity: self.capacity,
            pending_stops_up: inner.up_stops.clone(),
            pending_stops_down: inner.down_stops.clone(),
        }
    }

    /// Deliver queued events to every sink, in order. A panicking sink is
    /// caught and logged; it never disturbs the car.
    fn deliver(&self, events: Vec<CarEvent>) {
        if events.is_empty() {
            return;
        }
        let observers = self.lock_observers().clone();

        for event in &events {
            for observer in &observers {
                let call = panic::catch_unwind(AssertUnwindSafe(|| match event {
                    CarEvent::FloorReached { state, floor } => {
                        observer.on_floor_reached(state, *floor);
                    }
                    CarEvent::DoorOpened { state } => observer.on_door_opened(state),
                    CarEvent::DoorClosed { state } => observer.on_door_closed(state),
                    CarEvent::RequestAccepted { state, request } => {
                        observer.on_request_accepted(state, request);
                    }
                    CarEvent::RequestCompleted { state, request } => {
                        observer.on_request_completed(state, request);
                    }
                    CarEvent::DirectionChanged { state } => {
                        observer.on_direction_changed(state);
                    }
                }));
                if call.is_err() {
                    warn!("[car {}] event sink panicked; event dropped", self.id);
                }
            }
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, CarInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_observers(&self) -> MutexGuard<'_, Vec<Arc<dyn CarObserver>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Car {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("Car")
            .field("id", &self.id)
            .field("floor", &inner.current_floor)
            .field("direction", &inner.direction)
            .field("load", &inner.current_load)
            .field("capacity", &self.capacity)
            .finish()
    }
}
