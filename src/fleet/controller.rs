//! Fleet controller: owns the cars, dispatches requests, runs the tick loop.
//!
//! The controller is the only component that touches more than one car per
//! operation. Its lock covers the strategy, the pending queue, and the
//! decision to dispatch or tick, so a full tick is atomic with respect to
//! concurrent request submissions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::warn;

use super::car::Car;
use super::dispatch::DispatchStrategy;
use super::error::{FleetError, FleetResult};
use super::observer::CarObserver;
use super::types::{CarState, Direction, Request};

/// How long `stop` waits for the ticker to acknowledge before giving up.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Status row for one car in a fleet snapshot.
#[derive(Debug, Clone)]
pub struct CarStatus {
    pub id: usize,
    pub floor: i32,
    pub direction: Direction,
    pub load: u32,
    pub capacity: u32,
    pub pending_stops: usize,
}

/// Fleet-wide snapshot returned by [`FleetController::status`].
#[derive(Debug, Clone)]
pub struct FleetStatus {
    pub running: bool,
    pub pending_requests: usize,
    pub total_cars: usize,
    pub idle_cars: usize,
    pub total_load: u32,
    pub total_capacity: u32,
    pub cars: Vec<CarStatus>,
}

/// Central coordinator for a fixed fleet of cars.
///
/// Any number of threads may submit requests concurrently; one background
/// ticker (or manual [`FleetController::step`] calls) advances the fleet.
pub struct FleetController {
    cars: Vec<Arc<Car>>,
    tick_interval: Duration,
    inner: Mutex<ControllerInner>,
    ticker: Mutex<Option<Ticker>>,
    running: AtomicBool,
}

impl std::fmt::Debug for FleetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetController")
            .field("cars", &self.cars.len())
            .field("tick_interval", &self.tick_interval)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

struct ControllerInner {
    strategy: Box<dyn DispatchStrategy>,
    /// Requests no car currently accepts, retried every tick.
    pending: VecDeque<Arc<Request>>,
}

struct Ticker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

impl FleetController {
    pub fn new(
        cars: Vec<Arc<Car>>,
        strategy: Box<dyn DispatchStrategy>,
        tick_interval: Duration,
    ) -> FleetResult<Self> {
        if cars.is_empty() {
            return Err(FleetError::EmptyFleet);
        }
        if tick_interval.is_zero() {
            return Err(FleetError::ZeroTickInterval);
        }

        Ok(Self {
            cars,
            tick_interval,
            inner: Mutex::new(ControllerInner {
                strategy,
                pending: VecDeque::new(),
            }),
            ticker: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    pub fn cars(&self) -> &[Arc<Car>] {
        &self.cars
    }

    pub fn get_car(&self, id: usize) -> Option<Arc<Car>> {
        self.cars.iter().find(|car| car.id() == id).cloned()
    }

    /// Attach one event sink to every car in the fleet.
    pub fn add_observer_to_all(&self, observer: Arc<dyn CarObserver>) {
        for car in &self.cars {
            car.add_observer(observer.clone());
        }
    }

    /// Swap the dispatch policy; takes effect on the next dispatch.
    pub fn set_strategy(&self, strategy: Box<dyn DispatchStrategy>) {
        self.lock_inner().strategy = strategy;
    }

    /// Submit a travel request.
    ///
    /// Fails only on invalid input (equal floors, zero passengers). A valid
    /// request is handed to the current strategy; when no car takes it, it
    /// joins the pending queue for retry on every tick. The request is
    /// returned either way.
    pub fn request_elevator(
        &self,
        pickup_floor: i32,
        destination_floor: i32,
        passengers: u32,
    ) -> FleetResult<Arc<Request>> {
        let request = Arc::new(Request::new(pickup_floor, destination_floor, passengers)?);

        let mut inner = self.lock_inner();
        self.dispatch(&mut inner, request.clone());
        Ok(request)
    }

    /// Try to place a request; queue it when no car takes it.
    fn dispatch(&self, inner: &mut ControllerInner, request: Arc<Request>) -> bool {
        if let Some(car) = inner.strategy.select(&request, &self.cars) {
            if car.add_request(request.clone()) {
                return true;
            }
        }

        inner.pending.push_back(request);
        false
    }

    /// Advance the whole fleet one simulated time unit.
    ///
    /// Pending requests are re-dispatched once in FIFO order, then every car
    /// steps in fleet order. The controller lock is held for the full tick,
    /// so a concurrent submission lands entirely before or after it.
    pub fn step(&self) {
        let mut inner = self.lock_inner();
        self.retry_pending(&mut inner);
        for car in &self.cars {
            car.step();
        }
    }

    fn retry_pending(&self, inner: &mut ControllerInner) {
        let mut still_pending = VecDeque::new();

        while let Some(request) = inner.pending.pop_front() {
            if let Some(car) = inner.strategy.select(&request, &self.cars) {
                if car.add_request(request.clone()) {
                    continue;
                }
            }
            still_pending.push_back(request);
        }

        inner.pending = still_pending;
    }

    /// Launch the background ticker. No-op when one is already running.
    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.lock_ticker();
        if ticker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<()>(1);
        let controller = Arc::clone(self);
        let interval = self.tick_interval;

        let handle = thread::spawn(move || {
            loop {
                // The inter-tick sleep happens inside the channel wait, so
                // no lock is held while sleeping and stop is seen promptly.
                select! {
                    recv(stop_rx) -> _ => break,
                    default(interval) => controller.step(),
                }
            }
            let _ = done_tx.send(());
        });

        *ticker = Some(Ticker {
            stop_tx,
            done_rx,
            handle,
        });
        self.running.store(true, Ordering::SeqCst);
    }

    /// Stop the background ticker, waiting up to a fixed timeout for it to
    /// exit. No-op when not running; safe to call repeatedly, and `start`
    /// may be called again afterwards.
    pub fn stop(&self) {
        self.stop_with_timeout(STOP_TIMEOUT);
    }

    /// Like [`FleetController::stop`] with an explicit bound on the wait.
    pub fn stop_with_timeout(&self, timeout: Duration) {
        let ticker = self.lock_ticker().take();
        let Some(ticker) = ticker else {
            return;
        };
        self.running.store(false, Ordering::SeqCst);

        let _ = ticker.stop_tx.send(());
        match ticker.done_rx.recv_timeout(timeout) {
            Ok(()) => {
                let _ = ticker.handle.join();
            }
            Err(_) => {
                warn!("ticker did not stop within {timeout:?}; detaching");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of requests currently waiting for a compatible car.
    pub fn pending_count(&self) -> usize {
        self.lock_inner().pending.len()
    }

    /// Snapshot of the whole fleet plus queue and run-state aggregates.
    pub fn status(&self) -> FleetStatus {
        let inner = self.lock_inner();
        let states: Vec<CarState> = self.cars.iter().map(|car| car.state()).collect();

        FleetStatus {
            running: self.is_running(),
            pending_requests: inner.pending.len(),
            total_cars: self.cars.len(),
            idle_cars: states.iter().filter(|state| state.is_idle()).count(),
            total_load: states.iter().map(|state| state.current_load).sum(),
            total_capacity: states.iter().map(|state| state.capacity).sum(),
            cars: states
                .iter()
                .map(|state| CarStatus {
                    id: state.car_id,
                    floor: state.current_floor,
                    direction: state.direction,
                    load: state.current_load,
                    capacity: state.capacity,
                    pending_stops: state.total_pending_stops(),
                })
                .collect(),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Option<Ticker>> {
        self.ticker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
