//! Tests for the fleet controller: dispatch, pending queue, tick loop, and
//! concurrent request submission.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use elevator_sim::fleet::{
    Car, CarObserver, CarState, DispatchStrategy, FcfsDispatch, FleetBuilder, FleetController,
    FleetError, LookDispatch, MetricsObserver, Request, RequestId,
};

fn small_fleet() -> Arc<FleetController> {
    FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(3, 8)
        .with_tick_interval(Duration::from_millis(5))
        .build()
        .expect("valid fleet config")
}

/// Counts accepted requests across every car it is attached to.
#[derive(Default)]
struct AcceptCounter {
    accepted: AtomicUsize,
}

impl CarObserver for AcceptCounter {
    fn on_request_accepted(&self, _state: &CarState, _request: &Request) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Strategy that refuses every request, forcing the pending queue.
struct RefuseAll;

impl DispatchStrategy for RefuseAll {
    fn select(&mut self, _request: &Request, _cars: &[Arc<Car>]) -> Option<Arc<Car>> {
        None
    }
}

#[test]
fn request_elevator_returns_the_request() {
    let controller = small_fleet();

    let request = controller
        .request_elevator(0, 5, 2)
        .expect("valid request");

    assert_eq!(request.pickup_floor(), 0);
    assert_eq!(request.destination_floor(), 5);
    assert_eq!(request.passengers(), 2);
}

#[test]
fn request_elevator_rejects_invalid_input() {
    let controller = small_fleet();

    assert_eq!(
        controller.request_elevator(4, 4, 1).unwrap_err(),
        FleetError::SameFloor { floor: 4 }
    );
    assert_eq!(
        controller.request_elevator(0, 5, 0).unwrap_err(),
        FleetError::InvalidPassengerCount { passengers: 0 }
    );
}

#[test]
fn oversized_request_stays_pending_forever() {
    let controller = small_fleet();

    // No car can ever hold 50 passengers, so the request is queued, not
    // rejected, and retried on every tick.
    let request = controller
        .request_elevator(0, 5, 50)
        .expect("queued request");
    assert_eq!(request.passengers(), 50);
    assert_eq!(controller.pending_count(), 1);

    controller.step();
    controller.step();
    assert_eq!(controller.pending_count(), 1);
}

#[test]
fn pending_request_dispatches_once_strategy_allows() {
    let controller = FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(1, 8)
        .with_strategy(Box::new(RefuseAll))
        .build()
        .expect("valid fleet config");

    controller.request_elevator(0, 5, 1).expect("valid request");
    assert_eq!(controller.pending_count(), 1);

    controller.set_strategy(Box::new(LookDispatch::new()));
    controller.step();

    let status = controller.status();
    assert_eq!(status.pending_requests, 0);
    assert_eq!(status.idle_cars, 0);
}

#[test]
fn step_advances_every_car() {
    let controller = FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(2, 8)
        .with_strategy(Box::new(FcfsDispatch::new()))
        .build()
        .expect("valid fleet config");

    controller.request_elevator(2, 4, 1).expect("valid request");
    controller.request_elevator(3, 5, 1).expect("valid request");

    controller.step();

    let status = controller.status();
    let floors: Vec<i32> = status.cars.iter().map(|car| car.floor).collect();
    assert_eq!(floors, [1, 1]);
}

#[test]
fn concurrent_submissions_are_never_lost() {
    let counter = Arc::new(AcceptCounter::default());
    let controller = FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(3, 8)
        .with_observer(counter.clone())
        .build()
        .expect("valid fleet config");

    let ids: Arc<Mutex<HashSet<RequestId>>> = Arc::new(Mutex::new(HashSet::new()));
    let mut producers = Vec::new();

    for _ in 0..4 {
        let controller = Arc::clone(&controller);
        let ids = Arc::clone(&ids);

        producers.push(thread::spawn(move || {
            for i in 0..25 {
                let floor = i % 10;
                // Five oversized requests per thread can never be placed.
                let passengers = if i % 5 == 4 { 50 } else { 1 };
                let request = controller
                    .request_elevator(floor, floor + 1, passengers)
                    .expect("valid request");
                ids.lock().unwrap().insert(request.id());
            }
        }));
    }

    for producer in producers {
        producer.join().expect("producer thread");
    }

    // Every submission produced exactly one request: 80 placed on cars, 20
    // waiting in the pending queue, none lost or duplicated.
    assert_eq!(ids.lock().unwrap().len(), 100);
    assert_eq!(counter.accepted.load(Ordering::SeqCst), 80);
    assert_eq!(controller.pending_count(), 20);
}

#[test]
fn stop_without_start_returns_immediately() {
    let controller = small_fleet();

    controller.stop();
    controller.stop();
    assert!(!controller.is_running());
}

#[test]
fn start_twice_keeps_a_single_ticker() {
    let controller = FleetBuilder::new()
        .with_floors(0, 100)
        .with_cars(1, 8)
        .with_tick_interval(Duration::from_millis(5))
        .build()
        .expect("valid fleet config");

    controller.request_elevator(0, 100, 1).expect("valid request");

    controller.start();
    controller.start();
    assert!(controller.is_running());

    thread::sleep(Duration::from_millis(50));
    controller.stop();
    assert!(!controller.is_running());

    // No straggling ticker keeps moving the car after stop.
    let floor_after_stop = controller.status().cars[0].floor;
    thread::sleep(Duration::from_millis(50));
    assert_eq!(controller.status().cars[0].floor, floor_after_stop);

    // The controller is restartable.
    controller.start();
    thread::sleep(Duration::from_millis(50));
    controller.stop();
    assert!(controller.status().cars[0].floor > floor_after_stop);
}

#[test]
fn status_reports_fleet_aggregates() {
    let controller = FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(3, 10)
        .build()
        .expect("valid fleet config");

    let status = controller.status();
    assert!(!status.running);
    assert_eq!(status.total_cars, 3);
    assert_eq!(status.idle_cars, 3);
    assert_eq!(status.total_load, 0);
    assert_eq!(status.total_capacity, 30);
    assert_eq!(status.cars.len(), 3);

    controller.request_elevator(2, 6, 1).expect("valid request");
    assert_eq!(controller.status().idle_cars, 2);
}

#[test]
fn builder_places_cars_at_start_floors() {
    let controller = FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(3, 8)
        .with_start_floors(vec![0, 5, 10])
        .build()
        .expect("valid fleet config");

    let floors: Vec<i32> = controller.status().cars.iter().map(|c| c.floor).collect();
    assert_eq!(floors, [0, 5, 10]);
}

#[test]
fn builder_rejects_invalid_configs() {
    assert_eq!(
        FleetBuilder::new().with_cars(0, 8).build().unwrap_err(),
        FleetError::EmptyFleet
    );
    assert_eq!(
        FleetBuilder::new().with_cars(2, 0).build().unwrap_err(),
        FleetError::InvalidCapacity { capacity: 0 }
    );
    assert_eq!(
        FleetBuilder::new().with_floors(10, 0).build().unwrap_err(),
        FleetError::InvalidFloorRange { min: 10, max: 0 }
    );
    assert_eq!(
        FleetBuilder::new()
            .with_cars(3, 8)
            .with_start_floors(vec![0, 5])
            .build()
            .unwrap_err(),
        FleetError::StartFloorCountMismatch {
            expected: 3,
            actual: 2
        }
    );
    assert_eq!(
        FleetBuilder::new()
            .with_tick_interval(Duration::ZERO)
            .build()
            .unwrap_err(),
        FleetError::ZeroTickInterval
    );
}

#[test]
fn get_car_finds_cars_by_id() {
    let controller = small_fleet();

    assert_eq!(controller.get_car(1).expect("car 1").id(), 1);
    assert!(controller.get_car(99).is_none());
}

#[test]
fn metrics_observer_tracks_completed_requests() {
    let metrics = Arc::new(MetricsObserver::new());
    let controller = FleetBuilder::new()
        .with_floors(0, 10)
        .with_cars(1, 8)
        .with_observer(metrics.clone())
        .build()
        .expect("valid fleet config");

    controller.request_elevator(0, 3, 1).expect("valid request");
    controller.request_elevator(2, 5, 1).expect("valid request");

    for _ in 0..50 {
        controller.step();
    }

    assert_eq!(metrics.requests_completed(), 2);
    assert!(metrics.floor_visits() > 0);
    assert!(metrics.average_load() > 0.0);
}
