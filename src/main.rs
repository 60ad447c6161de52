use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use elevator_sim::fleet::{
    DispatchStrategy, FcfsDispatch, FleetBuilder, FleetController, LoggingObserver, LookDispatch,
    MetricsObserver, NearestDispatch, ZonedDispatch,
};

#[derive(Parser)]
#[command(name = "elevator_sim")]
#[command(about = "Elevator fleet simulation with pluggable dispatch strategies")]
struct Cli {
    /// Number of cars in the fleet
    #[arg(long, default_value = "3")]
    cars: usize,

    /// Highest floor served (the lowest is 0)
    #[arg(long, default_value = "15")]
    top_floor: i32,

    /// Passenger capacity per car
    #[arg(long, default_value = "8")]
    capacity: u32,

    /// Number of simulation ticks to run in headless mode
    #[arg(long, default_value = "60")]
    ticks: u32,

    /// Number of random requests to inject over the run
    #[arg(long, default_value = "12")]
    requests: u32,

    /// Dispatch strategy
    #[arg(long, value_enum, default_value = "look")]
    strategy: StrategyArg,

    /// RNG seed for reproducible traffic
    #[arg(long)]
    seed: Option<u64>,

    /// Run the background ticker with concurrent request producers instead
    /// of stepping manually
    #[arg(long)]
    live: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Look,
    Nearest,
    Fcfs,
    Zoned,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    anyhow::ensure!(cli.top_floor >= 1, "top floor must be at least 1");

    let metrics = Arc::new(MetricsObserver::new());
    let controller = FleetBuilder::new()
        .with_floors(0, cli.top_floor)
        .with_cars(cli.cars, cli.capacity)
        .with_strategy(build_strategy(&cli))
        .with_tick_interval(Duration::from_millis(50))
        .with_observer(Arc::new(LoggingObserver))
        .with_observer(metrics.clone())
        .build()?;

    if cli.live {
        run_live(&cli, &controller)?;
    } else {
        run_headless(&cli, &controller)?;
    }

    println!("=== Final state ===");
    print_summary(&controller);
    println!(
        "Requests completed: {} (average wait {:.2}s, {} floor visits)",
        metrics.requests_completed(),
        metrics.average_wait().as_secs_f64(),
        metrics.floor_visits()
    );
    Ok(())
}

fn build_strategy(cli: &Cli) -> Box<dyn DispatchStrategy> {
    match cli.strategy {
        StrategyArg::Look => Box::new(LookDispatch::new()),
        StrategyArg::Nearest => Box::new(NearestDispatch::new()),
        StrategyArg::Fcfs => Box::new(FcfsDispatch::new()),
        StrategyArg::Zoned => {
            // Split the floor range into one contiguous zone per car.
            let mut zoned = ZonedDispatch::new();
            let span = ((cli.top_floor + 1) / cli.cars.max(1) as i32).max(1);
            for id in 0..cli.cars {
                let min = id as i32 * span;
                let max = if id == cli.cars - 1 {
                    cli.top_floor
                } else {
                    (id as i32 + 1) * span - 1
                };
                zoned.set_zone(id, min, max);
            }
            Box::new(zoned)
        }
    }
}

/// Step the fleet manually, injecting random traffic as it runs.
fn run_headless(cli: &Cli, controller: &Arc<FleetController>) -> Result<()> {
    println!(
        "Running elevator simulation: {} cars, floors 0-{}, {} ticks",
        cli.cars, cli.top_floor, cli.ticks
    );

    let mut rng = seeded_rng(cli.seed);
    let mut submitted = 0;

    for tick in 0..cli.ticks {
        if submitted < cli.requests && tick % 2 == 0 {
            let (pickup, destination) = random_trip(&mut rng, cli.top_floor);
            let passengers = rng.random_range(1..=3);
            controller.request_elevator(pickup, destination, passengers)?;
            submitted += 1;
        }

        controller.step();

        if (tick + 1) % 10 == 0 {
            println!("--- after tick {} ---", tick + 1);
            print_summary(controller);
            thread::sleep(Duration::from_millis(100));
        }
    }

    Ok(())
}

/// Exercise the background ticker with concurrent request producers.
fn run_live(cli: &Cli, controller: &Arc<FleetController>) -> Result<()> {
    println!(
        "Running live: {} cars, floors 0-{}, background ticker",
        cli.cars, cli.top_floor
    );

    controller.start();

    let mut producers = Vec::new();
    for worker in 0..2u64 {
        let controller = Arc::clone(controller);
        let top_floor = cli.top_floor;
        let count = (cli.requests / 2).max(1);
        let seed = cli.seed.map(|seed| seed + worker);

        producers.push(thread::spawn(move || {
            let mut rng = seeded_rng(seed);
            for _ in 0..count {
                let (pickup, destination) = random_trip(&mut rng, top_floor);
                let passengers = rng.random_range(1..=3);
                if let Err(error) = controller.request_elevator(pickup, destination, passengers) {
                    warn!("request rejected: {error}");
                }
                thread::sleep(Duration::from_millis(20));
            }
        }));
    }

    for producer in producers {
        let _ = producer.join();
    }

    // Let the fleet work the queue down before stopping.
    thread::sleep(Duration::from_millis(u64::from(cli.ticks) * 50));
    controller.stop();

    Ok(())
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn random_trip(rng: &mut StdRng, top_floor: i32) -> (i32, i32) {
    let pickup = rng.random_range(0..=top_floor);
    let mut destination = rng.random_range(0..=top_floor);
    while destination == pickup {
        destination = rng.random_range(0..=top_floor);
    }
    (pickup, destination)
}

fn print_summary(controller: &FleetController) {
    let status = controller.status();
    println!(
        "pending: {}, idle cars: {}/{}, load: {}/{}",
        status.pending_requests,
        status.idle_cars,
        status.total_cars,
        status.total_load,
        status.total_capacity
    );
    for car in &status.cars {
        println!(
            "  car {}: floor {:2}, {:?}, load {}/{}, {} pending stop(s)",
            car.id, car.floor, car.direction, car.load, car.capacity, car.pending_stops
        );
    }
}
