//! Headless runner for the fishtank simulation.
//!
//! Drives an [`Aquarium`] from two independently stoppable interval workers:
//! a frame loop stepping the movement engine, and a slower sweep timer
//! running food expiry. Both are torn down deterministically when their
//! drivers drop.

use anyhow::{Context, Result, bail};
use clap::Parser;
use fishtank_core::{Aquarium, AquariumConfig, FishDescriptor, FishId, RarityTier};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cadence of the food expiry sweep.
const SWEEP_PERIOD: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "fishtank", about = "Headless aquarium simulation runner")]
struct Args {
    /// RNG seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of fish in the roster.
    #[arg(long, default_value_t = 8)]
    fish: usize,
    /// Wall-clock seconds to run before shutting down.
    #[arg(long, default_value_t = 20.0)]
    duration: f32,
    /// Frame rate of the simulation loop.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Seconds between automatic food drops.
    #[arg(long, default_value_t = 2.5)]
    food_interval: f32,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    if args.fps == 0 {
        bail!("fps must be at least 1");
    }
    if args.duration <= 0.0 {
        bail!("duration must be positive");
    }

    let config = AquariumConfig {
        rng_seed: args.seed,
        ..AquariumConfig::default()
    };
    let mut rng = SmallRng::seed_from_u64(args.seed.unwrap_or_else(rand::random));
    let roster = random_roster(args.fish, &mut rng);
    let aquarium = Arc::new(Mutex::new(
        Aquarium::new(config).context("invalid aquarium configuration")?,
    ));

    info!(
        fish = roster.len(),
        fps = args.fps,
        duration = args.duration,
        "starting fishtank simulation"
    );

    let frame_driver = spawn_frame_loop(
        Arc::clone(&aquarium),
        roster,
        rng,
        args.fps,
        args.food_interval.max(0.1),
    )?;
    let sweep_driver = spawn_sweep_loop(Arc::clone(&aquarium))?;

    thread::sleep(Duration::from_secs_f32(args.duration));

    // Dropping the drivers stops both timers before the aquarium is read.
    drop(frame_driver);
    drop(sweep_driver);

    let aquarium = aquarium.lock().expect("aquarium lock");
    if let Some(summary) = aquarium.history().last() {
        info!(
            frame = summary.frame,
            fish = summary.fish_count,
            food = summary.food_count,
            avg_energy = summary.average_energy,
            "final summary"
        );
    }
    info!(
        frames = aquarium.frame(),
        food_left = aquarium.food().len(),
        "simulation stopped"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn random_roster(count: usize, rng: &mut SmallRng) -> Vec<FishDescriptor> {
    (0..count)
        .map(|index| FishDescriptor {
            id: FishId(index as u64 + 1),
            x: rng.random_range(10.0..90.0),
            y: rng.random_range(10.0..90.0),
            tier: random_tier(rng),
        })
        .collect()
}

fn random_tier(rng: &mut SmallRng) -> RarityTier {
    match rng.random_range(0..100u32) {
        0..=59 => RarityTier::Common,
        60..=79 => RarityTier::Uncommon,
        80..=91 => RarityTier::Rare,
        92..=97 => RarityTier::Epic,
        _ => RarityTier::Legendary,
    }
}

fn spawn_frame_loop(
    aquarium: Arc<Mutex<Aquarium>>,
    roster: Vec<FishDescriptor>,
    mut rng: SmallRng,
    fps: u32,
    food_interval: f32,
) -> Result<IntervalDriver> {
    let period = Duration::from_secs_f64(1.0 / f64::from(fps));
    let mut last = Instant::now();
    let mut since_drop = 0.0f32;
    IntervalDriver::spawn("frames", period, move || {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let Ok(mut aquarium) = aquarium.lock() else {
            return;
        };
        since_drop += dt;
        if since_drop >= food_interval {
            since_drop = 0.0;
            let config = aquarium.config();
            let x = rng.random_range(0.0..config.tank_width);
            let y = rng.random_range(0.0..config.tank_height);
            if aquarium.spawn_food(x, y) {
                debug!(x, y, "dropped food");
            }
        }
        aquarium.animate_food(dt);
        let output = aquarium.step(&roster, dt);
        for &(fish, food) in &output.events.consumed {
            info!(fish = fish.0, food = food.0, "fish ate a pellet");
        }
    })
}

fn spawn_sweep_loop(aquarium: Arc<Mutex<Aquarium>>) -> Result<IntervalDriver> {
    IntervalDriver::spawn("sweep", SWEEP_PERIOD, move || {
        if let Ok(mut aquarium) = aquarium.lock() {
            aquarium.sweep_expired();
        }
    })
}

enum DriverCommand {
    Shutdown,
}

/// Named worker thread running a callback on a fixed period until dropped.
struct IntervalDriver {
    tx: mpsc::Sender<DriverCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl IntervalDriver {
    fn spawn(
        name: &str,
        period: Duration,
        mut tick: impl FnMut() + Send + 'static,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<DriverCommand>();
        let handle = thread::Builder::new()
            .name(format!("fishtank-{name}"))
            .spawn(move || {
                loop {
                    match rx.recv_timeout(period) {
                        Err(mpsc::RecvTimeoutError::Timeout) => tick(),
                        Ok(DriverCommand::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            break;
                        }
                    }
                }
            })
            .with_context(|| format!("failed to spawn {name} worker thread"))?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }
}

impl Drop for IntervalDriver {
    fn drop(&mut self) {
        let _ = self.tx.send(DriverCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            eprintln!("fishtank worker thread panicked");
        }
    }
}
