//! Flotilla realtime: a paced run watched from a reader thread.
//!
//! Demonstrates:
//!   1. Loading a `SimConfig` from TOML (or using the defaults)
//!   2. Starting a paced run on the `flotilla-tick` thread
//!   3. Polling snapshots from a separate reader thread
//!   4. Pausing, single-stepping and resuming
//!   5. Stopping, with the final snapshot still available
//!
//! Run with:
//!   RUST_LOG=info cargo run --example realtime [config.toml]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flotilla_engine::{SimConfig, Simulation};

// ─── Run parameters ─────────────────────────────────────────────

/// Simulated seconds per wall second.
const TIME_SCALE: f64 = 4.0;
const WATCH: Duration = Duration::from_secs(2);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ─── Configuration ──────────────────────────────────────────

    let mut config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path)?,
        None => SimConfig::default(),
    };
    config.time_scale = Some(TIME_SCALE);
    println!(
        "{} floaters on a {} m loop, dt = {} s, {}x real time",
        config.physics.n_floaters, config.physics.loop_length, config.dt, TIME_SCALE
    );

    // ─── Reader thread ──────────────────────────────────────────

    let mut sim = Simulation::new();
    let store = sim.store();
    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last_seen = None;
            while !done.load(Ordering::Acquire) {
                if let Some(snap) = store.latest() {
                    if last_seen != Some(snap.sequence) && snap.step.0 % 10 == 0 {
                        let [asc, desc, fill, vent] = snap.phase_counts();
                        println!(
                            "  t={:>6.2}s  torque={:>8.2} N·m  power={:>8.2} W  \
                             [asc {asc} desc {desc} fill {fill} vent {vent}]",
                            snap.time, snap.net_torque, snap.net_power
                        );
                    }
                    last_seen = Some(snap.sequence);
                }
                thread::sleep(Duration::from_millis(20));
            }
        })
    };

    // ─── Lifecycle ──────────────────────────────────────────────

    sim.start(config)?;
    thread::sleep(WATCH);

    sim.pause()?;
    println!("paused; stepping by hand");
    for _ in 0..3 {
        let snap = sim.step()?;
        println!("  manual step {} at t={:.2}s", snap.step, snap.time);
    }

    sim.resume()?;
    thread::sleep(WATCH);
    sim.stop()?;

    done.store(true, Ordering::Release);
    let _ = reader.join();

    // ─── Final state ────────────────────────────────────────────

    if let Some(last) = sim.latest() {
        println!(
            "stopped at step {} (t={:.2}s); {} snapshots retained",
            last.step,
            last.time,
            sim.history().len()
        );
        for f in &last.floaters {
            println!(
                "  floater {}: s={:.3} m  v={:+.3} m/s  {}",
                f.id, f.position, f.velocity, f.state
            );
        }
    }
    let stats = sim.stats();
    println!(
        "{} steps, mean {:?} per step, {} overruns",
        stats.steps,
        stats.mean_step(),
        stats.overruns
    );
    Ok(())
}
