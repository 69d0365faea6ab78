/*!
 * Cycle Kernel - Host Simulator
 *
 * Drives the kernel the way a tick-based host would:
 * - one `run_cycle` per simulated tick over a manual clock
 * - a reserve that drifts with the compute actually used
 * - a periodic global reset: serialize, drop every in-memory object, rebuild
 *   and restore from the file store
 *
 * Environment variables:
 * - KERNEL_CYCLES: ticks to simulate (default: 60)
 * - KERNEL_RESET_EVERY: ticks between simulated resets, 0 disables (default: 20)
 * - KERNEL_STORAGE_PATH: snapshot directory (default: <tmp>/cycle-kernel)
 * - KERNEL_CONFIG: optional JSON config file
 */

use cycle_kernel::{
    emit_report, init_tracing, AdmitOptions, ClockProvider, Continuation, FileStore, Kernel,
    KernelConfig, KernelResult, ManualClock, Process, ProcessContext, ProcessRegistry,
    ProcessSeed, RunOutcome, Step,
};
use serde_json::{json, Value};
use std::cell::Cell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

const CYCLE_CEILING: f64 = 60.0;
const SUSTAINED_CEILING: f64 = 5.0;
const RESERVE_CAP: f64 = 10_000.0;
const STARTING_RESERVE: f64 = 1_040.0;

/// Priority 0 liveness process; runs even in emergency mode
struct Heartbeat {
    clock: Arc<ManualClock>,
    beats: u64,
}

impl Process for Heartbeat {
    fn type_name(&self) -> &str {
        "heartbeat"
    }

    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<RunOutcome> {
        self.clock.consume(0.5);
        self.beats += 1;
        if self.beats % 10 == 0 {
            info!(pid = ctx.pid(), beats = self.beats, "Heartbeat");
        }
        Ok(RunOutcome::Done)
    }

    fn serialize(&self) -> Value {
        json!({ "beats": self.beats })
    }

    fn restore(&mut self, payload: Value) -> anyhow::Result<()> {
        self.beats = payload["beats"].as_u64().unwrap_or_default();
        Ok(())
    }
}

/// Keeps one surveyor alive under it
struct Colony {
    clock: Arc<ManualClock>,
}

impl Process for Colony {
    fn type_name(&self) -> &str {
        "colony"
    }

    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<RunOutcome> {
        self.clock.consume(1.0);
        if ctx.find_all_by_type("surveyor").is_empty() {
            let surveyor = Surveyor::new(self.clock.clone(), 0);
            let pid = ctx.spawn(Box::new(surveyor), AdmitOptions::new(2))?;
            info!(colony = ctx.pid(), surveyor = pid, "Surveyor spawned");
        }
        Ok(RunOutcome::Done)
    }
}

/// Surveys a run of rooms over several cycles, then rests
struct Surveyor {
    clock: Arc<ManualClock>,
    completed: Rc<Cell<u64>>,
}

impl Surveyor {
    const ROOMS: u32 = 4;
    const REST_CYCLES: u64 = 3;

    fn new(clock: Arc<ManualClock>, completed: u64) -> Self {
        Self {
            clock,
            completed: Rc::new(Cell::new(completed)),
        }
    }
}

impl Process for Surveyor {
    fn type_name(&self) -> &str {
        "surveyor"
    }

    fn run(&mut self, _ctx: &mut ProcessContext<'_>) -> anyhow::Result<RunOutcome> {
        Ok(RunOutcome::yielded(Survey {
            clock: self.clock.clone(),
            completed: self.completed.clone(),
            rooms_left: Self::ROOMS,
        }))
    }

    fn serialize(&self) -> Value {
        json!({ "completed": self.completed.get() })
    }
}

struct Survey {
    clock: Arc<ManualClock>,
    completed: Rc<Cell<u64>>,
    rooms_left: u32,
}

impl Continuation for Survey {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<Step> {
        self.clock.consume(2.0);
        self.rooms_left = self.rooms_left.saturating_sub(1);
        if self.rooms_left > 0 {
            return Ok(Step::Yield);
        }

        self.completed.set(self.completed.get() + 1);
        info!(
            pid = ctx.pid(),
            completed = self.completed.get(),
            "Survey complete"
        );
        ctx.sleep(Surveyor::REST_CYCLES);
        Ok(Step::Done)
    }
}

fn registry(clock: &Arc<ManualClock>) -> ProcessRegistry {
    let heartbeat_clock = clock.clone();
    let colony_clock = clock.clone();
    let surveyor_clock = clock.clone();

    ProcessRegistry::new()
        .with("heartbeat", move |seed: ProcessSeed| {
            let mut heartbeat = Heartbeat {
                clock: heartbeat_clock.clone(),
                beats: 0,
            };
            heartbeat.restore(seed.payload)?;
            Ok(Box::new(heartbeat) as Box<dyn Process>)
        })
        .with("colony", move |_seed: ProcessSeed| {
            Ok(Box::new(Colony {
                clock: colony_clock.clone(),
            }) as Box<dyn Process>)
        })
        .with("surveyor", move |seed: ProcessSeed| {
            let completed = seed.payload["completed"].as_u64().unwrap_or_default();
            Ok(Box::new(Surveyor::new(surveyor_clock.clone(), completed)) as Box<dyn Process>)
        })
}

fn build_kernel(
    clock: &Arc<ManualClock>,
    store: &Arc<FileStore>,
    config: &KernelConfig,
) -> KernelResult<Kernel> {
    Kernel::builder()
        .with_clock(clock.clone())
        .with_store(store.clone())
        .with_registry(registry(clock))
        .with_config(config.clone())
        .build()
}

fn env_u64(name: &str, default: u64) -> Result<u64, Box<dyn Error>> {
    match std::env::var(name) {
        Ok(value) => Ok(value
            .parse::<u64>()
            .map_err(|e| format!("{} must be an integer: {}", name, e))?),
        Err(_) => Ok(default),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let cycles = env_u64("KERNEL_CYCLES", 60)?;
    let reset_every = env_u64("KERNEL_RESET_EVERY", 20)?;
    let storage_path = std::env::var("KERNEL_STORAGE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("cycle-kernel"));
    let config = match std::env::var("KERNEL_CONFIG") {
        Ok(path) => KernelConfig::from_file(path)?,
        Err(_) => KernelConfig::default(),
    };

    info!(
        cycles,
        reset_every,
        storage = %storage_path.display(),
        "Cycle kernel simulator starting"
    );

    let clock = Arc::new(
        ManualClock::new(CYCLE_CEILING, SUSTAINED_CEILING).with_reserve(STARTING_RESERVE),
    );
    let store = Arc::new(FileStore::open(&storage_path)?);

    let mut kernel = build_kernel(&clock, &store, &config)?;
    let summary = kernel.restore()?;
    info!(
        restored = summary.restored,
        dropped = summary.dropped,
        "Previous snapshot loaded"
    );

    // Stable keys make these no-ops when the snapshot already had them
    kernel.admit(
        Box::new(Heartbeat {
            clock: clock.clone(),
            beats: 0,
        }),
        AdmitOptions::new(0).with_stable_key("heartbeat"),
    )?;
    kernel.admit(
        Box::new(Colony {
            clock: clock.clone(),
        }),
        AdmitOptions::new(1).with_stable_key("colony"),
    )?;

    for tick in 1..=cycles {
        let report = kernel.run_cycle();
        emit_report(report);

        let drift = SUSTAINED_CEILING - clock.used();
        clock.set_reserve((clock.reserve() + drift * 10.0).clamp(0.0, RESERVE_CAP));

        if reset_every > 0 && tick % reset_every == 0 {
            info!(tick, "Simulating global reset");
            kernel.serialize()?;
            drop(kernel);

            kernel = build_kernel(&clock, &store, &config)?;
            let summary = kernel.restore()?;
            info!(
                restored = summary.restored,
                dropped = summary.dropped,
                "Kernel rebuilt from snapshot"
            );
        }

        clock.advance();
    }

    kernel.serialize()?;
    info!(
        processes = kernel.len(),
        reserve = clock.reserve(),
        "Simulation finished"
    );
    Ok(())
}
