/*!
 * Shared test harness
 * A configurable scripted process, a recording log, a resettable kernel and a
 * tracing layer that records emitted events
 */

#![allow(dead_code)]

use anyhow::Context as _;
use cycle_kernel::{
    AdmitOptions, Continuation, Kernel, ManualClock, MemoryStore, Pid, Priority, Process,
    ProcessContext, ProcessRegistry, ProcessSeed, RestoreSummary, RunOutcome, SchedulerReport,
    Step,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub type Log = Rc<RefCell<Vec<String>>>;

/// What a scripted process does when it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behaviour {
    Done,
    Sleep(u64),
    Steps(u32),
    Fail,
    Panic,
    Terminate,
    Reprioritize(Priority),
    Spawn(Priority),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptState {
    pub label: String,
    pub cost: f64,
    pub behaviour: Behaviour,
    pub runs: u64,
}

pub struct Scripted {
    state: ScriptState,
    clock: Arc<ManualClock>,
    log: Log,
}

impl Process for Scripted {
    fn type_name(&self) -> &str {
        "scripted"
    }

    fn run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<RunOutcome> {
        self.state.runs += 1;
        let label = self.state.label.clone();

        if let Behaviour::Steps(total) = self.state.behaviour {
            return Ok(RunOutcome::yielded(Stepper {
                label,
                cost: self.state.cost,
                step: 0,
                total,
                clock: self.clock.clone(),
                log: self.log.clone(),
            }));
        }

        self.clock.consume(self.state.cost);
        self.log.borrow_mut().push(label.clone());

        match self.state.behaviour {
            Behaviour::Done | Behaviour::Steps(_) => {}
            Behaviour::Sleep(cycles) => ctx.sleep(cycles),
            Behaviour::Fail => {
                return Err(anyhow::anyhow!("script failed")).context(format!("running {}", label))
            }
            Behaviour::Panic => panic!("script {} panicked", label),
            Behaviour::Terminate => ctx.terminate(),
            Behaviour::Reprioritize(priority) => ctx.set_priority(priority),
            Behaviour::Spawn(priority) => {
                let key = format!("{}-child", label);
                if ctx.find_by_stable_key(&key).is_none() {
                    let child = Scripted {
                        state: ScriptState {
                            label: key.clone(),
                            cost: 0.0,
                            behaviour: Behaviour::Done,
                            runs: 0,
                        },
                        clock: self.clock.clone(),
                        log: self.log.clone(),
                    };
                    ctx.spawn(
                        Box::new(child),
                        AdmitOptions::new(priority).with_stable_key(key.as_str()),
                    )?;
                }
            }
        }
        Ok(RunOutcome::Done)
    }

    fn serialize(&self) -> Value {
        serde_json::to_value(&self.state).unwrap_or(Value::Null)
    }

    fn restore(&mut self, payload: Value) -> anyhow::Result<()> {
        self.state = serde_json::from_value(payload).context("decoding script payload")?;
        Ok(())
    }
}

struct Stepper {
    label: String,
    cost: f64,
    step: u32,
    total: u32,
    clock: Arc<ManualClock>,
    log: Log,
}

impl Continuation for Stepper {
    fn resume(&mut self, _ctx: &mut ProcessContext<'_>) -> anyhow::Result<Step> {
        self.step += 1;
        self.clock.consume(self.cost);
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.label, self.step));
        Ok(if self.step >= self.total {
            Step::Done
        } else {
            Step::Yield
        })
    }
}

pub struct Harness {
    pub kernel: Kernel,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub log: Log,
}

impl Harness {
    /// Per-cycle ceiling 100, sustained 20, reserve 10000 (Normal mode)
    pub fn new() -> Self {
        Self::with_clock(ManualClock::new(100.0, 20.0))
    }

    pub fn with_reserve(reserve: f64) -> Self {
        Self::with_clock(ManualClock::new(100.0, 20.0).with_reserve(reserve))
    }

    pub fn with_clock(clock: ManualClock) -> Self {
        let clock = Arc::new(clock);
        let store = Arc::new(MemoryStore::new());
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let kernel = build(&clock, &store, &log);
        Self {
            kernel,
            clock,
            store,
            log,
        }
    }

    pub fn scripted(&self, label: &str, cost: f64, behaviour: Behaviour) -> Box<dyn Process> {
        Box::new(Scripted {
            state: ScriptState {
                label: label.to_string(),
                cost,
                behaviour,
                runs: 0,
            },
            clock: self.clock.clone(),
            log: self.log.clone(),
        })
    }

    pub fn admit(&mut self, label: &str, priority: Priority, behaviour: Behaviour) -> Pid {
        let scripted = self.scripted(label, 0.0, behaviour);
        self.kernel
            .admit(scripted, AdmitOptions::new(priority))
            .expect("pid space available")
    }

    pub fn admit_costly(&mut self, label: &str, priority: Priority, cost: f64) -> Pid {
        let scripted = self.scripted(label, cost, Behaviour::Done);
        self.kernel
            .admit(scripted, AdmitOptions::new(priority))
            .expect("pid space available")
    }

    /// Run one cycle, then advance the clock; returns that cycle's report
    pub fn tick(&mut self) -> SchedulerReport {
        let report = self.kernel.run_cycle().clone();
        self.clock.advance();
        report
    }

    /// Labels recorded since the last call
    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Serialize, drop the kernel, rebuild it over the same store and restore
    pub fn reset(&mut self) -> RestoreSummary {
        self.kernel.serialize().unwrap();
        self.kernel = build(&self.clock, &self.store, &self.log);
        self.kernel.restore().unwrap()
    }

    pub fn blob(&self) -> Vec<u8> {
        use cycle_kernel::SnapshotStore;
        self.store.load("kernel").unwrap().expect("snapshot written")
    }
}

pub fn scripted_registry(clock: &Arc<ManualClock>, log: &Log) -> ProcessRegistry {
    let clock = clock.clone();
    let log = log.clone();
    ProcessRegistry::new().with("scripted", move |seed: ProcessSeed| {
        let mut scripted = Scripted {
            state: ScriptState {
                label: String::new(),
                cost: 0.0,
                behaviour: Behaviour::Done,
                runs: 0,
            },
            clock: clock.clone(),
            log: log.clone(),
        };
        scripted.restore(seed.payload)?;
        Ok(Box::new(scripted) as Box<dyn Process>)
    })
}

fn build(clock: &Arc<ManualClock>, store: &Arc<MemoryStore>, log: &Log) -> Kernel {
    Kernel::builder()
        .with_clock(clock.clone())
        .with_store(store.clone())
        .with_registry(scripted_registry(clock, log))
        .build()
        .unwrap()
}

/// Layer that keeps every event's level and message for later assertions
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl EventRecorder {
    /// Number of events at `level` whose message starts with `prefix`
    pub fn count(&self, level: Level, prefix: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(l, message)| *l == level && message.starts_with(prefix))
            .count()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for EventRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events
            .lock()
            .push((*event.metadata().level(), visitor.0));
    }
}
