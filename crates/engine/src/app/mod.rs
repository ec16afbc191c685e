mod atomic_io;
mod loop_runner;
mod prefs;
mod registry;
mod scheduler;
mod transform;

pub use loop_runner::{
    plan_sim_steps, run_headless, LoopConfig, LoopControl, LoopSummary, Simulation, StepPlan,
};
pub use prefs::{FilePrefs, MemoryPrefs, PrefValue, PrefsError, PrefsStore};
pub use registry::{ActorHandle, ActorKind, SingletonRegistry};
pub use scheduler::{SimScheduler, TaskId};
pub use transform::Vec3;
