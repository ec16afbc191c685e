use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub status_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            status_log_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

/// Anything advanced by the fixed-step loop. All simulation state is touched from the
/// loop thread only.
pub trait Simulation {
    fn tick(&mut self, fixed_dt: Duration) -> LoopControl;

    fn status_line(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub dropped_backlog: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

/// Runs `simulation` at `config.target_tps` until it asks to quit. Frame time is clamped
/// and at most `max_ticks_per_frame` ticks run per wake-up; backlog beyond that is dropped.
pub fn run_headless(config: &LoopConfig, simulation: &mut dyn Simulation) -> LoopSummary {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let status_log_interval =
        normalize_non_zero_duration(config.status_log_interval, Duration::from_secs(5));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        "loop_config"
    );

    let mut summary = LoopSummary {
        ticks: 0,
        dropped_backlog: Duration::ZERO,
    };
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_status_instant = last_frame_instant;

    loop {
        let now = Instant::now();
        let frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;
        accumulator = accumulator.saturating_add(frame_dt.min(max_frame_delta));

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            summary.ticks = summary.ticks.saturating_add(1);
            if simulation.tick(fixed_dt) == LoopControl::Quit {
                info!(ticks = summary.ticks, "loop_quit_requested");
                return summary;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            summary.dropped_backlog = summary
                .dropped_backlog
                .saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if now.saturating_duration_since(last_status_instant) >= status_log_interval {
            last_status_instant = now;
            if let Some(status) = simulation.status_line() {
                info!(ticks = summary.ticks, status = %status, "loop_status");
            }
        }

        let until_next_tick = fixed_dt.saturating_sub(accumulator);
        if until_next_tick > Duration::ZERO {
            thread::sleep(until_next_tick);
        }
    }
}

pub fn plan_sim_steps(accumulator: Duration, fixed_dt: Duration, max_ticks: u32) -> StepPlan {
    if fixed_dt.is_zero() {
        return StepPlan {
            ticks_to_run: 0,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        };
    }

    let available_ticks = accumulator.as_nanos() / fixed_dt.as_nanos();
    let ticks_to_run = available_ticks.min(max_ticks as u128) as u32;
    let consumed = fixed_dt.saturating_mul(ticks_to_run);
    let remaining = accumulator.saturating_sub(consumed);

    if available_ticks > max_ticks as u128 {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: remaining,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: remaining,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
