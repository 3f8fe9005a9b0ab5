//! The background tick loop.
//!
//! [`run_simulation`] repeats [`run_tick`] at a fixed cadence until it is
//! told to stop, handing every summary to a [`TickCallback`]. A stop
//! signal abandons the tick in flight only while it is still planning;
//! once resolution holds the lock the tick runs to completion, so the
//! town is never left half-updated.
//!
//! Every tick holds the `gate` mutex from perception until its snapshot
//! has been handed to the callback, so a manual step can never interleave
//! with a loop tick.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::time::Duration;

use tokio::sync::{Mutex, Notify, RwLock, broadcast};
use town_types::WorldState;
use tracing::{debug, info};

use crate::decision::DecisionEngine;
use crate::tick::{TickSettings, TickSummary, run_tick};
use crate::town::Town;

/// Result of one run of the loop.
#[derive(Debug)]
pub struct SimulationResult {
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks completed during this run.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called with the summary of every completed tick.
    fn on_tick(&mut self, summary: &TickSummary);
}

/// A callback that ignores every tick.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary) {}
}

/// Publishes every snapshot on a broadcast channel.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<WorldState>,
}

impl Broadcaster {
    /// Publish on `sender`.
    pub const fn new(sender: broadcast::Sender<WorldState>) -> Self {
        Self { sender }
    }
}

impl TickCallback for Broadcaster {
    fn on_tick(&mut self, summary: &TickSummary) {
        // No subscribers is not an error.
        if self.sender.send(summary.snapshot.clone()).is_err() {
            debug!(tick = summary.tick, "No observers subscribed");
        }
    }
}

/// Run ticks every `interval` until `stop` is notified.
///
/// Each tick runs while holding `gate`.
pub async fn run_simulation(
    town: &RwLock<Town>,
    gate: &Mutex<()>,
    engine: &DecisionEngine,
    settings: &TickSettings,
    interval: Duration,
    stop: &Notify,
    callback: &mut dyn TickCallback,
) -> SimulationResult {
    let mut final_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        tick_interval_ms = interval.as_millis(),
        model = engine.model().name(),
        "Simulation loop starting"
    );

    loop {
        let summary = tokio::select! {
            biased;
            () = stop.notified() => break,
            summary = gated_tick(town, gate, engine, settings, &mut *callback) => summary,
        };

        total_ticks = total_ticks.saturating_add(1);
        final_summary = Some(summary);

        if interval.is_zero() {
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            biased;
            () = stop.notified() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    SimulationResult {
        final_summary,
        total_ticks,
    }
}

async fn gated_tick(
    town: &RwLock<Town>,
    gate: &Mutex<()>,
    engine: &DecisionEngine,
    settings: &TickSettings,
    callback: &mut dyn TickCallback,
) -> TickSummary {
    let _tick = gate.lock().await;
    let summary = run_tick(town, engine, settings, true).await;
    callback.on_tick(&summary);
    summary
}

/// Log how a run ended.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        agents = result.final_summary.as_ref().map(|s| s.agents),
        "Simulation loop stopped"
    );
}
