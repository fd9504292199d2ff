//! Micro-worldtest harness for deterministic, tick-based tests.
//!
//! A micro-worldtest steps a tiny simulation for a fixed number of ticks and
//! records selected state after every tick. The recorded frames are returned
//! so tests can assert on them directly, and are optionally compared against a
//! golden JSON file on disk.

use crate::snapshot::assert_json_snapshot;
use anyhow::Result;
use hopperline_core::SimTick;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration for a micro-worldtest.
#[derive(Debug, Clone)]
pub struct MicroWorldtestConfig {
    /// Human-readable name (written into the report).
    pub name: String,
    /// Number of ticks to step (report includes the initial frame at tick 0).
    pub ticks: u64,
    /// Golden JSON file to compare the report against, if any.
    pub snapshot_path: Option<PathBuf>,
}

/// Single snapshot frame captured at a given tick.
#[derive(Debug, Clone, Serialize)]
pub struct MicroWorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Snapshot payload.
    pub snapshot: S,
}

/// Everything a micro-worldtest recorded.
#[derive(Debug, Clone, Serialize)]
pub struct MicroWorldtestReport<S> {
    /// Name from the config.
    pub name: String,
    /// One frame per tick, starting with tick 0.
    pub frames: Vec<MicroWorldtestFrame<S>>,
}

impl<S> MicroWorldtestReport<S> {
    /// Snapshot payloads in tick order.
    pub fn snapshots(&self) -> impl Iterator<Item = &S> + '_ {
        self.frames.iter().map(|frame| &frame.snapshot)
    }
}

/// Run a micro-worldtest.
///
/// Captures the initial snapshot at tick 0, then for each of `config.ticks`
/// steps advances the tick and calls `step` with it, capturing a snapshot
/// afterwards (so the report contains `ticks + 1` frames). When
/// `config.snapshot_path` is set the report must match that golden file.
pub fn run_micro_worldtest<State, Snapshot, StepFn, SnapFn>(
    config: MicroWorldtestConfig,
    mut state: State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Result<MicroWorldtestReport<Snapshot>>
where
    Snapshot: Serialize,
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(config.ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(MicroWorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, &state),
    });

    for _ in 0..config.ticks {
        tick = tick.advance(1);
        step(tick, &mut state);
        frames.push(MicroWorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, &state),
        });
    }

    let report = MicroWorldtestReport {
        name: config.name,
        frames,
    };
    if let Some(path) = config.snapshot_path {
        assert_json_snapshot(path, &report)?;
    }
    Ok(report)
}
