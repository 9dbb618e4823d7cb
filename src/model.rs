use crate::vitals::VitalKind;
use std::collections::BTreeMap;

pub(crate) const WARNING_THRESHOLD: f32 = 65.0;
pub(crate) const CRITICAL_THRESHOLD: f32 = 25.0;
pub(crate) const OPTIMAL_CEILING: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct VitalTuning {
    pub(crate) increase_by: f32,
    pub(crate) cooldown_ms: u64,
    pub(crate) decay_per_tick: f32,
    pub(crate) tick_interval_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Thresholds {
    pub(crate) warning: f32,
    pub(crate) critical: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: WARNING_THRESHOLD,
            critical: CRITICAL_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SelectorTimings {
    pub(crate) isolate_ms: u64,    // chosen card centered, siblings faded
    pub(crate) slide_out_ms: u64,  // card drifts up before narration
    pub(crate) line_hold_ms: u64,
    pub(crate) line_gap_ms: u64,
    pub(crate) final_delay_ms: u64,
}

impl Default for SelectorTimings {
    fn default() -> Self {
        Self {
            isolate_ms: 2000,
            slide_out_ms: 500,
            line_hold_ms: 5000,
            line_gap_ms: 500,
            final_delay_ms: 2500,
        }
    }
}

impl SelectorTimings {
    /// Time from the adopt key press until the selector reports completion.
    pub(crate) fn total_ms(&self, intro_lines: usize) -> u64 {
        self.isolate_ms
            + self.slide_out_ms
            + intro_lines as u64 * (self.line_hold_ms + self.line_gap_ms)
            + self.final_delay_ms
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnerConfig {
    pub(crate) probability_per_tick: f32,
    pub(crate) edge_margin: f32,
    pub(crate) deviation_fraction: f32,
    pub(crate) secs_per_px_min: f32,
    pub(crate) secs_per_px_max: f32,
    pub(crate) min_duration_secs: f32,
    pub(crate) dismiss_fade_ms: u64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            probability_per_tick: 0.05,
            edge_margin: 8.0,
            deviation_fraction: 0.3,
            secs_per_px_min: 0.03,
            secs_per_px_max: 0.07,
            min_duration_secs: 3.0,
            dismiss_fade_ms: 200,
        }
    }
}

/// Engine tuning. Owned by each engine instance; nothing here is global.
#[derive(Clone, Debug)]
pub(crate) struct Rules {
    pub(crate) thresholds: Thresholds,
    pub(crate) supervise_interval_ms: u64,
    pub(crate) game_over_grace_ms: u64,
    pub(crate) fade_ms: u64,
    pub(crate) log_capacity: usize,
    pub(crate) tuning: BTreeMap<VitalKind, VitalTuning>,
    pub(crate) selector: SelectorTimings,
    pub(crate) spawner: SpawnerConfig,
}

impl Default for Rules {
    fn default() -> Self {
        let mut tuning = BTreeMap::new();
        tuning.insert(
            VitalKind::Stability,
            VitalTuning {
                increase_by: 10.0,
                cooldown_ms: 10_000,
                decay_per_tick: 1.0,
                tick_interval_ms: 3000,
            },
        );
        tuning.insert(
            VitalKind::Energy,
            VitalTuning {
                increase_by: 15.0,
                cooldown_ms: 5_000,
                decay_per_tick: 1.0,
                tick_interval_ms: 1500,
            },
        );
        tuning.insert(
            VitalKind::Strength,
            VitalTuning {
                increase_by: 12.0,
                cooldown_ms: 8_000,
                decay_per_tick: 1.0,
                tick_interval_ms: 2000,
            },
        );

        Self {
            thresholds: Thresholds::default(),
            supervise_interval_ms: 1000,
            game_over_grace_ms: 5000,
            fade_ms: 3000,
            log_capacity: 64,
            tuning,
            selector: SelectorTimings::default(),
            spawner: SpawnerConfig::default(),
        }
    }
}

impl Rules {
    pub(crate) fn tuning_for(&self, kind: VitalKind) -> VitalTuning {
        self.tuning.get(&kind).copied().unwrap_or(VitalTuning {
            increase_by: 10.0,
            cooldown_ms: 10_000,
            decay_per_tick: 1.0,
            tick_interval_ms: 2000,
        })
    }
}
