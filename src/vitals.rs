use crate::catalog::DefaultStats;
use crate::model::{Rules, Thresholds, OPTIMAL_CEILING};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub(crate) enum VitalKind {
    Stability,
    Energy,
    Strength,
}

impl VitalKind {
    pub(crate) const ALL: [VitalKind; 3] =
        [VitalKind::Stability, VitalKind::Energy, VitalKind::Strength];

    pub(crate) fn label(self) -> &'static str {
        match self {
            VitalKind::Stability => "Stability",
            VitalKind::Energy => "Energy",
            VitalKind::Strength => "Strength",
        }
    }

    pub(crate) fn action_label(self) -> &'static str {
        match self {
            VitalKind::Stability => "Stabilize",
            VitalKind::Energy => "Recharge",
            VitalKind::Strength => "Reinforce",
        }
    }

    pub(crate) fn key(self) -> char {
        match self {
            VitalKind::Stability => '1',
            VitalKind::Energy => '2',
            VitalKind::Strength => '3',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Severity {
    Normal,
    Warning,
    Critical,
    Zero,
}

/// Band for a raw value. Identical thresholds for every vital.
pub(crate) fn classify(value: f32, t: &Thresholds) -> Severity {
    if value <= 0.0 {
        Severity::Zero
    } else if value < t.critical {
        Severity::Critical
    } else if value < t.warning {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

/// Edge-triggered memory of which band was already announced.
///
/// The three flags are mutually exclusive; a flag re-arms as soon as the
/// vital is observed outside its band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct NotificationState {
    zero: bool,
    critical: bool,
    warning: bool,
}

impl NotificationState {
    /// Records the band and reports whether this is a fresh entry into a
    /// band that deserves a log line.
    pub(crate) fn observe(&mut self, band: Severity) -> bool {
        let (flag, others) = match band {
            Severity::Normal => {
                *self = Self::default();
                return false;
            }
            Severity::Warning => (&mut self.warning, [Severity::Zero, Severity::Critical]),
            Severity::Critical => (&mut self.critical, [Severity::Zero, Severity::Warning]),
            Severity::Zero => (&mut self.zero, [Severity::Critical, Severity::Warning]),
        };
        let fresh = !*flag;
        *flag = true;
        for other in others {
            self.clear(other);
        }
        fresh
    }

    fn clear(&mut self, band: Severity) {
        match band {
            Severity::Zero => self.zero = false,
            Severity::Critical => self.critical = false,
            Severity::Warning => self.warning = false,
            Severity::Normal => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum IncreaseOutcome {
    Applied { value: f32 },
    AlreadyOptimal,
    CoolingDown { remaining_ms: u64 },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Vital {
    pub(crate) name: String,
    pub(crate) value: f32,
    pub(crate) increase_by: f32,
    pub(crate) cooldown_ms: u64,
    #[serde(default)]
    pub(crate) last_increased_at: Option<u64>,
    pub(crate) decay_per_tick: f32,
    pub(crate) tick_interval_ms: u64,
}

impl Vital {
    pub(crate) fn new(kind: VitalKind, value: f32, rules: &Rules) -> Self {
        let t = rules.tuning_for(kind);
        Self {
            name: kind.label().to_string(),
            value,
            increase_by: t.increase_by,
            cooldown_ms: t.cooldown_ms,
            last_increased_at: None,
            decay_per_tick: t.decay_per_tick,
            tick_interval_ms: t.tick_interval_ms,
        }
    }

    /// Optimal-ceiling check first, so a full vital is refused even while
    /// cooling down. A refused call leaves the record untouched.
    pub(crate) fn increase(&mut self, now_ms: u64) -> IncreaseOutcome {
        if self.value + self.increase_by > OPTIMAL_CEILING {
            return IncreaseOutcome::AlreadyOptimal;
        }
        if let Some(last) = self.last_increased_at {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.cooldown_ms {
                return IncreaseOutcome::CoolingDown {
                    remaining_ms: self.cooldown_ms - elapsed,
                };
            }
        }
        self.value += self.increase_by;
        self.last_increased_at = Some(now_ms);
        IncreaseOutcome::Applied { value: self.value }
    }

    pub(crate) fn decay(&mut self) {
        self.value -= self.decay_per_tick;
    }

    /// Bar fill in 0..=100; the stored value itself is never clamped.
    pub(crate) fn display_percent(&self) -> f32 {
        self.value.clamp(0.0, OPTIMAL_CEILING)
    }
}

/// The `petStats` record, serialized as an object keyed by vital name.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct PetStats {
    stability: Vital,
    energy: Vital,
    strength: Vital,
}

impl PetStats {
    pub(crate) fn from_defaults(defaults: &DefaultStats, rules: &Rules) -> Self {
        Self::from_stored(BTreeMap::new(), defaults, rules)
    }

    /// Rebuilds from a stored map, filling in any vital it is missing.
    pub(crate) fn from_stored(
        mut stored: BTreeMap<VitalKind, Vital>,
        defaults: &DefaultStats,
        rules: &Rules,
    ) -> Self {
        let mut take = |kind: VitalKind| {
            stored
                .remove(&kind)
                .unwrap_or_else(|| Vital::new(kind, defaults.get(kind), rules))
        };
        Self {
            stability: take(VitalKind::Stability),
            energy: take(VitalKind::Energy),
            strength: take(VitalKind::Strength),
        }
    }

    pub(crate) fn get(&self, kind: VitalKind) -> &Vital {
        match kind {
            VitalKind::Stability => &self.stability,
            VitalKind::Energy => &self.energy,
            VitalKind::Strength => &self.strength,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: VitalKind) -> &mut Vital {
        match kind {
            VitalKind::Stability => &mut self.stability,
            VitalKind::Energy => &mut self.energy,
            VitalKind::Strength => &mut self.strength,
        }
    }
}
