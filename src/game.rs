//! Vitals engine: independent decay timers, a 1 Hz supervisor that
//! classifies every vital, scoring, and the game-over sequence.
//!
//! The engine never reads a clock. Callers hand it `now_ms` and a
//! [`Presenter`] that receives everything worth showing.

use crate::asteroid::{Asteroid, AsteroidSpawner};
use crate::catalog::AdoptedPet;
use crate::model::Rules;
use crate::storage::{KeyValueStore, Session};
use crate::timer::{progress, Countdown, Interval};
use crate::vitals::{classify, IncreaseOutcome, NotificationState, PetStats, Severity, VitalKind};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LogLevel {
    Info,
    Notice,
    Warning,
    Critical,
    Fatal,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LogEntry {
    pub(crate) at_ms: u64,
    pub(crate) level: LogLevel,
    pub(crate) message: String,
}

/// Presentation seam. Everything is optional.
pub(crate) trait Presenter {
    fn log(&mut self, _entry: &LogEntry) {}
    fn severity_changed(&mut self, _kind: VitalKind, _severity: Severity) {}
    fn cooldown_started(&mut self, _kind: VitalKind, _secs: u64) {}
    fn cooldown_finished(&mut self, _kind: VitalKind) {}
    fn asteroid_spawned(&mut self, _asteroid: &Asteroid) {}
    fn game_over(&mut self) {}
    fn fade_out(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Running,
    GameOver { restart_at: u64 },
    Fading { until: u64 },
    Ended,
}

#[derive(Clone, Copy, Debug)]
struct Track {
    decay: Interval,
    notified: NotificationState,
    severity: Severity,
    countdown: Option<Countdown>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Due {
    Decay(VitalKind),
    Supervise,
}

fn slot(kind: VitalKind) -> usize {
    match kind {
        VitalKind::Stability => 0,
        VitalKind::Energy => 1,
        VitalKind::Strength => 2,
    }
}

pub(crate) struct GameView {
    rules: Rules,
    pet: AdoptedPet,
    stats: PetStats,
    tracks: [Track; 3],
    supervisor: Interval,
    score: u64,
    high_score: u64,
    log: VecDeque<LogEntry>,
    phase: Phase,
    spawner: AsteroidSpawner,
    asteroids: Vec<Asteroid>,
    viewport: (f32, f32),
    rng: StdRng,
}

impl GameView {
    pub(crate) fn new(pet: AdoptedPet, stats: PetStats, rules: Rules, seed: u64) -> Self {
        let track = |kind: VitalKind| Track {
            decay: Interval::new(stats.get(kind).tick_interval_ms),
            notified: NotificationState::default(),
            severity: classify(stats.get(kind).value, &rules.thresholds),
            countdown: None,
        };
        let tracks = [
            track(VitalKind::Stability),
            track(VitalKind::Energy),
            track(VitalKind::Strength),
        ];
        Self {
            supervisor: Interval::new(rules.supervise_interval_ms),
            spawner: AsteroidSpawner::new(rules.spawner),
            rules,
            pet,
            stats,
            tracks,
            score: 0,
            high_score: 0,
            log: VecDeque::new(),
            phase: Phase::Running,
            asteroids: Vec::new(),
            viewport: (0.0, 0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Rebuilds the game for `pet` from whatever the session holds.
    pub(crate) fn resume<S: KeyValueStore>(
        pet: AdoptedPet,
        session: &Session<S>,
        rules: Rules,
        seed: u64,
    ) -> Self {
        let stats = session.pet_stats(&pet.default_stats, &rules);
        let mut game = Self::new(pet, stats, rules, seed);
        game.score = session.score();
        game.high_score = session.high_score();
        game
    }

    /// Fresh game for a newly adopted pet: default vitals, score zero,
    /// the stored high score carried over.
    pub(crate) fn adopt<S: KeyValueStore>(
        pet: AdoptedPet,
        session: &Session<S>,
        rules: Rules,
        seed: u64,
    ) -> Self {
        let stats = PetStats::from_defaults(&pet.default_stats, &rules);
        let mut game = Self::new(pet, stats, rules, seed);
        game.high_score = session.high_score();
        game
    }

    /// Starts the decay and supervisory timers. A cooldown still running
    /// from a saved `lastIncreasedAt` gets its countdown back.
    pub(crate) fn start<S: KeyValueStore, P: Presenter>(
        &mut self,
        now_ms: u64,
        session: &mut Session<S>,
        presenter: &mut P,
    ) {
        for kind in VitalKind::ALL {
            let vital = self.stats.get(kind);
            let track = &mut self.tracks[slot(kind)];
            track.decay.start(now_ms);
            presenter.severity_changed(kind, track.severity);

            track.countdown = vital
                .last_increased_at
                .map(|last| Countdown::new(last, vital.cooldown_ms))
                .filter(|c| !c.is_done(now_ms));
            if let Some(c) = track.countdown {
                presenter.cooldown_started(kind, c.remaining_secs(now_ms));
            }
        }
        self.supervisor.start(now_ms);
        self.phase = Phase::Running;
        session.set_pet_stats(&self.stats);
        self.push_log(
            now_ms,
            LogLevel::Info,
            format!("{} is in your care.", self.pet.name),
            presenter,
        );
        tracing::info!(pet = %self.pet.name, score = self.score, "game started");
    }

    pub(crate) fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    /// Fires every timer due by `now_ms` in chronological order, then
    /// moves the game-over sequence along.
    pub(crate) fn advance<S: KeyValueStore, P: Presenter>(
        &mut self,
        now_ms: u64,
        session: &mut Session<S>,
        presenter: &mut P,
    ) {
        while self.phase == Phase::Running {
            let Some((at, due)) = self.next_due(now_ms) else {
                break;
            };
            match due {
                Due::Decay(kind) => {
                    self.tracks[slot(kind)].decay.fire();
                    self.decay_tick(kind, session);
                }
                Due::Supervise => {
                    self.supervisor.fire();
                    self.supervise(at, session, presenter);
                }
            }
        }

        for kind in VitalKind::ALL {
            let track = &mut self.tracks[slot(kind)];
            if track.countdown.is_some_and(|c| c.is_done(now_ms)) {
                track.countdown = None;
                presenter.cooldown_finished(kind);
            }
        }
        self.asteroids.retain(|a| !a.is_finished(now_ms));

        match self.phase {
            Phase::GameOver { restart_at } if now_ms >= restart_at => {
                presenter.fade_out();
                self.phase = Phase::Fading {
                    until: restart_at + self.rules.fade_ms,
                };
                if now_ms >= restart_at + self.rules.fade_ms {
                    self.phase = Phase::Ended;
                }
            }
            Phase::Fading { until } if now_ms >= until => self.phase = Phase::Ended,
            _ => {}
        }
    }

    /// Earliest due timer; on a tie decay runs before supervision.
    fn next_due(&self, now_ms: u64) -> Option<(u64, Due)> {
        let mut best: Option<(u64, Due)> = None;
        for kind in VitalKind::ALL {
            let iv = &self.tracks[slot(kind)].decay;
            if let Some(at) = iv.next_due().filter(|_| iv.due(now_ms)) {
                if best.map_or(true, |(b, _)| at < b) {
                    best = Some((at, Due::Decay(kind)));
                }
            }
        }
        if let Some(at) = self.supervisor.next_due().filter(|_| self.supervisor.due(now_ms)) {
            if best.map_or(true, |(b, _)| at < b) {
                best = Some((at, Due::Supervise));
            }
        }
        best
    }

    fn decay_tick<S: KeyValueStore>(&mut self, kind: VitalKind, session: &mut Session<S>) {
        self.stats.get_mut(kind).decay();
        session.set_pet_stats(&self.stats);
    }

    fn supervise<S: KeyValueStore, P: Presenter>(
        &mut self,
        at: u64,
        session: &mut Session<S>,
        presenter: &mut P,
    ) {
        let mut collapsed = None;
        for kind in VitalKind::ALL {
            let value = self.stats.get(kind).value;
            let band = classify(value, &self.rules.thresholds);
            let track = &mut self.tracks[slot(kind)];
            if band != track.severity {
                track.severity = band;
                presenter.severity_changed(kind, band);
            }
            if track.notified.observe(band) {
                let (level, message) = self.band_message(kind, band, value);
                self.push_log(at, level, message, presenter);
            }
            if band == Severity::Zero && collapsed.is_none() {
                collapsed = Some(kind);
            }
        }

        if let Some(kind) = collapsed {
            self.end_game(at, kind, session, presenter);
            return;
        }

        self.score += 1;
        session.set_score(self.score);
        if self.score > self.high_score {
            self.high_score = self.score;
            session.set_high_score(self.high_score);
        }

        let (w, h) = self.viewport;
        if w > 0.0 && h > 0.0 && self.spawner.should_spawn(&mut self.rng) {
            let (edge, start) = self.spawner.random_start(w, h, &mut self.rng);
            let asteroid = self.spawner.spawn(edge, start, w, h, at, &mut self.rng);
            presenter.asteroid_spawned(&asteroid);
            self.asteroids.push(asteroid);
        }
    }

    fn band_message(&self, kind: VitalKind, band: Severity, value: f32) -> (LogLevel, String) {
        let name = &self.pet.name;
        let vital = kind.label().to_lowercase();
        match band {
            Severity::Warning => (
                LogLevel::Warning,
                format!("{name}'s {vital} is slipping ({value:.0})."),
            ),
            Severity::Critical => (
                LogLevel::Critical,
                format!("{name}'s {vital} is critically low!"),
            ),
            Severity::Zero => (LogLevel::Critical, format!("{name}'s {vital} has collapsed.")),
            Severity::Normal => (LogLevel::Info, format!("{name}'s {vital} is fine.")),
        }
    }

    fn end_game<S: KeyValueStore, P: Presenter>(
        &mut self,
        at: u64,
        kind: VitalKind,
        session: &mut Session<S>,
        presenter: &mut P,
    ) {
        for track in &mut self.tracks {
            track.decay.stop();
            track.countdown = None;
        }
        self.supervisor.stop();
        session.clear_session();

        self.push_log(
            at,
            LogLevel::Fatal,
            format!("{} could not hold together. Starting over...", self.pet.name),
            presenter,
        );
        self.phase = Phase::GameOver {
            restart_at: at + self.rules.game_over_grace_ms,
        };
        presenter.game_over();
        tracing::info!(
            pet = %self.pet.name,
            vital = kind.label(),
            score = self.score,
            high_score = self.high_score,
            "game over"
        );
    }

    /// Player action on one vital. `None` once the game is no longer running.
    pub(crate) fn increase<S: KeyValueStore, P: Presenter>(
        &mut self,
        kind: VitalKind,
        now_ms: u64,
        session: &mut Session<S>,
        presenter: &mut P,
    ) -> Option<IncreaseOutcome> {
        if self.phase != Phase::Running {
            return None;
        }
        let outcome = self.stats.get_mut(kind).increase(now_ms);
        match outcome {
            IncreaseOutcome::Applied { value } => {
                session.set_pet_stats(&self.stats);
                let cooldown_ms = self.stats.get(kind).cooldown_ms;
                let countdown = Countdown::new(now_ms, cooldown_ms);
                self.tracks[slot(kind)].countdown = Some(countdown);
                presenter.cooldown_started(kind, countdown.remaining_secs(now_ms));
                self.push_log(
                    now_ms,
                    LogLevel::Info,
                    format!("{}: {} is now {value:.0}.", kind.action_label(), kind.label()),
                    presenter,
                );
            }
            IncreaseOutcome::AlreadyOptimal => {
                self.push_log(
                    now_ms,
                    LogLevel::Notice,
                    format!("{} is already optimal.", kind.label()),
                    presenter,
                );
            }
            IncreaseOutcome::CoolingDown { remaining_ms } => {
                self.push_log(
                    now_ms,
                    LogLevel::Notice,
                    format!(
                        "Please wait {}s before you {} again.",
                        remaining_ms.div_ceil(1000),
                        kind.action_label().to_lowercase()
                    ),
                    presenter,
                );
            }
        }
        tracing::debug!(vital = kind.label(), ?outcome, "increase");
        Some(outcome)
    }

    /// Click on a terminal cell. Fades out the first live asteroid drawn there.
    pub(crate) fn dismiss_asteroid_at(&mut self, col: u16, row: u16, now_ms: u64) -> bool {
        let hit = self
            .asteroids
            .iter_mut()
            .find(|a| a.dismissed_at.is_none() && a.cell_at(now_ms) == Some((col, row)));
        match hit {
            Some(a) => {
                a.dismiss(now_ms);
                tracing::debug!(col, row, "asteroid dismissed");
                true
            }
            None => false,
        }
    }

    fn push_log<P: Presenter>(&mut self, at_ms: u64, level: LogLevel, message: String, presenter: &mut P) {
        let entry = LogEntry {
            at_ms,
            level,
            message,
        };
        presenter.log(&entry);
        if level >= LogLevel::Warning {
            tracing::info!(?level, message = %entry.message, "game log");
        }
        self.log.push_back(entry);
        while self.log.len() > self.rules.log_capacity {
            self.log.pop_front();
        }
    }

    pub(crate) fn pet(&self) -> &AdoptedPet {
        &self.pet
    }

    pub(crate) fn stats(&self) -> &PetStats {
        &self.stats
    }

    pub(crate) fn severity(&self, kind: VitalKind) -> Severity {
        self.tracks[slot(kind)].severity
    }

    /// Seconds left on a control's countdown; `None` when it is enabled.
    pub(crate) fn countdown_secs(&self, kind: VitalKind, now_ms: u64) -> Option<u64> {
        self.tracks[slot(kind)]
            .countdown
            .filter(|c| !c.is_done(now_ms))
            .map(|c| c.remaining_secs(now_ms))
    }

    pub(crate) fn score(&self) -> u64 {
        self.score
    }

    pub(crate) fn high_score(&self) -> u64 {
        self.high_score
    }

    pub(crate) fn log(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub(crate) fn asteroids(&self) -> &[Asteroid] {
        &self.asteroids
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// 1 while alive, falling to 0 across the fade after a game over.
    pub(crate) fn fade_opacity(&self, now_ms: u64) -> f32 {
        match self.phase {
            Phase::Running | Phase::GameOver { .. } => 1.0,
            Phase::Fading { until } => {
                1.0 - progress(until.saturating_sub(self.rules.fade_ms), self.rules.fade_ms, now_ms)
            }
            Phase::Ended => 0.0,
        }
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    #[cfg(test)]
    fn stats_mut(&mut self) -> &mut PetStats {
        &mut self.stats
    }

    #[cfg(test)]
    fn timers_running(&self) -> bool {
        self.supervisor.is_running() || self.tracks.iter().any(|t| t.decay.is_running())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DefaultStats, PlanetImage};
    use crate::model::VitalTuning;
    use crate::storage::{MemoryStore, KEY_ADOPTED_PET, KEY_PET_STATS, KEY_SCORE};

    #[derive(Default)]
    struct Recorder {
        logs: Vec<LogEntry>,
        severities: Vec<(VitalKind, Severity)>,
        cooldowns: Vec<(VitalKind, u64)>,
        finished: Vec<VitalKind>,
        asteroids: usize,
        game_overs: usize,
        fades: usize,
    }

    impl Presenter for Recorder {
        fn log(&mut self, entry: &LogEntry) {
            self.logs.push(entry.clone());
        }
        fn severity_changed(&mut self, kind: VitalKind, severity: Severity) {
            self.severities.push((kind, severity));
        }
        fn cooldown_started(&mut self, kind: VitalKind, secs: u64) {
            self.cooldowns.push((kind, secs));
        }
        fn cooldown_finished(&mut self, kind: VitalKind) {
            self.finished.push(kind);
        }
        fn asteroid_spawned(&mut self, _asteroid: &Asteroid) {
            self.asteroids += 1;
        }
        fn game_over(&mut self) {
            self.game_overs += 1;
        }
        fn fade_out(&mut self) {
            self.fades += 1;
        }
    }

    impl Recorder {
        fn count(&self, level: LogLevel) -> usize {
            self.logs.iter().filter(|e| e.level == level).count()
        }
    }

    fn pet(stability: f32, energy: f32, strength: f32) -> AdoptedPet {
        AdoptedPet {
            id: 0,
            name: "Testa".to_string(),
            image: PlanetImage {
                base: [0, 0, 0],
                accent: [0, 0, 0],
                ocean: [0, 0, 0],
                atmosphere: [0, 0, 0],
                rings: false,
                seed: 0,
                roughness: 0.5,
                bands: 0.5,
                clouds: 0.0,
                ice: 0.0,
            },
            description: String::new(),
            default_stats: DefaultStats {
                stability,
                energy,
                strength,
            },
        }
    }

    /// Decay effectively disabled so the supervisor can be driven by hand.
    fn frozen_rules() -> Rules {
        let mut rules = Rules::default();
        for t in rules.tuning.values_mut() {
            t.tick_interval_ms = 1_000_000_000;
        }
        rules.spawner.probability_per_tick = 0.0;
        rules
    }

    fn game(p: AdoptedPet, rules: Rules) -> (GameView, Session<MemoryStore>, Recorder) {
        let mut session = Session::new(MemoryStore::default());
        let mut rec = Recorder::default();
        let mut g = GameView::resume(p, &session, rules, 1);
        g.set_viewport(160.0, 96.0);
        g.start(0, &mut session, &mut rec);
        (g, session, rec)
    }

    #[test]
    fn decay_removes_exactly_n_ticks() {
        let mut rules = Rules::default();
        rules.spawner.probability_per_tick = 0.0;
        let (mut g, mut session, mut rec) = game(pet(90.0, 90.0, 90.0), rules);

        g.advance(9_000, &mut session, &mut rec);
        assert_eq!(g.stats().get(VitalKind::Stability).value, 90.0 - 3.0);
        assert_eq!(g.stats().get(VitalKind::Energy).value, 90.0 - 6.0);
        assert_eq!(g.stats().get(VitalKind::Strength).value, 90.0 - 4.0);

        let rules = Rules::default();
        let restored = session.pet_stats(&pet(0.0, 0.0, 0.0).default_stats, &rules);
        assert_eq!(&restored, g.stats());
    }

    #[test]
    fn decay_is_not_clamped_below_zero() {
        let mut rules = Rules::default();
        rules.tuning.insert(
            VitalKind::Energy,
            VitalTuning {
                increase_by: 10.0,
                cooldown_ms: 1000,
                decay_per_tick: 4.0,
                tick_interval_ms: 100,
            },
        );
        rules.supervise_interval_ms = 1_000_000;
        rules.spawner.probability_per_tick = 0.0;
        let (mut g, mut session, mut rec) = game(pet(90.0, 10.0, 90.0), rules);
        g.advance(500, &mut session, &mut rec);
        assert_eq!(g.stats().get(VitalKind::Energy).value, 10.0 - 20.0);
    }

    #[test]
    fn score_counts_supervisory_ticks_and_high_score_only_rises() {
        let mut session = Session::new(MemoryStore::default());
        session.set_high_score(5);
        let mut rec = Recorder::default();
        let mut g = GameView::resume(pet(90.0, 90.0, 90.0), &session, frozen_rules(), 1);
        g.start(0, &mut session, &mut rec);

        g.advance(3_000, &mut session, &mut rec);
        assert_eq!(g.score(), 3);
        assert_eq!(g.high_score(), 5);
        assert_eq!(session.high_score(), 5);

        g.advance(7_000, &mut session, &mut rec);
        assert_eq!(g.score(), 7);
        assert_eq!(g.high_score(), 7);
        assert_eq!(session.high_score(), 7);
        assert_eq!(session.score(), 7);
    }

    #[test]
    fn band_logs_are_edge_triggered() {
        let (mut g, mut session, mut rec) = game(pet(90.0, 90.0, 90.0), frozen_rules());
        let mut now = 0;
        for value in [70.0, 60.0, 60.0, 20.0] {
            g.stats_mut().get_mut(VitalKind::Strength).value = value;
            now += 1000;
            g.advance(now, &mut session, &mut rec);
        }
        assert_eq!(rec.count(LogLevel::Warning), 1);
        assert_eq!(rec.count(LogLevel::Critical), 1);
        assert!(rec.logs.iter().any(|e| e.message.contains("strength is slipping (60)")));
        assert_eq!(
            rec.severities
                .iter()
                .filter(|(k, _)| *k == VitalKind::Strength)
                .map(|(_, s)| *s)
                .collect::<Vec<_>>(),
            vec![Severity::Normal, Severity::Warning, Severity::Critical]
        );
    }

    #[test]
    fn zero_vital_halts_everything_and_clears_storage() {
        let mut rules = Rules::default();
        rules.spawner.probability_per_tick = 0.0;
        let (mut g, mut session, mut rec) = game(pet(1.0, 90.0, 90.0), rules);

        // stability decays to 0 at 3000ms, the same instant as the third supervision
        g.advance(3_000, &mut session, &mut rec);
        assert_eq!(g.stats().get(VitalKind::Stability).value, 0.0);
        assert!(matches!(g.phase(), Phase::GameOver { restart_at: 8_000 }));
        assert!(!g.timers_running());
        assert_eq!(g.score(), 2);
        assert_eq!(rec.game_overs, 1);
        assert_eq!(rec.count(LogLevel::Fatal), 1);

        let store = session.store();
        assert_eq!(store.get(KEY_PET_STATS), None);
        assert_eq!(store.get(KEY_ADOPTED_PET), None);
        assert_eq!(store.get(KEY_SCORE), None);

        let energy = g.stats().get(VitalKind::Energy).value;
        g.advance(7_999, &mut session, &mut rec);
        assert_eq!(g.stats().get(VitalKind::Energy).value, energy);
        assert_eq!(session.store().get(KEY_PET_STATS), None);
        assert_eq!(rec.fades, 0);

        g.advance(8_000, &mut session, &mut rec);
        assert_eq!(rec.fades, 1);
        assert!(matches!(g.phase(), Phase::Fading { until: 11_000 }));
        assert_eq!(g.fade_opacity(9_500), 0.5);
        g.advance(11_000, &mut session, &mut rec);
        assert!(g.is_ended());
        assert_eq!(rec.game_overs, 1);
    }

    #[test]
    fn increase_applies_cooldown_and_persists() {
        let (mut g, mut session, mut rec) = game(pet(50.0, 50.0, 50.0), frozen_rules());
        let out = g.increase(VitalKind::Energy, 1_000, &mut session, &mut rec);
        assert_eq!(out, Some(IncreaseOutcome::Applied { value: 65.0 }));
        assert_eq!(rec.cooldowns, vec![(VitalKind::Energy, 5)]);
        assert_eq!(g.countdown_secs(VitalKind::Energy, 3_500), Some(3));

        let stored = session.pet_stats(&pet(0.0, 0.0, 0.0).default_stats, &frozen_rules());
        assert_eq!(stored.get(VitalKind::Energy).value, 65.0);
        assert_eq!(stored.get(VitalKind::Energy).last_increased_at, Some(1_000));

        let out = g.increase(VitalKind::Energy, 2_000, &mut session, &mut rec);
        assert_eq!(out, Some(IncreaseOutcome::CoolingDown { remaining_ms: 4_000 }));
        assert!(rec.logs.last().unwrap().message.contains("Please wait 4s"));
        assert_eq!(rec.logs.last().unwrap().level, LogLevel::Notice);

        g.advance(6_000, &mut session, &mut rec);
        assert_eq!(rec.finished, vec![VitalKind::Energy]);
        assert_eq!(g.countdown_secs(VitalKind::Energy, 6_000), None);
        let out = g.increase(VitalKind::Energy, 6_000, &mut session, &mut rec);
        assert_eq!(out, Some(IncreaseOutcome::Applied { value: 80.0 }));
    }

    #[test]
    fn increase_above_optimal_is_a_notice() {
        let (mut g, mut session, mut rec) = game(pet(95.0, 50.0, 50.0), frozen_rules());
        let out = g.increase(VitalKind::Stability, 0, &mut session, &mut rec);
        assert_eq!(out, Some(IncreaseOutcome::AlreadyOptimal));
        assert_eq!(g.stats().get(VitalKind::Stability).value, 95.0);
        assert_eq!(rec.logs.last().unwrap().message, "Stability is already optimal.");
    }

    #[test]
    fn actions_are_ignored_after_game_over() {
        let (mut g, mut session, mut rec) = game(pet(50.0, 50.0, 50.0), frozen_rules());
        g.stats_mut().get_mut(VitalKind::Energy).value = -1.0;
        g.advance(1_000, &mut session, &mut rec);
        assert_eq!(g.increase(VitalKind::Energy, 1_500, &mut session, &mut rec), None);
    }

    #[test]
    fn asteroids_spawn_on_ticks_and_remove_themselves() {
        let mut rules = frozen_rules();
        rules.spawner.probability_per_tick = 1.0;
        let (mut g, mut session, mut rec) = game(pet(90.0, 90.0, 90.0), rules);
        g.advance(1_000, &mut session, &mut rec);
        assert_eq!(rec.asteroids, 1);
        assert_eq!(g.asteroids().len(), 1);
        let first = g.asteroids()[0];
        let ends = first.started_at + first.duration_ms;
        assert_eq!(first.started_at, 1_000);

        g.advance(ends, &mut session, &mut rec);
        assert!(g.asteroids().iter().all(|a| a.started_at > 1_000));
        assert!(g.asteroids().iter().all(|a| !a.is_finished(ends)));
    }

    #[test]
    fn clicked_asteroid_fades_and_goes_away() {
        let mut rules = frozen_rules();
        rules.spawner.probability_per_tick = 1.0;
        let (mut g, mut session, mut rec) = game(pet(90.0, 90.0, 90.0), rules);
        g.advance(1_000, &mut session, &mut rec);
        let a = g.asteroids()[0];
        let (at, (col, row)) = (a.started_at..a.started_at + a.duration_ms)
            .step_by(50)
            .find_map(|t| a.cell_at(t).map(|cell| (t, cell)))
            .unwrap();

        assert!(!g.dismiss_asteroid_at(col.wrapping_add(40), row.wrapping_add(40), at));
        assert!(g.dismiss_asteroid_at(col, row, at));
        assert!(!g.dismiss_asteroid_at(col, row, at));
        assert_eq!(g.asteroids()[0].opacity(at + 100), 0.5);

        // the supervisor keeps spawning; only the first asteroid is watched
        g.advance(at + 200, &mut session, &mut rec);
        assert!(g.asteroids().iter().all(|b| b.started_at != a.started_at));
    }

    #[test]
    fn resumed_cooldown_keeps_its_countdown() {
        let mut session = Session::new(MemoryStore::default());
        let rules = frozen_rules();
        let mut rec = Recorder::default();
        let mut g = GameView::adopt(pet(50.0, 50.0, 50.0), &session, rules.clone(), 1);
        g.start(99_000, &mut session, &mut rec);
        let out = g.increase(VitalKind::Energy, 100_000, &mut session, &mut rec);
        assert_eq!(out, Some(IncreaseOutcome::Applied { value: 65.0 }));

        let mut rec = Recorder::default();
        let mut g = GameView::resume(pet(50.0, 50.0, 50.0), &session, rules, 2);
        g.start(101_000, &mut session, &mut rec);
        assert_eq!(g.countdown_secs(VitalKind::Energy, 101_000), Some(4));
        assert_eq!(g.countdown_secs(VitalKind::Stability, 101_000), None);
        assert_eq!(rec.cooldowns, vec![(VitalKind::Energy, 4)]);
        assert_eq!(
            g.increase(VitalKind::Energy, 101_000, &mut session, &mut rec),
            Some(IncreaseOutcome::CoolingDown { remaining_ms: 4_000 })
        );

        g.advance(105_000, &mut session, &mut rec);
        assert_eq!(rec.finished, vec![VitalKind::Energy]);
        assert_eq!(g.countdown_secs(VitalKind::Energy, 105_000), None);
    }

    #[test]
    fn expired_cooldown_is_not_restored() {
        let mut session = Session::new(MemoryStore::default());
        let rules = frozen_rules();
        let mut rec = Recorder::default();
        let mut g = GameView::adopt(pet(50.0, 50.0, 50.0), &session, rules.clone(), 1);
        g.start(0, &mut session, &mut rec);
        g.increase(VitalKind::Energy, 1_000, &mut session, &mut rec);

        let mut rec = Recorder::default();
        let mut g = GameView::resume(pet(50.0, 50.0, 50.0), &session, rules, 2);
        g.start(6_000, &mut session, &mut rec);
        assert_eq!(g.countdown_secs(VitalKind::Energy, 6_000), None);
        assert!(rec.cooldowns.is_empty());
    }

    #[test]
    fn log_is_bounded() {
        let mut rules = frozen_rules();
        rules.log_capacity = 4;
        let (mut g, mut session, mut rec) = game(pet(95.0, 50.0, 50.0), rules);
        for i in 0..10 {
            g.increase(VitalKind::Stability, i, &mut session, &mut rec);
        }
        assert_eq!(g.log().count(), 4);
        assert_eq!(rec.logs.len(), 11);
    }

    #[test]
    fn adopting_ignores_leftover_stats() {
        let mut session = Session::new(MemoryStore::default());
        let rules = frozen_rules();
        let mut stale = PetStats::from_defaults(&pet(10.0, 10.0, 10.0).default_stats, &rules);
        stale.get_mut(VitalKind::Stability).value = 3.0;
        session.set_pet_stats(&stale);
        session.set_score(40);
        session.set_high_score(41);

        let mut rec = Recorder::default();
        let mut g = GameView::adopt(pet(80.0, 80.0, 80.0), &session, rules.clone(), 2);
        g.start(0, &mut session, &mut rec);
        assert_eq!(g.stats().get(VitalKind::Stability).value, 80.0);
        assert_eq!(g.score(), 0);
        assert_eq!(g.high_score(), 41);
        let stored = session.pet_stats(&pet(0.0, 0.0, 0.0).default_stats, &rules);
        assert_eq!(stored.get(VitalKind::Stability).value, 80.0);
    }

    #[test]
    fn resume_uses_stored_stats_and_score() {
        let mut session = Session::new(MemoryStore::default());
        let rules = frozen_rules();
        let mut stats = PetStats::from_defaults(&pet(70.0, 70.0, 70.0).default_stats, &rules);
        stats.get_mut(VitalKind::Energy).value = 33.0;
        session.set_pet_stats(&stats);
        session.set_score(12);
        let g = GameView::resume(pet(70.0, 70.0, 70.0), &session, rules, 3);
        assert_eq!(g.stats().get(VitalKind::Energy).value, 33.0);
        assert_eq!(g.score(), 12);
        assert_eq!(g.severity(VitalKind::Energy), Severity::Warning);
    }
}
