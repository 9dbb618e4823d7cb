use crate::background::{Direction, ParticleField};
use crate::catalog::{self, AdoptedPet, Pet};
use crate::config::{load_settings, save_settings_atomic, Paths, Settings};
use crate::game::{GameView, Presenter};
use crate::input::{collect_input_nonblocking, map_event_to_action, Action, Scene};
use crate::model::Rules;
use crate::render::{draw_asteroids, draw_field, draw_game, draw_selector, Terminal};
use crate::selector::{PetSelector, Selection};
use crate::storage::{FileStore, Session};
use crate::theme::Theme;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};

/// Command-line overrides layered over the saved settings.
#[derive(Clone, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) seed: Option<u64>,
    pub(crate) dots: Option<usize>,
    pub(crate) fps: Option<u32>,
    pub(crate) no_color: bool,
    pub(crate) reset: bool,
}

impl Overrides {
    /// Settings for this run only. `saved` is left as loaded so the exit
    /// save never persists a one-off flag.
    fn layered(&self, saved: &Settings) -> Settings {
        let mut settings = saved.clone();
        self.apply(&mut settings);
        settings
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(dots) = self.dots {
            settings.dot_count = dots;
        }
        if let Some(fps) = self.fps {
            settings.fps_cap = fps;
        }
        if self.no_color {
            settings.enable_color = false;
        }
    }
}

enum Stage {
    Selector {
        selector: PetSelector,
        selection: Selection,
    },
    Game(GameView),
}

/// Routes engine events that change what the background does.
struct Backdrop<'a> {
    field: &'a mut ParticleField,
    now_ms: u64,
}

impl Presenter for Backdrop<'_> {
    fn fade_out(&mut self) {
        self.field.fade_out(self.now_ms);
    }
}

/// Millisecond clock for the engine. Anchored to the wall clock once, at
/// startup, so saved `lastIncreasedAt` values stay comparable across runs;
/// advanced by `Instant` so it never runs backwards during a session.
#[derive(Clone, Copy, Debug)]
struct Clock {
    epoch_ms: u64,
    started: Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            epoch_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }
}

pub(crate) struct App {
    saved: Settings,
    settings: Settings,
    clock: Clock,
    rules: Rules,
    paths: Paths,
    session: Session<FileStore>,
    catalog: Vec<Pet>,
    theme: Theme,
    drift: Direction,
    field: ParticleField,
    stage: Stage,
    rng: StdRng,
    games_started: u64,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init(paths: Paths, overrides: &Overrides) -> anyhow::Result<Self> {
        let saved = load_settings(&paths.settings_path);
        let settings = overrides.layered(&saved);

        let mut rules = Rules::default();
        rules.spawner.probability_per_tick = settings.asteroid_probability.clamp(0.0, 1.0);

        let drift = settings.drift_direction.parse().unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to an upward drift");
            Direction::Up
        });

        let catalog = catalog::bundled()?;
        let mut session = Session::new(FileStore::open(paths.store_path.clone()));
        if overrides.reset {
            session.clear_session();
            tracing::info!("saved pet cleared");
        }
        let theme = session.theme();

        let term = Terminal::begin()?;
        let (w, h) = term.field_size();
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut field = ParticleField::new(w, h, rules.fade_ms);
        let clock = Clock::start();
        let now = clock.now_ms();
        field.generate(settings.dot_count, true, now, &mut rng);

        let (selector, selection) = PetSelector::new(catalog.clone(), rules.selector, drift);
        let mut app = Self {
            stage: Stage::Selector {
                selector,
                selection,
            },
            saved,
            settings,
            clock,
            rules,
            paths,
            session,
            catalog,
            theme,
            drift,
            field,
            rng,
            games_started: 0,
            term,
            should_quit: false,
        };

        if let Some(pet) = app.session.adopted_pet() {
            if !app.session.has_pet_stats() {
                tracing::warn!(pet = %pet.name, "no saved vitals, starting from defaults");
            }
            tracing::info!(pet = %pet.name, "resuming saved pet");
            let seed = app.game_seed();
            let game = GameView::resume(pet, &app.session, app.rules.clone(), seed);
            app.enter_game(game, now);
        }
        Ok(app)
    }

    fn game_seed(&mut self) -> u64 {
        self.games_started += 1;
        self.settings.seed.wrapping_add(self.games_started)
    }

    fn enter_selector(&mut self, now: u64) {
        self.field.clear();
        self.field.generate(self.settings.dot_count, true, now, &mut self.rng);
        let (selector, selection) = PetSelector::new(self.catalog.clone(), self.rules.selector, self.drift);
        self.stage = Stage::Selector {
            selector,
            selection,
        };
    }

    fn enter_game(&mut self, mut game: GameView, now: u64) {
        let (w, h) = self.term.field_size();
        game.set_viewport(w, h);
        let mut backdrop = Backdrop {
            field: &mut self.field,
            now_ms: now,
        };
        game.start(now, &mut self.session, &mut backdrop);
        self.stage = Stage::Game(game);
    }

    fn scene(&self) -> Scene {
        match self.stage {
            Stage::Selector { .. } => Scene::Selector,
            Stage::Game(_) => Scene::Game,
        }
    }

    fn handle(&mut self, action: Action, now: u64) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleTheme => {
                self.theme = self.theme.toggle();
                self.session.set_theme(self.theme);
                tracing::info!(theme = self.theme.name(), "theme changed");
            }
            Action::Browse(delta) => {
                if let Stage::Selector { selector, .. } = &mut self.stage {
                    selector.move_cursor(delta);
                }
            }
            Action::Adopt => {
                if let Stage::Selector { selector, .. } = &mut self.stage {
                    selector.adopt(now, &mut self.session);
                }
            }
            Action::Increase(kind) => {
                if let Stage::Game(game) = &mut self.stage {
                    let mut backdrop = Backdrop {
                        field: &mut self.field,
                        now_ms: now,
                    };
                    game.increase(kind, now, &mut self.session, &mut backdrop);
                }
            }
            Action::Dismiss { col, row } => {
                if let Stage::Game(game) = &mut self.stage {
                    game.dismiss_asteroid_at(col, row, now);
                }
            }
        }
    }

    fn update(&mut self, now: u64) {
        match &mut self.stage {
            Stage::Selector {
                selector,
                selection,
            } => {
                selector.advance(now, &mut self.field, &mut self.rng);
                if let Some(id) = selection.try_take() {
                    if let Some(pet) = self.catalog.get(id) {
                        let adopted = AdoptedPet::from_catalog(id, pet);
                        let seed = self.game_seed();
                        let game = GameView::adopt(adopted, &self.session, self.rules.clone(), seed);
                        self.field.generate(self.settings.dot_count, true, now, &mut self.rng);
                        self.enter_game(game, now);
                    }
                }
            }
            Stage::Game(game) => {
                let mut backdrop = Backdrop {
                    field: &mut self.field,
                    now_ms: now,
                };
                game.advance(now, &mut self.session, &mut backdrop);
                if game.is_ended() {
                    tracing::info!("restarting at the selector");
                    self.enter_selector(now);
                }
            }
        }
        self.field.frame(now);
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                let (w, h) = self.term.field_size();
                self.field.resize(w, h, &mut self.rng);
                if let Stage::Game(game) = &mut self.stage {
                    game.set_viewport(w, h);
                }
            }

            let now = self.clock.now_ms();
            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event_to_action(self.scene(), &ev) {
                    self.handle(action, now);
                }
                if self.should_quit {
                    break;
                }
            }

            self.update(now);
            self.render_frame(now)?;

            // frame cap
            spin_sleep(frame_dt, Instant::now());
        }

        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.saved)?;
        Ok(())
    }

    fn render_frame(&mut self, now: u64) -> anyhow::Result<()> {
        let palette = self.theme.palette();
        let color = self.settings.enable_color;
        self.term.cur.clear(palette.fg, palette.bg);
        self.term.canvas.clear();

        draw_field(&mut self.term.canvas, &self.field, &palette, now);
        match &self.stage {
            Stage::Selector { selector, .. } => {
                draw_selector(&mut self.term, selector, &palette, color, now);
            }
            Stage::Game(game) => {
                draw_game(&mut self.term, game, &palette, color, now);
                draw_asteroids(&mut self.term.cur, game.asteroids(), &palette, now);
            }
        }

        self.term.present(true)?;
        Ok(())
    }
}

pub(crate) fn run(paths: Paths, overrides: Overrides) -> anyhow::Result<()> {
    let mut app = App::init(paths, &overrides)?;
    let result = app.run();
    if result.is_err() {
        // leave the terminal usable even when the loop failed
        let _ = app.term.end();
    }
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_what_was_given() {
        let mut s = Settings::default();
        let o = Overrides {
            dots: Some(12),
            no_color: true,
            ..Overrides::default()
        };
        o.apply(&mut s);
        assert_eq!(s.dot_count, 12);
        assert!(!s.enable_color);
        assert_eq!(s.fps_cap, Settings::default().fps_cap);
        assert_eq!(s.seed, Settings::default().seed);
    }

    #[test]
    fn one_off_flags_are_not_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let o = Overrides {
            dots: Some(3),
            fps: Some(120),
            no_color: true,
            ..Overrides::default()
        };

        let saved = load_settings(&path);
        let runtime = o.layered(&saved);
        assert_eq!(runtime.dot_count, 3);
        assert!(!runtime.enable_color);
        save_settings_atomic(&path, &saved).unwrap();

        let next = load_settings(&path);
        assert_eq!(next, Settings::default());
        assert!(next.enable_color);
        assert_eq!(next.dot_count, Settings::default().dot_count);
    }

    #[test]
    fn clock_starts_at_wall_time_and_never_goes_back() {
        let before = chrono::Utc::now().timestamp_millis() as u64;
        let clock = Clock::start();
        let a = clock.now_ms();
        std::thread::sleep(Duration::from_millis(5));
        let b = clock.now_ms();
        assert!(a >= before);
        assert!(b >= a + 5);
    }
}
