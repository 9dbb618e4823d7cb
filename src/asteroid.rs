use crate::model::SpawnerConfig;
use rand::Rng;
use std::f32::consts::PI;

/// Rotation frames per sprite; a sprite turns once over its whole trip.
pub(crate) const SPRITES: [[char; 4]; 4] = [
    ['◐', '◓', '◑', '◒'],
    ['✶', '✷', '✸', '✹'],
    ['◢', '◣', '◤', '◥'],
    ['⬖', '⬘', '⬗', '⬙'],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Point {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

/// One decorative sprite on a linear trip across the screen.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Asteroid {
    pub(crate) sprite: usize,
    pub(crate) start: Point,
    pub(crate) travel: Point,
    pub(crate) started_at: u64,
    pub(crate) duration_ms: u64,
    pub(crate) dismissed_at: Option<u64>,
    pub(crate) dismiss_fade_ms: u64,
}

impl Asteroid {
    fn t(&self, now_ms: u64) -> f32 {
        crate::timer::progress(self.started_at, self.duration_ms, now_ms)
    }

    pub(crate) fn position_at(&self, now_ms: u64) -> Point {
        let t = self.t(now_ms);
        Point {
            x: self.start.x + self.travel.x * t,
            y: self.start.y + self.travel.y * t,
        }
    }

    pub(crate) fn rotation_deg(&self, now_ms: u64) -> f32 {
        360.0 * self.t(now_ms)
    }

    pub(crate) fn glyph(&self, now_ms: u64) -> char {
        let frames = &SPRITES[self.sprite % SPRITES.len()];
        let i = ((self.rotation_deg(now_ms) / 90.0) as usize) % frames.len();
        frames[i]
    }

    /// Terminal cell the sprite occupies; `None` while it is off screen.
    pub(crate) fn cell_at(&self, now_ms: u64) -> Option<(u16, u16)> {
        let p = self.position_at(now_ms);
        if p.x < 0.0 || p.y < 0.0 {
            return None;
        }
        Some(((p.x / 2.0) as u16, (p.y / 4.0) as u16))
    }

    /// Starts the fade that ends the trip early. Only the first call counts.
    pub(crate) fn dismiss(&mut self, now_ms: u64) -> bool {
        if self.dismissed_at.is_some() {
            return false;
        }
        self.dismissed_at = Some(now_ms);
        true
    }

    pub(crate) fn opacity(&self, now_ms: u64) -> f32 {
        match self.dismissed_at {
            Some(at) => 1.0 - crate::timer::progress(at, self.dismiss_fade_ms, now_ms),
            None => 1.0,
        }
    }

    pub(crate) fn is_finished(&self, now_ms: u64) -> bool {
        let faded = self
            .dismissed_at
            .is_some_and(|at| now_ms >= at.saturating_add(self.dismiss_fade_ms));
        faded || now_ms >= self.started_at.saturating_add(self.duration_ms)
    }
}

pub(crate) struct AsteroidSpawner {
    config: SpawnerConfig,
}

impl AsteroidSpawner {
    pub(crate) fn new(config: SpawnerConfig) -> Self {
        Self { config }
    }

    /// Independent trial every supervisory tick.
    pub(crate) fn should_spawn<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen::<f32>() < self.config.probability_per_tick
    }

    pub(crate) fn random_start<R: Rng>(&self, width: f32, height: f32, rng: &mut R) -> (Edge, Point) {
        let m = self.config.edge_margin;
        let along = |extent: f32, rng: &mut R| {
            let v = rng.gen::<f32>() * extent;
            if extent > 2.0 * m {
                v.clamp(m, extent - m)
            } else {
                extent / 2.0
            }
        };
        match rng.gen_range(0..4) {
            0 => (Edge::Top, Point { x: along(width, rng), y: -m }),
            1 => (Edge::Right, Point { x: width + m, y: along(height, rng) }),
            2 => (Edge::Bottom, Point { x: along(width, rng), y: height + m }),
            _ => (Edge::Left, Point { x: -m, y: along(height, rng) }),
        }
    }

    pub(crate) fn opposite(&self, edge: Edge, start: Point, width: f32, height: f32) -> Point {
        let m = self.config.edge_margin;
        match edge {
            Edge::Top => Point { x: start.x, y: height + m },
            Edge::Right => Point { x: -m, y: start.y },
            Edge::Bottom => Point { x: start.x, y: -m },
            Edge::Left => Point { x: width + m, y: start.y },
        }
    }

    pub(crate) fn spawn<R: Rng>(
        &self,
        edge: Edge,
        start: Point,
        width: f32,
        height: f32,
        now_ms: u64,
        rng: &mut R,
    ) -> Asteroid {
        let end = self.opposite(edge, start, width, height);

        let max_dev = width.min(height) * self.config.deviation_fraction;
        let angle = rng.gen::<f32>() * PI;
        let travel = Point {
            x: end.x - start.x + angle.cos() * max_dev,
            y: end.y - start.y + angle.sin() * max_dev,
        };

        let distance = (travel.x * travel.x + travel.y * travel.y).sqrt();
        let lo = self.config.secs_per_px_min;
        let hi = self.config.secs_per_px_max.max(lo);
        let speed = lo + rng.gen::<f32>() * (hi - lo);
        let secs = (distance * speed).max(self.config.min_duration_secs);

        let asteroid = Asteroid {
            sprite: rng.gen_range(0..SPRITES.len()),
            start,
            travel,
            started_at: now_ms,
            duration_ms: (secs * 1000.0).round() as u64,
            dismissed_at: None,
            dismiss_fade_ms: self.config.dismiss_fade_ms,
        };
        tracing::debug!(?edge, secs, "asteroid spawned");
        asteroid
    }
}
