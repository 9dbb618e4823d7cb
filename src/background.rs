//! Ambient particle field drawn beneath every scene.
//!
//! Coordinates are braille sub-pixels. Velocities are per frame, so the
//! drift speed follows the frame rate the same way a browser canvas
//! animation would.

use crate::error::Error;
use crate::timer::progress;
use rand::Rng;
use std::str::FromStr;

const RADIUS_MIN: f32 = 1.0;
const RADIUS_SPAN: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u" | "up" => Ok(Direction::Up),
            "d" | "down" => Ok(Direction::Down),
            "l" | "left" => Ok(Direction::Left),
            "r" | "right" => Ok(Direction::Right),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

/// https://easings.net/#easeOutCubic
pub(crate) fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

#[derive(Clone, Copy, Debug)]
struct Slide {
    start_x: f32,
    start_y: f32,
    direction: Direction,
    distance: f32,
    started_at: u64,
    duration_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Dot {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) vx: f32,
    pub(crate) vy: f32,
    pub(crate) radius: f32,
    slide: Option<Slide>,
}

impl Dot {
    pub(crate) fn new(x: f32, y: f32, vx: f32, vy: f32, radius: f32) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            radius,
            slide: None,
        }
    }

    /// Moves by one frame of velocity and flips a component at either edge.
    pub(crate) fn update(&mut self, width: f32, height: f32) {
        self.x += self.vx;
        self.y += self.vy;

        if self.x <= 0.0 || self.x >= width {
            self.vx = -self.vx;
        }
        if self.y <= 0.0 || self.y >= height {
            self.vy = -self.vy;
        }
    }

    fn slide(&mut self, direction: Direction, distance: f32, duration_ms: u64, now_ms: u64) {
        self.slide = Some(Slide {
            start_x: self.x,
            start_y: self.y,
            direction,
            distance,
            started_at: now_ms,
            duration_ms,
        });
    }

    fn apply_slide(&mut self, now_ms: u64) {
        let Some(s) = self.slide else {
            return;
        };
        let t = progress(s.started_at, s.duration_ms, now_ms);
        let offset = s.distance * ease_out_cubic(t);
        match s.direction {
            Direction::Up => self.y = s.start_y - offset,
            Direction::Down => self.y = s.start_y + offset,
            Direction::Left => self.x = s.start_x - offset,
            Direction::Right => self.x = s.start_x + offset,
        }
        if t >= 1.0 {
            self.slide = None;
        }
    }

    #[cfg(test)]
    pub(crate) fn is_sliding(&self) -> bool {
        self.slide.is_some()
    }
}

#[derive(Clone, Copy, Debug)]
struct Fade {
    from: f32,
    to: f32,
    started_at: u64,
    duration_ms: u64,
}

pub(crate) struct ParticleField {
    width: f32,
    height: f32,
    dots: Vec<Dot>,
    fade: Option<Fade>,
    fade_ms: u64,
}

impl ParticleField {
    pub(crate) fn new(width: f32, height: f32, fade_ms: u64) -> Self {
        Self {
            width,
            height,
            dots: Vec::new(),
            fade: None,
            fade_ms,
        }
    }

    pub(crate) fn dots(&self) -> &[Dot] {
        &self.dots
    }

    #[cfg(test)]
    pub(crate) fn dots_mut(&mut self) -> &mut Vec<Dot> {
        &mut self.dots
    }

    pub(crate) fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Replaces the field with `count` fresh dots.
    pub(crate) fn generate<R: Rng>(&mut self, count: usize, fade_in: bool, now_ms: u64, rng: &mut R) {
        self.dots = (0..count)
            .map(|_| {
                let radius = rng.gen::<f32>() * RADIUS_SPAN + RADIUS_MIN;
                let x = rng.gen::<f32>() * self.width;
                let y = rng.gen::<f32>() * self.height;
                let vx = (rng.gen::<f32>() - 0.1) * 0.1;
                let vy = (rng.gen::<f32>() - 0.1) * 0.1;
                Dot::new(x, y, vx, vy, radius)
            })
            .collect();
        self.fade = fade_in.then_some(Fade {
            from: 0.0,
            to: 1.0,
            started_at: now_ms,
            duration_ms: self.fade_ms,
        });
        tracing::debug!(count, fade_in, "background generated");
    }

    /// One rendered frame: drift and reflect, then any slide overrides its axis.
    pub(crate) fn frame(&mut self, now_ms: u64) {
        for dot in &mut self.dots {
            dot.update(self.width, self.height);
            dot.apply_slide(now_ms);
        }
    }

    /// New bounds; every dot is scattered again rather than rescaled.
    pub(crate) fn resize<R: Rng>(&mut self, width: f32, height: f32, rng: &mut R) {
        self.width = width;
        self.height = height;
        for dot in &mut self.dots {
            dot.x = rng.gen::<f32>() * width;
            dot.y = rng.gen::<f32>() * height;
            dot.slide = None;
        }
    }

    /// Each dot slides on its own randomly chosen duration.
    pub(crate) fn slide_all<R: Rng>(
        &mut self,
        direction: Direction,
        distance: f32,
        min_duration_ms: u64,
        max_duration_ms: u64,
        now_ms: u64,
        rng: &mut R,
    ) {
        let hi = max_duration_ms.max(min_duration_ms);
        for dot in &mut self.dots {
            let duration = rng.gen_range(min_duration_ms..=hi);
            dot.slide(direction, distance, duration, now_ms);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.dots.clear();
    }

    pub(crate) fn fade_out(&mut self, now_ms: u64) {
        let from = self.opacity(now_ms);
        self.fade = Some(Fade {
            from,
            to: 0.0,
            started_at: now_ms,
            duration_ms: self.fade_ms,
        });
    }

    pub(crate) fn opacity(&self, now_ms: u64) -> f32 {
        match self.fade {
            Some(f) => {
                let t = progress(f.started_at, f.duration_ms, now_ms);
                f.from + (f.to - f.from) * t
            }
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn reflects_at_left_edge() {
        let mut dot = Dot::new(0.0, 10.0, -0.5, 0.0, 1.0);
        dot.update(100.0, 50.0);
        assert_eq!(dot.vx, 0.5);
    }

    #[test]
    fn reflects_at_right_edge() {
        let mut dot = Dot::new(100.0, 10.0, 0.5, 0.0, 1.0);
        dot.update(100.0, 50.0);
        assert_eq!(dot.vx, -0.5);
    }

    #[test]
    fn reflects_vertically() {
        let mut dot = Dot::new(10.0, 50.0, 0.0, 0.25, 1.0);
        dot.update(100.0, 50.0);
        assert_eq!(dot.vy, -0.25);
        let mut dot = Dot::new(10.0, 0.0, 0.0, -0.25, 1.0);
        dot.update(100.0, 50.0);
        assert_eq!(dot.vy, 0.25);
    }

    #[test]
    fn interior_dot_keeps_velocity() {
        let mut dot = Dot::new(40.0, 20.0, 0.5, -0.5, 1.0);
        dot.update(100.0, 50.0);
        assert_eq!((dot.x, dot.y), (40.5, 19.5));
        assert_eq!((dot.vx, dot.vy), (0.5, -0.5));
    }

    #[test]
    fn generate_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut field = ParticleField::new(120.0, 80.0, 3000);
        field.generate(200, false, 0, &mut rng);
        assert_eq!(field.dots().len(), 200);
        for d in field.dots() {
            assert!((0.0..120.0).contains(&d.x));
            assert!((0.0..80.0).contains(&d.y));
            assert!((1.0..3.0).contains(&d.radius));
            assert!(d.vx > -0.011 && d.vx < 0.091);
        }
        assert_eq!(field.opacity(0), 1.0);
    }

    #[test]
    fn fade_in_and_out() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = ParticleField::new(10.0, 10.0, 3000);
        field.generate(3, true, 1000, &mut rng);
        assert_eq!(field.opacity(1000), 0.0);
        assert_eq!(field.opacity(2500), 0.5);
        assert_eq!(field.opacity(4000), 1.0);
        field.fade_out(5000);
        assert_eq!(field.opacity(5000), 1.0);
        assert_eq!(field.opacity(8000), 0.0);
    }

    #[test]
    fn slide_uses_ease_out_and_lands_exactly() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut field = ParticleField::new(100.0, 100.0, 3000);
        field.dots_mut().push(Dot::new(50.0, 50.0, 0.0, 0.0, 1.0));
        field.slide_all(Direction::Up, 40.0, 1000, 1000, 0, &mut rng);
        field.frame(500);
        let expected = 50.0 - 40.0 * ease_out_cubic(0.5);
        assert!((field.dots()[0].y - expected).abs() < 1e-4);
        field.frame(1000);
        assert!((field.dots()[0].y - 10.0).abs() < 1e-4);
        assert!(!field.dots()[0].is_sliding());
    }

    #[test]
    fn slide_durations_are_drawn_per_dot() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut field = ParticleField::new(100.0, 100.0, 3000);
        for _ in 0..20 {
            field.dots_mut().push(Dot::new(50.0, 50.0, 0.0, 0.0, 1.0));
        }
        let right: Direction = "right".parse().unwrap();
        field.slide_all(right, 10.0, 500, 1000, 0, &mut rng);
        field.frame(500);
        let xs: Vec<f32> = field.dots().iter().map(|d| d.x).collect();
        assert!(xs.iter().any(|x| (x - xs[0]).abs() > 1e-3));
        field.frame(1000);
        assert!(field.dots().iter().all(|d| (d.x - 60.0).abs() < 1e-4));
    }

    #[test]
    fn direction_names() {
        assert_eq!("U".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);
        assert_eq!("l".parse::<Direction>().unwrap(), Direction::Left);
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"sideways\" is not a valid direction. Allowed directions include: u, d, l, r."
        );
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn resize_rescatters_and_clear_empties() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut field = ParticleField::new(1000.0, 1000.0, 3000);
        field.generate(30, false, 0, &mut rng);
        field.resize(20.0, 10.0, &mut rng);
        assert_eq!(field.size(), (20.0, 10.0));
        assert!(field.dots().iter().all(|d| d.x < 20.0 && d.y < 10.0));
        field.clear();
        assert!(field.dots().is_empty());
    }
}
