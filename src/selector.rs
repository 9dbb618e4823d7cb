use crate::background::{Direction, ParticleField};
use crate::catalog::{AdoptedPet, Pet};
use crate::model::SelectorTimings;
use crate::storage::{KeyValueStore, Session};
use rand::Rng;
use std::sync::mpsc::{self, Receiver, Sender};

const SMALL_DRIFT: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Narration {
    Showing { line: usize, until: u64 },
    Gap { line: usize, until: u64 },
    Closing { until: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SelectorPhase {
    Browsing,
    AnimatingSelection {
        pet: usize,
        slide_out_at: u64,
        narrate_at: u64,
        sliding_out: bool,
    },
    Narrating { pet: usize, step: Narration },
    Done { pet: usize },
}

/// Receiving half of the one-shot completion signal.
pub(crate) struct Selection {
    rx: Receiver<usize>,
}

impl Selection {
    /// The chosen catalog index, delivered exactly once.
    pub(crate) fn try_take(&self) -> Option<usize> {
        self.rx.try_recv().ok()
    }
}

pub(crate) struct PetSelector {
    pets: Vec<Pet>,
    timings: SelectorTimings,
    drift: Direction,
    cursor: usize,
    phase: SelectorPhase,
    notify: Option<Sender<usize>>,
}

impl PetSelector {
    pub(crate) fn new(pets: Vec<Pet>, timings: SelectorTimings, drift: Direction) -> (Self, Selection) {
        let (tx, rx) = mpsc::channel();
        let selector = Self {
            pets,
            timings,
            drift,
            cursor: 0,
            phase: SelectorPhase::Browsing,
            notify: Some(tx),
        };
        (selector, Selection { rx })
    }

    pub(crate) fn pets(&self) -> &[Pet] {
        &self.pets
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn phase(&self) -> SelectorPhase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn done(&self) -> bool {
        matches!(self.phase, SelectorPhase::Done { .. })
    }

    #[cfg(test)]
    pub(crate) fn selected_pet_id(&self) -> Option<usize> {
        match self.phase {
            SelectorPhase::Done { pet } => Some(pet),
            _ => None,
        }
    }

    pub(crate) fn move_cursor(&mut self, delta: i32) {
        if self.phase != SelectorPhase::Browsing || self.pets.is_empty() {
            return;
        }
        let len = self.pets.len() as i32;
        self.cursor = (self.cursor as i32 + delta).rem_euclid(len) as usize;
    }

    /// Adopts the pet under the cursor. Ignored once a choice is made.
    pub(crate) fn adopt<S: KeyValueStore>(
        &mut self,
        now_ms: u64,
        session: &mut Session<S>,
    ) -> Option<AdoptedPet> {
        if self.phase != SelectorPhase::Browsing {
            return None;
        }
        let id = self.cursor;
        let pet = self.pets.get(id)?;
        let adopted = AdoptedPet::from_catalog(id, pet);
        session.set_adopted_pet(&adopted);

        let slide_out_at = now_ms + self.timings.isolate_ms;
        self.phase = SelectorPhase::AnimatingSelection {
            pet: id,
            slide_out_at,
            narrate_at: slide_out_at + self.timings.slide_out_ms,
            sliding_out: false,
        };
        let intro_ms = self.timings.total_ms(self.intro_len(id));
        tracing::info!(pet = %adopted.name, id, intro_ms, "pet adopted");
        Some(adopted)
    }

    /// The intro line currently on screen, if any.
    pub(crate) fn current_line(&self) -> Option<&str> {
        match self.phase {
            SelectorPhase::Narrating {
                pet,
                step: Narration::Showing { line, .. },
            } => self.pets.get(pet)?.intro.get(line).map(String::as_str),
            _ => None,
        }
    }

    /// Runs every transition that is due by `now_ms`. Each deadline is
    /// chained from the previous one, so late polling does not stretch
    /// the sequence.
    pub(crate) fn advance<R: Rng>(&mut self, now_ms: u64, bg: &mut ParticleField, rng: &mut R) {
        loop {
            let next = match self.phase {
                SelectorPhase::Browsing | SelectorPhase::Done { .. } => return,
                SelectorPhase::AnimatingSelection {
                    pet,
                    slide_out_at,
                    narrate_at,
                    sliding_out,
                } => {
                    if !sliding_out && now_ms >= slide_out_at {
                        bg.slide_all(self.drift, SMALL_DRIFT, 500, 1000, slide_out_at, rng);
                        SelectorPhase::AnimatingSelection {
                            pet,
                            slide_out_at,
                            narrate_at,
                            sliding_out: true,
                        }
                    } else if sliding_out && now_ms >= narrate_at {
                        SelectorPhase::Narrating {
                            pet,
                            step: self.first_step(pet, narrate_at),
                        }
                    } else {
                        return;
                    }
                }
                SelectorPhase::Narrating { pet, step } => match step {
                    Narration::Showing { line, until } if now_ms >= until => {
                        let last = line + 1 >= self.intro_len(pet);
                        if last {
                            let (_, h) = bg.size();
                            bg.slide_all(self.drift, h, 2000, 3000, until, rng);
                        } else {
                            bg.slide_all(self.drift, SMALL_DRIFT, 500, 1000, until, rng);
                        }
                        SelectorPhase::Narrating {
                            pet,
                            step: Narration::Gap {
                                line,
                                until: until + self.timings.line_gap_ms,
                            },
                        }
                    }
                    Narration::Gap { line, until } if now_ms >= until => {
                        let step = if line + 1 < self.intro_len(pet) {
                            Narration::Showing {
                                line: line + 1,
                                until: until + self.timings.line_hold_ms,
                            }
                        } else {
                            Narration::Closing {
                                until: until + self.timings.final_delay_ms,
                            }
                        };
                        SelectorPhase::Narrating { pet, step }
                    }
                    Narration::Closing { until } if now_ms >= until => {
                        self.finish(pet);
                        SelectorPhase::Done { pet }
                    }
                    _ => return,
                },
            };
            self.phase = next;
        }
    }

    fn intro_len(&self, pet: usize) -> usize {
        self.pets.get(pet).map_or(0, |p| p.intro.len())
    }

    fn first_step(&self, pet: usize, at: u64) -> Narration {
        if self.intro_len(pet) == 0 {
            Narration::Closing {
                until: at + self.timings.final_delay_ms,
            }
        } else {
            Narration::Showing {
                line: 0,
                until: at + self.timings.line_hold_ms,
            }
        }
    }

    fn finish(&mut self, pet: usize) {
        if let Some(tx) = self.notify.take() {
            // receiver may already be gone
            let _ = tx.send(pet);
        }
        tracing::info!(pet, "selection complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DefaultStats, PlanetImage};
    use crate::storage::MemoryStore;
    use rand::{rngs::StdRng, SeedableRng};

    fn pet(name: &str, lines: usize) -> Pet {
        Pet {
            name: name.to_string(),
            image: PlanetImage {
                base: [1, 2, 3],
                accent: [4, 5, 6],
                ocean: [7, 8, 9],
                atmosphere: [10, 11, 12],
                rings: false,
                seed: 1,
                roughness: 0.5,
                bands: 0.5,
                clouds: 0.5,
                ice: 0.0,
            },
            description: format!("{name} description"),
            default_stats: DefaultStats {
                stability: 80.0,
                energy: 80.0,
                strength: 80.0,
            },
            intro: (0..lines).map(|i| format!("{name} line {i}")).collect(),
        }
    }

    fn setup(lines: usize) -> (PetSelector, Selection, ParticleField, StdRng) {
        let mut rng = StdRng::seed_from_u64(2);
        let mut bg = ParticleField::new(100.0, 60.0, 3000);
        bg.generate(10, false, 0, &mut rng);
        let (sel, rx) = PetSelector::new(
            vec![pet("Alpha", lines), pet("Beta", lines)],
            SelectorTimings::default(),
            Direction::Up,
        );
        (sel, rx, bg, rng)
    }

    #[test]
    fn select_second_pet_end_to_end() {
        let (mut sel, rx, mut bg, mut rng) = setup(3);
        let mut session = Session::new(MemoryStore::default());
        sel.move_cursor(1);
        let adopted = sel.adopt(10_000, &mut session).unwrap();
        assert_eq!(adopted.id, 1);
        assert_eq!(session.adopted_pet(), Some(adopted));

        let total = SelectorTimings::default().total_ms(3);
        sel.advance(10_000 + total - 1, &mut bg, &mut rng);
        assert!(!sel.done());
        assert_eq!(rx.try_take(), None);

        sel.advance(10_000 + total, &mut bg, &mut rng);
        assert!(sel.done());
        assert_eq!(sel.selected_pet_id(), Some(1));
        assert_eq!(rx.try_take(), Some(1));
        assert_eq!(rx.try_take(), None);
    }

    #[test]
    fn narration_walks_every_line_in_order() {
        let (mut sel, _rx, mut bg, mut rng) = setup(2);
        let mut session = Session::new(MemoryStore::default());
        sel.adopt(0, &mut session);
        let mut seen: Vec<String> = Vec::new();
        let mut now = 0;
        while !sel.done() {
            now += 100;
            sel.advance(now, &mut bg, &mut rng);
            if let Some(line) = sel.current_line() {
                if seen.last().map(String::as_str) != Some(line) {
                    seen.push(line.to_string());
                }
            }
        }
        assert_eq!(seen, vec!["Alpha line 0", "Alpha line 1"]);
        assert_eq!(now, SelectorTimings::default().total_ms(2));
    }

    #[test]
    fn gallery_locks_after_adopting() {
        let (mut sel, _rx, _bg, _rng) = setup(1);
        let mut session = Session::new(MemoryStore::default());
        sel.move_cursor(-1);
        assert_eq!(sel.cursor(), 1);
        assert!(sel.adopt(0, &mut session).is_some());
        sel.move_cursor(1);
        assert_eq!(sel.cursor(), 1);
        assert!(sel.adopt(5, &mut session).is_none());
    }

    #[test]
    fn background_drifts_when_card_slides_out() {
        let (mut sel, _rx, mut bg, mut rng) = setup(1);
        let mut session = Session::new(MemoryStore::default());
        sel.adopt(0, &mut session);
        sel.advance(1_999, &mut bg, &mut rng);
        assert!(bg.dots().iter().all(|d| !d.is_sliding()));
        sel.advance(2_000, &mut bg, &mut rng);
        assert!(bg.dots().iter().all(|d| d.is_sliding()));
        assert!(matches!(
            sel.phase(),
            SelectorPhase::AnimatingSelection { sliding_out: true, .. }
        ));
    }

    #[test]
    fn empty_intro_still_completes() {
        let (mut sel, rx, mut bg, mut rng) = setup(0);
        let mut session = Session::new(MemoryStore::default());
        sel.adopt(0, &mut session);
        sel.advance(SelectorTimings::default().total_ms(0), &mut bg, &mut rng);
        assert_eq!(rx.try_take(), Some(0));
    }
}
