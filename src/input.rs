use crate::vitals::VitalKind;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Selector,
    Game,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    ToggleTheme,
    Browse(i32),
    Adopt,
    Increase(VitalKind),
    Dismiss { col: u16, row: u16 },
}

#[derive(Clone, Debug)]
pub(crate) enum InputEvent {
    Key { key: KeyCode, mods: KeyModifiers },
    Click { col: u16, row: u16 },
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        let ev = match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press => InputEvent::Key {
                key: k.code,
                mods: k.modifiers,
            },
            Event::Mouse(m) if m.kind == MouseEventKind::Down(MouseButton::Left) => InputEvent::Click {
                col: m.column,
                row: m.row,
            },
            _ => continue,
        };
        out.push(ev);
        if out.len() >= 32 {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, ev: &InputEvent) -> Option<Action> {
    let (key, mods) = match *ev {
        InputEvent::Key { key, mods } => (key, mods),
        InputEvent::Click { col, row } => {
            return (scene == Scene::Game).then_some(Action::Dismiss { col, row });
        }
    };
    if matches!(key, KeyCode::Char('c')) && mods.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Some(Action::Quit),
        KeyCode::Char('t') | KeyCode::Char('T') => return Some(Action::ToggleTheme),
        _ => {}
    }

    match scene {
        Scene::Selector => match key {
            KeyCode::Left | KeyCode::Char('h') => Some(Action::Browse(-1)),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::Browse(1)),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Adopt),
            _ => None,
        },
        Scene::Game => match key {
            KeyCode::Char(ch) => VitalKind::ALL
                .into_iter()
                .find(|k| k.key() == ch)
                .map(Action::Increase),
            _ => None,
        },
    }
}
