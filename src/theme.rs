use crossterm::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Palette {
    pub(crate) bg: Color,
    pub(crate) fg: Color,
    pub(crate) dim: Color,
    pub(crate) highlight: Color,
    pub(crate) dot: (u8, u8, u8),
    pub(crate) dot_glow: (u8, u8, u8),
}

impl Theme {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Unknown names fall back to the default theme.
    pub(crate) fn from_name(name: &str) -> Self {
        match name.trim() {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub(crate) fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub(crate) fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                bg: Color::Rgb { r: 6, g: 7, b: 12 },
                fg: Color::Rgb { r: 210, g: 220, b: 235 },
                dim: Color::Rgb { r: 120, g: 130, b: 150 },
                highlight: Color::Rgb { r: 255, g: 220, b: 120 },
                dot: (200, 210, 255),
                dot_glow: (90, 110, 200),
            },
            Theme::Light => Palette {
                bg: Color::Rgb { r: 236, g: 234, b: 226 },
                fg: Color::Rgb { r: 30, g: 32, b: 40 },
                dim: Color::Rgb { r: 110, g: 110, b: 120 },
                highlight: Color::Rgb { r: 170, g: 80, b: 20 },
                dot: (60, 70, 110),
                dot_glow: (150, 160, 200),
            },
        }
    }
}
