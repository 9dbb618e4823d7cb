use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) dot_count: usize,
    pub(crate) seed: u64,
    pub(crate) asteroid_probability: f32,
    pub(crate) drift_direction: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 30,
            enable_color: true,
            dot_count: 50,
            seed: 0xC0FFEE_u64,
            asteroid_probability: 0.05,
            drift_direction: "up".to_string(),
        }
    }
}

pub(crate) struct Paths {
    pub(crate) store_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

impl Paths {
    pub(crate) fn in_dir(dir: &Path) -> Self {
        Self {
            store_path: dir.join("store.json"),
            settings_path: dir.join("settings.json"),
            log_path: dir.join("planetarium.log"),
        }
    }
}

pub(crate) fn project_paths(override_dir: Option<&Path>) -> Result<Paths> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => ProjectDirs::from("com", "planetarium", "Planetarium")
            .context("could not resolve project directories")?
            .data_local_dir()
            .to_path_buf(),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create data directory {}", dir.display()))?;
    Ok(Paths::in_dir(&dir))
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v,
            Err(err) => tracing::warn!(%err, "settings unreadable, using defaults"),
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> crate::error::Result<()> {
    // rename over an existing file is not atomic on Windows
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_give_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(&dir.path().join("nope.json"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_settings_keep_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "dot_count": 120 }"#).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.dot_count, 120);
        assert_eq!(s.fps_cap, 30);
    }

    #[test]
    fn settings_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = project_paths(Some(dir.path())).unwrap();
        let s = Settings {
            fps_cap: 60,
            enable_color: false,
            ..Settings::default()
        };
        save_settings_atomic(&paths.settings_path, &s).unwrap();
        assert_eq!(load_settings(&paths.settings_path), s);
    }
}
