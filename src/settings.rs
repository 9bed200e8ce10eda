use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::db::models::HighlightColor;

const DEFAULT_NUDGE_INTERVAL_SECS: u64 = 300;
const DEBUG_NUDGE_INTERVAL_SECS: u64 = 10;
const DEFAULT_MIN_SESSION_SECS: u64 = 5;
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Tunables for the reading view. Defaults match the product behaviour; the
/// file only exists once someone changes a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudySettings {
    /// Seconds of study between confusion check-ins.
    pub nudge_interval_secs: u64,
    /// Sessions shorter than this are discarded instead of persisted.
    pub min_session_secs: u64,
    pub tick_interval_ms: u64,
    pub default_color: HighlightColor,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            nudge_interval_secs: DEFAULT_NUDGE_INTERVAL_SECS,
            min_session_secs: DEFAULT_MIN_SESSION_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            default_color: HighlightColor::Yellow,
        }
    }
}

impl StudySettings {
    /// `HIBISCUS_DEBUG=1` shortens the nudge cadence so the check-in prompt
    /// can be exercised by hand.
    pub fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var("HIBISCUS_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if debug_mode {
            self.nudge_interval_secs = DEBUG_NUDGE_INTERVAL_SECS;
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    study: StudySettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {}: {err}",
                        path.display()
                    );
                    UserSettings::default()
                }
            }
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn study(&self) -> StudySettings {
        self.read().study.clone()
    }

    pub fn update_study(&self, settings: StudySettings) -> Result<()> {
        let mut guard = self.write();
        guard.study = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
