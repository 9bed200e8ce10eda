use serde::{Deserialize, Serialize};

use crate::error::StudyError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FocusStatus {
    Idle,
    Running,
    Stopped,
}

impl Default for FocusStatus {
    fn default() -> Self {
        FocusStatus::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Counters as seen at one instant. Frozen once the tracker is stopped.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub status: FocusStatus,
    pub elapsed_seconds: u64,
    pub distraction_count: u32,
    pub nudges_emitted: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub elapsed_seconds: u64,
    /// True exactly when this tick landed on a nudge-interval multiple.
    pub nudge: bool,
}

/// Misuse is a programming error: fatal in debug builds, logged and ignored in
/// release builds.
pub(crate) fn report_misuse(message: &str) -> StudyError {
    log::error!("focus tracker misuse: {message}");
    debug_assert!(false, "focus tracker misuse: {message}");
    StudyError::TrackerMisuse(message.to_string())
}

#[derive(Debug, Clone)]
pub struct FocusState {
    pub status: FocusStatus,
    pub elapsed_seconds: u64,
    pub distraction_count: u32,
    pub nudges_emitted: u32,
    nudge_interval_secs: u64,
    visibility: Visibility,
}

impl FocusState {
    pub fn new(nudge_interval_secs: u64) -> Self {
        Self {
            status: FocusStatus::Idle,
            elapsed_seconds: 0,
            distraction_count: 0,
            nudges_emitted: 0,
            nudge_interval_secs,
            visibility: Visibility::Visible,
        }
    }

    pub fn start(&mut self) -> Result<(), StudyError> {
        match self.status {
            FocusStatus::Idle => {
                self.status = FocusStatus::Running;
                self.visibility = Visibility::Visible;
                Ok(())
            }
            FocusStatus::Running => Err(report_misuse("start() called while already running")),
            FocusStatus::Stopped => Err(report_misuse("start() called on a stopped tracker")),
        }
    }

    /// Applies one elapsed second. Ignored unless running.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.status != FocusStatus::Running {
            return None;
        }

        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        let nudge = self.nudge_interval_secs > 0
            && self.elapsed_seconds % self.nudge_interval_secs == 0;
        if nudge {
            self.nudges_emitted = self.nudges_emitted.saturating_add(1);
        }

        Some(TickOutcome {
            elapsed_seconds: self.elapsed_seconds,
            nudge,
        })
    }

    /// Records a foreground change. Returns the new distraction count when the
    /// change was a foreground-to-background transition.
    pub fn visibility(&mut self, visibility: Visibility) -> Option<u32> {
        if self.status != FocusStatus::Running {
            return None;
        }

        let went_hidden =
            self.visibility == Visibility::Visible && visibility == Visibility::Hidden;
        self.visibility = visibility;

        if went_hidden {
            self.distraction_count = self.distraction_count.saturating_add(1);
            Some(self.distraction_count)
        } else {
            None
        }
    }

    /// Freezes the counters. Repeated calls return the same snapshot.
    pub fn stop(&mut self) -> FocusSnapshot {
        match self.status {
            FocusStatus::Running => self.status = FocusStatus::Stopped,
            FocusStatus::Stopped => {}
            FocusStatus::Idle => {
                log::warn!("stopping a focus tracker that never started");
                self.status = FocusStatus::Stopped;
            }
        }
        self.current()
    }

    /// Counters for display or flushing. Reading before `start()` is misuse;
    /// release builds get zeroed counters.
    pub fn snapshot(&self) -> FocusSnapshot {
        if self.status == FocusStatus::Idle {
            let _ = report_misuse("counters read before start()");
        }
        self.current()
    }

    fn current(&self) -> FocusSnapshot {
        FocusSnapshot {
            status: self.status,
            elapsed_seconds: self.elapsed_seconds,
            distraction_count: self.distraction_count,
            nudges_emitted: self.nudges_emitted,
        }
    }
}
