use serde::{Deserialize, Serialize};

use crate::sweep::SweepSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    ToggleRun,
    NextSweep,
    SelectSweep { index: usize },
    ToggleMode,
    Shutdown,
}

// Pulsed replays one sweep per timer tick; Continuous loops the armed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    Pulsed,
    Continuous,
}

impl PlayMode {
    pub fn toggled(self) -> Self {
        match self {
            PlayMode::Pulsed => PlayMode::Continuous,
            PlayMode::Continuous => PlayMode::Pulsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorStatus {
    pub running: bool,
    pub mode: PlayMode,
    pub sweep_index: usize,
    pub spec: SweepSpec,
    pub elapsed_s: u64,
}

impl GeneratorStatus {
    pub fn elapsed_min_sec(&self) -> (u64, u64) {
        (self.elapsed_s / 60, self.elapsed_s % 60)
    }
}

impl Default for GeneratorStatus {
    fn default() -> Self {
        Self {
            running: false,
            mode: PlayMode::Pulsed,
            sweep_index: 0,
            spec: SweepSpec::default(),
            elapsed_s: 0,
        }
    }
}
