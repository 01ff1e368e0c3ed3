use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use sweepgen_shared_protocol::{valid_amplitude, DEFAULT_AMPLITUDE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub device_name: String,
    pub output_device: Option<String>,
    pub amplitude: f64,
    pub sweep_index: usize,
    pub tick_seconds: u64,
    pub http_port: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            device_name: "sweepgen".to_string(),
            output_device: None,
            amplitude: DEFAULT_AMPLITUDE,
            sweep_index: 0,
            tick_seconds: 1,
            http_port: 5000,
        }
    }
}

impl DeviceSettings {
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            let mut settings: Self = serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse settings in {}", path.display()))?;
            if !valid_amplitude(settings.amplitude) {
                warn!(
                    "stored amplitude {} is outside the int16 range, using {DEFAULT_AMPLITUDE}",
                    settings.amplitude
                );
                settings.amplitude = DEFAULT_AMPLITUDE;
            }
            Ok(settings)
        } else {
            let settings = Self::default();
            settings.save(path)?;
            Ok(settings)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        fs::write(path, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdatePayload {
    pub device_name: Option<String>,
    pub output_device: Option<String>,
    pub amplitude: Option<f64>,
    pub sweep_index: Option<usize>,
    pub tick_seconds: Option<u64>,
}

impl SettingsUpdatePayload {
    pub fn apply(self, settings: &mut DeviceSettings) {
        if let Some(name) = self.device_name {
            settings.device_name = name;
        }
        if let Some(output) = self.output_device {
            settings.output_device = Some(output);
        }
        if let Some(amplitude) = self.amplitude {
            settings.amplitude = amplitude;
        }
        if let Some(index) = self.sweep_index {
            settings.sweep_index = index;
        }
        if let Some(tick) = self.tick_seconds {
            settings.tick_seconds = tick;
        }
    }
}

pub trait SettingsStore {
    fn current(&self) -> DeviceSettings;
    fn update(&self, update: SettingsUpdatePayload) -> Result<DeviceSettings>;
}

pub struct FileSettingsStore {
    path: PathBuf,
    settings: Mutex<DeviceSettings>,
}

impl FileSettingsStore {
    pub fn open(path: &Path) -> Result<Self> {
        let settings = DeviceSettings::load_or_create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            settings: Mutex::new(settings),
        })
    }
}

impl SettingsStore for FileSettingsStore {
    fn current(&self) -> DeviceSettings {
        self.settings.lock().unwrap().clone()
    }

    fn update(&self, update: SettingsUpdatePayload) -> Result<DeviceSettings> {
        let mut settings = self.settings.lock().unwrap();
        update.apply(&mut settings);
        settings.save(&self.path)?;
        Ok(settings.clone())
    }
}
