use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub channels: u16,
    pub min_sample_rate_hz: u32,
    pub max_sample_rate_hz: u32,
}

impl AudioDeviceInfo {
    pub fn supports_rate(&self, rate_hz: u32) -> bool {
        rate_hz >= self.min_sample_rate_hz && rate_hz <= self.max_sample_rate_hz
    }
}

pub trait DeviceLister: Send + Sync {
    fn list_output_devices(&self) -> Result<Vec<AudioDeviceInfo>>;
}

pub struct CpalDeviceLister;

impl DeviceLister for CpalDeviceLister {
    fn list_output_devices(&self) -> Result<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();
        let default_name = host
            .default_output_device()
            .and_then(|device| device.name().ok());

        let mut devices = Vec::new();
        for device in host.output_devices()? {
            let name = match device.name() {
                Ok(name) => name,
                Err(err) => {
                    warn!("skipping an output device with no readable name: {err}");
                    continue;
                }
            };
            let default_config = match device.default_output_config() {
                Ok(config) => config,
                Err(err) => {
                    warn!("skipping output device {name:?}: {err}");
                    continue;
                }
            };

            let mut min_rate = u32::MAX;
            let mut max_rate = 0;
            if let Ok(ranges) = device.supported_output_configs() {
                for range in ranges {
                    min_rate = min_rate.min(range.min_sample_rate().0);
                    max_rate = max_rate.max(range.max_sample_rate().0);
                }
            }
            if max_rate == 0 {
                min_rate = default_config.sample_rate().0;
                max_rate = min_rate;
            }

            devices.push(AudioDeviceInfo {
                is_default: Some(&name) == default_name.as_ref(),
                name,
                channels: default_config.channels(),
                min_sample_rate_hz: min_rate,
                max_sample_rate_hz: max_rate,
            });
        }
        Ok(devices)
    }
}

pub fn pick_output_device<'a>(
    devices: &'a [AudioDeviceInfo],
    configured: Option<&str>,
    rate_hz: u32,
) -> Option<&'a AudioDeviceInfo> {
    if let Some(name) = configured {
        match devices.iter().find(|d| d.name == name) {
            Some(found) => return Some(found),
            None => warn!("configured output device {name:?} not found, falling back"),
        }
    }
    devices
        .iter()
        .find(|d| d.is_default && d.supports_rate(rate_hz))
        .or_else(|| devices.iter().find(|d| d.supports_rate(rate_hz)))
        .or_else(|| devices.iter().find(|d| d.is_default))
        .or_else(|| devices.first())
}
