use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 192_000.0;

// 18550 would hit the amplifier's full 3.3 V peak-to-peak input.
pub const DEFAULT_AMPLITUDE: f64 = 17_750.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    pub start_freq_hz: f64,
    pub end_freq_hz: f64,
    pub duration_s: f64,
    pub sample_rate_hz: f64,
}

impl SweepSpec {
    pub fn num_samples(&self) -> usize {
        (self.duration_s * self.sample_rate_hz).round() as usize
    }
}

impl Default for SweepSpec {
    fn default() -> Self {
        SWEEP_PRESETS[0].spec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPreset {
    pub start_freq_hz: f64,
    pub end_freq_hz: f64,
    pub duration_s: f64,
}

impl SweepPreset {
    pub fn spec(&self) -> SweepSpec {
        SweepSpec {
            start_freq_hz: self.start_freq_hz,
            end_freq_hz: self.end_freq_hz,
            duration_s: self.duration_s,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

pub const SWEEP_PRESETS: &[SweepPreset] = &[
    SweepPreset {
        start_freq_hz: 18_000.0,
        end_freq_hz: 34_000.0,
        duration_s: 0.004,
    },
    SweepPreset {
        start_freq_hz: 7_000.0,
        end_freq_hz: 17_000.0,
        duration_s: 0.004,
    },
    SweepPreset {
        start_freq_hz: 12_000.0,
        end_freq_hz: 24_000.0,
        duration_s: 0.004,
    },
    SweepPreset {
        start_freq_hz: 4_000.0,
        end_freq_hz: 10_000.0,
        duration_s: 0.004,
    },
    SweepPreset {
        start_freq_hz: 48_000.0,
        end_freq_hz: 78_000.0,
        duration_s: 0.004,
    },
];

pub fn preset_spec(index: usize) -> Option<SweepSpec> {
    SWEEP_PRESETS.get(index).map(SweepPreset::spec)
}

pub fn next_preset_index(current: usize) -> usize {
    (current + 1) % SWEEP_PRESETS.len()
}

pub fn valid_amplitude(amplitude: f64) -> bool {
    amplitude > 0.0 && amplitude < 32_768.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_table_has_five_entries() {
        assert_eq!(SWEEP_PRESETS.len(), 5);
        for preset in SWEEP_PRESETS {
            assert!(preset.start_freq_hz > 0.0);
            assert!(preset.end_freq_hz > preset.start_freq_hz);
            assert_eq!(preset.duration_s, 0.004);
        }
    }

    #[test]
    fn preset_spec_fills_in_device_sample_rate() {
        let spec = preset_spec(1).unwrap();
        assert_eq!(spec.start_freq_hz, 7_000.0);
        assert_eq!(spec.end_freq_hz, 17_000.0);
        assert_eq!(spec.sample_rate_hz, DEFAULT_SAMPLE_RATE_HZ);
    }

    #[test]
    fn preset_spec_rejects_out_of_range_index() {
        assert!(preset_spec(SWEEP_PRESETS.len()).is_none());
    }

    #[test]
    fn preset_cycling_wraps_around() {
        assert_eq!(next_preset_index(0), 1);
        assert_eq!(next_preset_index(SWEEP_PRESETS.len() - 1), 0);
    }

    #[test]
    fn device_presets_produce_768_samples() {
        for index in 0..SWEEP_PRESETS.len() {
            assert_eq!(preset_spec(index).unwrap().num_samples(), 768);
        }
    }

    #[test]
    fn default_amplitude_leaves_int16_headroom() {
        assert!(DEFAULT_AMPLITUDE < 32_768.0);
    }

    #[test]
    fn amplitude_range_excludes_zero_and_full_scale() {
        assert!(valid_amplitude(DEFAULT_AMPLITUDE));
        assert!(valid_amplitude(32_767.9));
        assert!(!valid_amplitude(0.0));
        assert!(!valid_amplitude(-17_750.0));
        assert!(!valid_amplitude(32_768.0));
        assert!(!valid_amplitude(f64::NAN));
    }
}
