use std::f64::consts::TAU;

use sweepgen_shared_protocol::{valid_amplitude, SweepSpec};
use thiserror::Error;

// About 22 seconds at the 192 kHz device rate; refused before allocating.
pub const MAX_SWEEP_SAMPLES: usize = 1 << 22;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("degenerate time interval: start and end instants are equal")]
    DegenerateInterval,
    #[error("a sweep needs at least two sample points, got {0}")]
    TooFewSamples(usize),
    #[error("duration must be greater than zero, got {0}")]
    NonPositiveDuration(f64),
    #[error("sample rate must be greater than zero, got {0}")]
    NonPositiveSampleRate(f64),
    #[error("sweep frequencies must be greater than zero, got {start} -> {end}")]
    NonPositiveFrequency { start: f64, end: f64 },
    #[error("sweep of {0} samples exceeds the {MAX_SWEEP_SAMPLES} sample cap")]
    TooManySamples(usize),
    #[error("amplitude {0} is outside the int16 output range")]
    AmplitudeOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseNormalization {
    ZeroAtStart,
    ZeroAtEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Cosine,
    Sine,
}

pub fn sweep_phase(
    n: usize,
    t_min: f64,
    t_max: f64,
    f_min: f64,
    f_max: f64,
) -> Result<Vec<f64>, SweepError> {
    if n < 2 {
        return Err(SweepError::TooFewSamples(n));
    }
    if t_min == t_max {
        return Err(SweepError::DegenerateInterval);
    }
    // f(t) = a*t + b is the line through (t_min, f_min) and (t_max, f_max);
    // phase is the integral of 2π f(t) from t_min.
    let a = (f_min - f_max) / (t_min - t_max);
    let b = (f_min * t_max - f_max * t_min) / (t_max - t_min);
    let span = t_max - t_min;
    let steps = (n - 1) as f64;
    let phase = (0..n)
        .map(|i| {
            let t = t_min + span * (i as f64 / steps);
            TAU * (0.5 * a * (t * t - t_min * t_min) + b * (t - t_min))
        })
        .collect();
    Ok(phase)
}

pub fn normalized_sweep_phase(
    n: usize,
    t_min: f64,
    t_max: f64,
    f_min: f64,
    f_max: f64,
    normalization: PhaseNormalization,
) -> Result<Vec<f64>, SweepError> {
    let mut phase = sweep_phase(n, t_min, t_max, f_min, f_max)?;
    let last = phase[n - 1];
    let remainder = last.rem_euclid(TAU);
    match normalization {
        PhaseNormalization::ZeroAtStart => {
            // A phase that already ends on a whole cycle would divide by zero here.
            if last != 0.0 {
                let factor = (last - remainder) / last;
                for p in phase.iter_mut() {
                    *p *= factor;
                }
            }
        }
        PhaseNormalization::ZeroAtEnd => {
            for p in phase.iter_mut() {
                *p -= remainder;
            }
        }
    }
    Ok(phase)
}

pub fn sweep_samples(
    n: usize,
    t_min: f64,
    t_max: f64,
    f_min: f64,
    f_max: f64,
    normalization: PhaseNormalization,
    waveform: Waveform,
) -> Result<Vec<f64>, SweepError> {
    let phase = normalized_sweep_phase(n, t_min, t_max, f_min, f_max, normalization)?;
    let samples = phase
        .into_iter()
        .map(|p| match waveform {
            Waveform::Cosine => p.cos(),
            Waveform::Sine => p.sin(),
        })
        .collect();
    Ok(samples)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepWaveform {
    pub times: Vec<f64>,
    pub samples: Vec<i16>,
}

// The buffer is mono; sinks duplicate each sample across their output channels.
pub fn synthesize_pcm(spec: &SweepSpec, amplitude: f64) -> Result<SweepWaveform, SweepError> {
    validate(spec)?;
    if !valid_amplitude(amplitude) {
        return Err(SweepError::AmplitudeOutOfRange(amplitude));
    }
    let n = (spec.duration_s * spec.sample_rate_hz).round() as usize;
    if n > MAX_SWEEP_SAMPLES {
        return Err(SweepError::TooManySamples(n));
    }
    let raw = sweep_samples(
        n,
        0.0,
        spec.duration_s,
        spec.start_freq_hz,
        spec.end_freq_hz,
        PhaseNormalization::ZeroAtStart,
        Waveform::Cosine,
    )?;
    let times = (0..n).map(|i| i as f64 / spec.sample_rate_hz).collect();
    let samples = raw
        .into_iter()
        .map(|v| (amplitude * v).floor().clamp(-32_768.0, 32_767.0) as i16)
        .collect();
    Ok(SweepWaveform { times, samples })
}

fn validate(spec: &SweepSpec) -> Result<(), SweepError> {
    if !(spec.duration_s > 0.0) {
        return Err(SweepError::NonPositiveDuration(spec.duration_s));
    }
    if !(spec.sample_rate_hz > 0.0) {
        return Err(SweepError::NonPositiveSampleRate(spec.sample_rate_hz));
    }
    if !(spec.start_freq_hz > 0.0) || !(spec.end_freq_hz > 0.0) {
        return Err(SweepError::NonPositiveFrequency {
            start: spec.start_freq_hz,
            end: spec.end_freq_hz,
        });
    }
    Ok(())
}
