use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use anyhow::Result;
use hound::{WavSpec, WavWriter};
use sweepgen_shared_protocol::SweepSpec;

use crate::synth::{synthesize_pcm, SweepWaveform};

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

pub fn sweep_wav_bytes(spec: &SweepSpec, amplitude: f64) -> Result<Vec<u8>> {
    let wave = synthesize_pcm(spec, amplitude)?;
    let mut cursor = Cursor::new(Vec::new());
    let writer = WavWriter::new(&mut cursor, wav_spec(spec.sample_rate_hz as u32))?;
    write_frames(writer, &wave)?;
    Ok(cursor.into_inner())
}

pub fn write_sweep_wav(
    path: impl AsRef<Path>,
    spec: &SweepSpec,
    amplitude: f64,
) -> Result<SweepWaveform> {
    let path = path.as_ref();
    let wave = synthesize_pcm(spec, amplitude)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = WavWriter::create(path, wav_spec(spec.sample_rate_hz as u32))?;
    write_frames(writer, &wave)?;
    Ok(wave)
}

fn write_frames<W: Write + Seek>(mut writer: WavWriter<W>, wave: &SweepWaveform) -> Result<()> {
    for &sample in &wave.samples {
        writer.write_sample(sample)?;
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
