use std::path::PathBuf;

use sweepgen_generator_core::export::write_sweep_wav;
use sweepgen_shared_protocol::{
    preset_spec, DEFAULT_AMPLITUDE, DEFAULT_SAMPLE_RATE_HZ, SWEEP_PRESETS,
};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: generate-sweep-wav <output_path> [preset_index] [sample_rate] [amplitude]");
        std::process::exit(1);
    }
    let path = PathBuf::from(&args[1]);
    let preset_index: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    let sample_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE_HZ);
    let amplitude: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_AMPLITUDE);

    let Some(mut spec) = preset_spec(preset_index) else {
        eprintln!(
            "preset {} does not exist, pick 0-{}",
            preset_index,
            SWEEP_PRESETS.len() - 1
        );
        std::process::exit(1);
    };
    spec.sample_rate_hz = sample_rate;

    let wave = write_sweep_wav(&path, &spec, amplitude)?;
    println!(
        "Wrote a {:.0} Hz to {:.0} Hz sweep ({} samples at {:.0} Hz) to {}",
        spec.start_freq_hz,
        spec.end_freq_hz,
        wave.samples.len(),
        spec.sample_rate_hz,
        path.display()
    );
    Ok(())
}
