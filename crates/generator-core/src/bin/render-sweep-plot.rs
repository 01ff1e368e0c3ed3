use std::fs;
use std::path::PathBuf;

use sweepgen_generator_core::plot::{render_sweep_plot_png, PlotStyle};
use sweepgen_generator_core::synth::{
    sweep_samples, synthesize_pcm, PhaseNormalization, SweepWaveform, Waveform,
};
use sweepgen_shared_protocol::{preset_spec, DEFAULT_AMPLITUDE, SWEEP_PRESETS};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: render-sweep-plot <output_path> [preset_index] [start|end] [cos|sin]");
        std::process::exit(1);
    }
    let path = PathBuf::from(&args[1]);
    let preset_index: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    let normalization = match args.get(3).map(String::as_str) {
        Some("start") | None => PhaseNormalization::ZeroAtStart,
        Some("end") => PhaseNormalization::ZeroAtEnd,
        Some(other) => {
            eprintln!("unknown normalization {other:?}, expected start or end");
            std::process::exit(1);
        }
    };
    let waveform = match args.get(4).map(String::as_str) {
        Some("cos") | None => Waveform::Cosine,
        Some("sin") => Waveform::Sine,
        Some(other) => {
            eprintln!("unknown waveform {other:?}, expected cos or sin");
            std::process::exit(1);
        }
    };

    let Some(spec) = preset_spec(preset_index) else {
        eprintln!(
            "preset {} does not exist, pick 0-{}",
            preset_index,
            SWEEP_PRESETS.len() - 1
        );
        std::process::exit(1);
    };

    let wave = match (normalization, waveform) {
        (PhaseNormalization::ZeroAtStart, Waveform::Cosine) => {
            synthesize_pcm(&spec, DEFAULT_AMPLITUDE)?
        }
        _ => {
            let n = spec.num_samples();
            let values = sweep_samples(
                n,
                0.0,
                spec.duration_s,
                spec.start_freq_hz,
                spec.end_freq_hz,
                normalization,
                waveform,
            )?;
            let times = (0..n).map(|i| i as f64 / spec.sample_rate_hz).collect();
            let samples = values
                .iter()
                .map(|v| (DEFAULT_AMPLITUDE * v).floor().clamp(-32_768.0, 32_767.0) as i16)
                .collect();
            SweepWaveform { times, samples }
        }
    };

    let style = PlotStyle::default();
    let png = render_sweep_plot_png(&spec, &wave, style.clone())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &png)?;
    println!(
        "Wrote a {}x{} sweep plot to {}",
        style.width,
        style.height,
        path.display()
    );
    Ok(())
}
