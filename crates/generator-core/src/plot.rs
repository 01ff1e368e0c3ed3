use std::io::Cursor;

use anyhow::{anyhow, bail, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use sweepgen_shared_protocol::SweepSpec;

use crate::synth::SweepWaveform;

// Defaults match the 320x240 panel the generator originally drove.
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub line: RGBColor,
    pub caption: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            background: WHITE,
            line: RED,
            caption: BLUE,
        }
    }
}

pub fn render_sweep_plot_png(
    spec: &SweepSpec,
    wave: &SweepWaveform,
    style: PlotStyle,
) -> Result<Vec<u8>> {
    if wave.times.len() != wave.samples.len() {
        bail!(
            "waveform times and samples disagree: {} vs {}",
            wave.times.len(),
            wave.samples.len()
        );
    }
    if wave.times.len() < 2 {
        bail!("waveform has too few samples to plot");
    }
    // t = 0 cannot sit on a log axis; the curve starts one sample in.
    let x_min = wave.times[1];
    let x_max = wave.times[wave.times.len() - 1];
    if !(x_min > 0.0 && x_max > x_min) {
        bail!("waveform time axis must increase past zero for a log plot");
    }

    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;

        let y_peak = wave
            .samples
            .iter()
            .map(|&s| i32::from(s).abs())
            .max()
            .unwrap_or(0)
            .max(1) as f64;

        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .caption(
                format!("Sweep {:.0}/{:.0}", spec.start_freq_hz, spec.end_freq_hz),
                ("sans-serif", 16).into_font().color(&style.caption),
            )
            .set_label_area_size(LabelAreaPosition::Left, 40)
            .set_label_area_size(LabelAreaPosition::Bottom, 28)
            .build_cartesian_2d((x_min..x_max).log_scale(), -y_peak..y_peak)?;
        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Amplitude")
            .light_line_style(&BLACK.mix(0.15))
            .draw()?;
        chart.draw_series(LineSeries::new(
            wave.times
                .iter()
                .zip(wave.samples.iter())
                .skip(1)
                .map(|(&t, &s)| (t, f64::from(s))),
            &style.line,
        ))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| anyhow!("failed to wrap the plot buffer as an image"))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::synthesize_pcm;
    use sweepgen_shared_protocol::{preset_spec, DEFAULT_AMPLITUDE};

    #[test]
    fn renders_a_png_for_a_device_preset() {
        let spec = preset_spec(1).unwrap();
        let wave = synthesize_pcm(&spec, DEFAULT_AMPLITUDE).unwrap();
        let png = render_sweep_plot_png(&spec, &wave, PlotStyle::default()).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn honors_a_custom_canvas_size() {
        let spec = preset_spec(0).unwrap();
        let wave = synthesize_pcm(&spec, DEFAULT_AMPLITUDE).unwrap();
        let style = PlotStyle {
            width: 160,
            height: 120,
            ..PlotStyle::default()
        };
        let png = render_sweep_plot_png(&spec, &wave, style).unwrap();
        assert!(!png.is_empty());
    }

    #[test]
    fn refuses_an_empty_waveform() {
        let spec = preset_spec(0).unwrap();
        let wave = SweepWaveform {
            times: Vec::new(),
            samples: Vec::new(),
        };
        assert!(render_sweep_plot_png(&spec, &wave, PlotStyle::default()).is_err());
    }

    #[test]
    fn refuses_mismatched_series_lengths() {
        let spec = preset_spec(0).unwrap();
        let wave = SweepWaveform {
            times: vec![0.0, 0.001, 0.002],
            samples: vec![1, 2],
        };
        assert!(render_sweep_plot_png(&spec, &wave, PlotStyle::default()).is_err());
    }
}
