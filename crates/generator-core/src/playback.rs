use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use log::{debug, error, info};

pub trait PlaybackSink {
    fn play_once(&self, pcm: Arc<Vec<i16>>, sample_rate_hz: u32) -> Result<()>;
    fn play_looping(&self, pcm: Arc<Vec<i16>>, sample_rate_hz: u32) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

#[derive(Debug)]
pub struct PcmCursor {
    pcm: Arc<Vec<i16>>,
    pos: usize,
    looping: bool,
}

impl PcmCursor {
    pub fn new(pcm: Arc<Vec<i16>>, looping: bool) -> Self {
        Self {
            pcm,
            pos: 0,
            looping,
        }
    }

    pub fn next_sample(&mut self) -> i16 {
        if self.pos >= self.pcm.len() {
            if !self.looping || self.pcm.is_empty() {
                return 0;
            }
            self.pos = 0;
        }
        let sample = self.pcm[self.pos];
        self.pos += 1;
        sample
    }

    pub fn finished(&self) -> bool {
        !self.looping && self.pos >= self.pcm.len()
    }
}

type CursorSlot = Arc<Mutex<Option<PcmCursor>>>;

enum PlayerCommand {
    Play {
        pcm: Arc<Vec<i16>>,
        sample_rate_hz: u32,
        looping: bool,
    },
    Stop,
    Shutdown,
}

pub struct CpalPlayer {
    commands: Sender<PlayerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl CpalPlayer {
    pub fn new(preferred_device: Option<String>) -> Result<Self> {
        let (commands, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("audio-player".into())
            .spawn(move || player_thread(rx, preferred_device))
            .context("failed to spawn the audio player thread")?;
        Ok(Self {
            commands,
            worker: Some(worker),
        })
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("the audio player thread has exited"))
    }
}

impl PlaybackSink for CpalPlayer {
    fn play_once(&self, pcm: Arc<Vec<i16>>, sample_rate_hz: u32) -> Result<()> {
        self.send(PlayerCommand::Play {
            pcm,
            sample_rate_hz,
            looping: false,
        })
    }

    fn play_looping(&self, pcm: Arc<Vec<i16>>, sample_rate_hz: u32) -> Result<()> {
        self.send(PlayerCommand::Play {
            pcm,
            sample_rate_hz,
            looping: true,
        })
    }

    fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop)
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn player_thread(commands: Receiver<PlayerCommand>, preferred_device: Option<String>) {
    // cpal streams are not Send, so this thread owns the handle. It stays
    // open across Stop so pulsed retriggers only swap the cursor.
    let mut active: Option<(cpal::Stream, u32, CursorSlot)> = None;

    while let Ok(command) = commands.recv() {
        match command {
            PlayerCommand::Play {
                pcm,
                sample_rate_hz,
                looping,
            } => {
                let needs_stream = !matches!(&active, Some((_, rate, _)) if *rate == sample_rate_hz);
                if needs_stream {
                    active = None;
                    match open_stream(preferred_device.as_deref(), sample_rate_hz) {
                        Ok((stream, slot)) => {
                            if let Err(err) = stream.play() {
                                error!("failed to start output stream: {err}");
                                continue;
                            }
                            active = Some((stream, sample_rate_hz, slot));
                        }
                        Err(err) => {
                            error!("failed to open output stream: {err:#}");
                            continue;
                        }
                    }
                }
                if let Some((_, _, slot)) = &active {
                    if let Ok(mut cursor) = slot.lock() {
                        *cursor = Some(PcmCursor::new(pcm, looping));
                    }
                }
            }
            PlayerCommand::Stop => {
                if let Some((_, _, slot)) = &active {
                    if let Ok(mut cursor) = slot.lock() {
                        *cursor = None;
                    }
                }
            }
            PlayerCommand::Shutdown => break,
        }
    }
    debug!("audio player thread exiting");
}

fn open_stream(preferred: Option<&str>, sample_rate_hz: u32) -> Result<(cpal::Stream, CursorSlot)> {
    let host = cpal::default_host();
    let device = match preferred {
        Some(name) => host
            .output_devices()
            .context("failed to enumerate output devices")?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("output device {name:?} not found"))?,
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device available"))?,
    };

    let default_config = device
        .default_output_config()
        .context("failed to read the default output config")?;
    let sample_format = default_config.sample_format();
    let mut config: cpal::StreamConfig = default_config.into();
    // Ask the device for the synthesis rate rather than resampling.
    config.sample_rate = cpal::SampleRate(sample_rate_hz);

    info!(
        "opening output stream on {:?} at {} Hz ({} channels, {:?})",
        device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate_hz,
        config.channels,
        sample_format
    );

    let slot: CursorSlot = Arc::new(Mutex::new(None));
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&slot))?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&slot))?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&slot))?,
        other => return Err(anyhow!("unsupported output sample format {other:?}")),
    };
    Ok((stream, slot))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    slot: CursorSlot,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels as usize;
    let err_fn = |err| error!("output stream error: {err}");
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
            let Ok(mut guard) = slot.lock() else {
                output.fill(T::from_sample(0i16));
                return;
            };
            for frame in output.chunks_exact_mut(channels) {
                let sample = guard.as_mut().map(PcmCursor::next_sample).unwrap_or(0);
                let converted = T::from_sample(sample);
                for channel in frame.iter_mut() {
                    *channel = converted;
                }
            }
            if guard.as_ref().map(PcmCursor::finished).unwrap_or(false) {
                *guard = None;
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
