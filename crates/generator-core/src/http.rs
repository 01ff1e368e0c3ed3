use std::net::SocketAddr;
use std::sync::Arc;

use crate::export::sweep_wav_bytes;
use crate::hardware::{AudioDeviceInfo, DeviceLister};
use crate::plot::{render_sweep_plot_png, PlotStyle};
use crate::settings::{DeviceSettings, SettingsStore, SettingsUpdatePayload};
use crate::synth::synthesize_pcm;
use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sweepgen_shared_protocol::{
    preset_spec, valid_amplitude, ControlCommand, GeneratorStatus, SWEEP_PRESETS,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub version: String,
    pub hostname: String,
}

#[derive(Clone)]
pub struct GeneratorApi {
    info: GeneratorInfo,
    commands: Arc<dyn CommandSink + Send + Sync>,
    settings: Arc<dyn SettingsStore + Send + Sync>,
    devices: Arc<dyn DeviceLister>,
    status: watch::Receiver<GeneratorStatus>,
}

impl GeneratorApi {
    pub fn new(
        info: GeneratorInfo,
        commands: Arc<dyn CommandSink + Send + Sync>,
        settings: Arc<dyn SettingsStore + Send + Sync>,
        devices: Arc<dyn DeviceLister>,
        status: watch::Receiver<GeneratorStatus>,
    ) -> Self {
        Self { info, commands, settings, devices, status }
    }
}

pub trait CommandSink {
    fn submit(&self, command: ControlCommand) -> Result<()>;
}

pub struct ChannelCommandSink {
    tx: mpsc::Sender<ControlCommand>,
}

impl ChannelCommandSink {
    pub fn new(tx: mpsc::Sender<ControlCommand>) -> Self {
        Self { tx }
    }
}

impl CommandSink for ChannelCommandSink {
    fn submit(&self, command: ControlCommand) -> Result<()> {
        self.tx
            .try_send(command)
            .map_err(|err| anyhow!("command queue rejected the request: {err}"))
    }
}

pub fn router(state: GeneratorApi) -> Router {
    Router::new()
        .route("/api/generator/info", get(generator_info))
        .route("/api/status", get(generator_status))
        .route("/api/command", post(submit_command))
        .route("/api/sweeps", get(list_sweeps))
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/api/devices", get(list_devices))
        .route("/api/sweep.png", get(sweep_plot))
        .route("/api/sweep.wav", get(sweep_wav))
        .with_state(state)
}

async fn generator_info(State(state): State<GeneratorApi>) -> Json<GeneratorInfo> {
    Json(state.info.clone())
}

async fn generator_status(State(state): State<GeneratorApi>) -> Json<GeneratorStatus> {
    Json(state.status.borrow().clone())
}

async fn submit_command(
    State(state): State<GeneratorApi>,
    Json(command): Json<ControlCommand>,
) -> Result<StatusCode, StatusCode> {
    if let ControlCommand::SelectSweep { index } = &command {
        if preset_spec(*index).is_none() {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    state
        .commands
        .submit(command)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepListEntry {
    pub index: usize,
    pub start_freq_hz: f64,
    pub end_freq_hz: f64,
    pub duration_s: f64,
    pub num_samples: usize,
    pub selected: bool,
}

async fn list_sweeps(State(state): State<GeneratorApi>) -> Json<Vec<SweepListEntry>> {
    let selected = state.status.borrow().sweep_index;
    let entries = SWEEP_PRESETS
        .iter()
        .enumerate()
        .map(|(index, preset)| {
            let spec = preset.spec();
            SweepListEntry {
                index,
                start_freq_hz: spec.start_freq_hz,
                end_freq_hz: spec.end_freq_hz,
                duration_s: spec.duration_s,
                num_samples: spec.num_samples(),
                selected: index == selected,
            }
        })
        .collect();
    Json(entries)
}

async fn get_settings(State(state): State<GeneratorApi>) -> Json<DeviceSettings> {
    Json(state.settings.current())
}

async fn update_settings(
    State(state): State<GeneratorApi>,
    Json(req): Json<SettingsUpdatePayload>,
) -> Result<Json<DeviceSettings>, StatusCode> {
    if let Some(amplitude) = req.amplitude {
        if !valid_amplitude(amplitude) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if let Some(index) = req.sweep_index {
        if preset_spec(index).is_none() {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    let settings = state
        .settings
        .update(req)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(settings))
}

async fn list_devices(
    State(state): State<GeneratorApi>,
) -> Result<Json<Vec<AudioDeviceInfo>>, StatusCode> {
    let devices = state
        .devices
        .list_output_devices()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(devices))
}

async fn sweep_plot(State(state): State<GeneratorApi>) -> Result<impl IntoResponse, StatusCode> {
    let status = state.status.borrow().clone();
    let amplitude = state.settings.current().amplitude;
    let wave = synthesize_pcm(&status.spec, amplitude)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let png = render_sweep_plot_png(&status.spec, &wave, PlotStyle::default())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

async fn sweep_wav(State(state): State<GeneratorApi>) -> Result<impl IntoResponse, StatusCode> {
    let status = state.status.borrow().clone();
    let amplitude = state.settings.current().amplitude;
    let wav = sweep_wav_bytes(&status.spec, amplitude)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], wav))
}

pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await.context("bind")?;
    axum::serve(listener, router).await.context("serve")?;
    Ok(())
}
