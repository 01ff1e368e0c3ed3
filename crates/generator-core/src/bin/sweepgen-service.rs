use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sweepgen_generator_core::controller::SweepController;
use sweepgen_generator_core::hardware::{pick_output_device, CpalDeviceLister, DeviceLister};
use sweepgen_generator_core::http::{router, serve, ChannelCommandSink, GeneratorApi, GeneratorInfo};
use sweepgen_generator_core::playback::CpalPlayer;
use sweepgen_generator_core::settings::{FileSettingsStore, SettingsStore};
use sweepgen_shared_protocol::{
    ControlCommand, GeneratorStatus, DEFAULT_SAMPLE_RATE_HZ, SWEEP_PRESETS,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::{mpsc, watch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/var/lib/sweepgen/settings.json"));
    let store = Arc::new(FileSettingsStore::open(&settings_path)?);
    let settings = store.current();
    println!("settings loaded from {}", settings_path.display());

    match CpalDeviceLister.list_output_devices() {
        Ok(devices) => {
            for device in &devices {
                println!(
                    "output device: {}{} ({} ch, {}-{} Hz)",
                    device.name,
                    if device.is_default { " [default]" } else { "" },
                    device.channels,
                    device.min_sample_rate_hz,
                    device.max_sample_rate_hz
                );
            }
            match pick_output_device(
                &devices,
                settings.output_device.as_deref(),
                DEFAULT_SAMPLE_RATE_HZ as u32,
            ) {
                Some(picked) => println!("using output device {}", picked.name),
                None => println!("no output devices found, playback will be silent"),
            }
        }
        Err(err) => log::warn!("could not enumerate output devices: {err:#}"),
    }

    let player = CpalPlayer::new(settings.output_device.clone())?;
    let (mut controller, status) = SweepController::new(player, store.clone());

    let (tx, mut commands) = mpsc::channel::<ControlCommand>(32);
    spawn_key_reader(tx.clone());
    spawn_status_printer(status.clone());

    let info = GeneratorInfo {
        name: settings.device_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        hostname: hostname(),
    };
    let api = GeneratorApi::new(
        info,
        Arc::new(ChannelCommandSink::new(tx)),
        store,
        Arc::new(CpalDeviceLister),
        status,
    );
    let addr: SocketAddr = format!("0.0.0.0:{}", settings.http_port).parse()?;
    tokio::spawn(async move {
        if let Err(err) = serve(router(api), addr).await {
            log::error!("http server failed: {err:#}");
        }
    });
    println!("SweepGen HTTP service listening on {}", addr);
    println!(
        "keys: r=run/stop, n=next sweep, m=pulsed/continuous, 0-{}=select sweep, q=quit",
        SWEEP_PRESETS.len() - 1
    );

    let period = Duration::from_secs(settings.tick_seconds.max(1));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            maybe_command = commands.recv() => {
                let Some(command) = maybe_command else { break };
                let is_shutdown = matches!(command, ControlCommand::Shutdown);
                if let Err(err) = controller.handle(command) {
                    log::error!("command failed: {err:#}");
                }
                if is_shutdown {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(err) = controller.tick() {
                    log::error!("tick failed: {err:#}");
                }
            }
            _ = signal::ctrl_c() => {
                println!("Shutdown requested");
                break;
            }
        }
    }

    controller.shutdown()?;
    Ok(())
}

fn spawn_key_reader(tx: mpsc::Sender<ControlCommand>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(command) = parse_key_command(line.trim()) else {
                continue;
            };
            if tx.send(command).await.is_err() {
                break;
            }
        }
    });
}

fn parse_key_command(input: &str) -> Option<ControlCommand> {
    match input {
        "r" => Some(ControlCommand::ToggleRun),
        "n" => Some(ControlCommand::NextSweep),
        "m" => Some(ControlCommand::ToggleMode),
        "q" => Some(ControlCommand::Shutdown),
        _ => input
            .parse()
            .ok()
            .map(|index| ControlCommand::SelectSweep { index }),
    }
}

fn spawn_status_printer(mut status: watch::Receiver<GeneratorStatus>) {
    tokio::spawn(async move {
        let mut last = state_key(&status.borrow());
        while status.changed().await.is_ok() {
            let current = status.borrow().clone();
            let key = state_key(&current);
            if key == last {
                continue;
            }
            last = key;
            let (min, sec) = current.elapsed_min_sec();
            println!(
                "[{min}:{sec:02}] {} sweep {} ({:.0} Hz to {:.0} Hz, {:?})",
                if current.running { "running" } else { "stopped" },
                current.sweep_index,
                current.spec.start_freq_hz,
                current.spec.end_freq_hz,
                current.mode
            );
        }
    });
}

fn state_key(status: &GeneratorStatus) -> (bool, sweepgen_shared_protocol::PlayMode, usize) {
    (status.running, status.mode, status.sweep_index)
}

fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "sweepgen".to_string())
}
