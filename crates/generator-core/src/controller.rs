use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{info, warn};
use sweepgen_shared_protocol::{
    next_preset_index, preset_spec, ControlCommand, GeneratorStatus, PlayMode, SweepSpec,
    SWEEP_PRESETS,
};
use tokio::sync::watch;

use crate::playback::PlaybackSink;
use crate::settings::SettingsStore;
use crate::synth::synthesize_pcm;

pub struct SweepController<S: PlaybackSink> {
    sink: S,
    settings: Arc<dyn SettingsStore + Send + Sync>,
    running: bool,
    mode: PlayMode,
    sweep_index: usize,
    selected_spec: SweepSpec,
    elapsed_s: u64,
    armed: Option<(Arc<Vec<i16>>, u32)>,
    status: watch::Sender<GeneratorStatus>,
}

impl<S: PlaybackSink> SweepController<S> {
    pub fn new(
        sink: S,
        settings: Arc<dyn SettingsStore + Send + Sync>,
    ) -> (Self, watch::Receiver<GeneratorStatus>) {
        let stored_index = settings.current().sweep_index;
        let (sweep_index, selected_spec) = match preset_spec(stored_index) {
            Some(spec) => (stored_index, spec),
            None => {
                warn!("configured sweep index {stored_index} is out of range, using 0");
                (0, SweepSpec::default())
            }
        };
        let (status, receiver) = watch::channel(GeneratorStatus {
            sweep_index,
            spec: selected_spec.clone(),
            ..GeneratorStatus::default()
        });
        let controller = Self {
            sink,
            settings,
            running: false,
            mode: PlayMode::Pulsed,
            sweep_index,
            selected_spec,
            elapsed_s: 0,
            armed: None,
            status,
        };
        (controller, receiver)
    }

    pub fn handle(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::ToggleRun => self.toggle_run(),
            ControlCommand::NextSweep => self.select_sweep(next_preset_index(self.sweep_index)),
            ControlCommand::SelectSweep { index } => self.select_sweep(index),
            ControlCommand::ToggleMode => self.toggle_mode(),
            ControlCommand::Shutdown => self.shutdown(),
        }
    }

    pub fn tick(&mut self) -> Result<()> {
        self.elapsed_s += 1;
        if self.running && self.mode == PlayMode::Pulsed {
            if let Some((pcm, rate)) = &self.armed {
                self.sink.play_once(Arc::clone(pcm), *rate)?;
            }
        }
        self.publish();
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        if self.running {
            self.running = false;
            self.sink.stop()?;
            self.publish();
        }
        Ok(())
    }

    fn toggle_run(&mut self) -> Result<()> {
        if self.running {
            self.running = false;
            self.sink.stop()?;
            info!("output off");
            self.publish();
            return Ok(());
        }

        let spec = self.selected_spec.clone();
        let amplitude = self.settings.current().amplitude;
        let wave = match synthesize_pcm(&spec, amplitude) {
            Ok(wave) => wave,
            Err(err) => {
                // A failed synthesis must not leave stale audio armed or playing.
                self.armed = None;
                self.sink.stop()?;
                self.publish();
                return Err(anyhow!(err).context("failed to synthesize the selected sweep"));
            }
        };
        let pcm = Arc::new(wave.samples);
        let rate = spec.sample_rate_hz as u32;
        match self.mode {
            PlayMode::Pulsed => self.sink.play_once(Arc::clone(&pcm), rate)?,
            PlayMode::Continuous => self.sink.play_looping(Arc::clone(&pcm), rate)?,
        }
        self.armed = Some((pcm, rate));
        self.running = true;
        info!(
            "output on: sweep {} ({:.0} -> {:.0} Hz, {:?})",
            self.sweep_index, spec.start_freq_hz, spec.end_freq_hz, self.mode
        );
        self.publish();
        Ok(())
    }

    fn select_sweep(&mut self, index: usize) -> Result<()> {
        let Some(spec) = preset_spec(index) else {
            warn!(
                "ignoring sweep index {index}, table has {} entries",
                SWEEP_PRESETS.len()
            );
            return Ok(());
        };
        self.sweep_index = index;
        self.selected_spec = spec;
        // An armed buffer keeps playing; the new preset takes effect at the
        // next output toggle.
        info!(
            "selected sweep {}: {:.0} -> {:.0} Hz",
            index, self.selected_spec.start_freq_hz, self.selected_spec.end_freq_hz
        );
        self.publish();
        Ok(())
    }

    fn toggle_mode(&mut self) -> Result<()> {
        self.mode = self.mode.toggled();
        info!("play mode is now {:?}", self.mode);
        if self.running {
            if let Some((pcm, rate)) = self.armed.clone() {
                self.sink.stop()?;
                match self.mode {
                    PlayMode::Pulsed => self.sink.play_once(pcm, rate)?,
                    PlayMode::Continuous => self.sink.play_looping(pcm, rate)?,
                }
            }
        }
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.status.send_replace(GeneratorStatus {
            running: self.running,
            mode: self.mode,
            sweep_index: self.sweep_index,
            spec: self.selected_spec.clone(),
            elapsed_s: self.elapsed_s,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DeviceSettings, SettingsUpdatePayload};
    use std::sync::Mutex;
    use sweepgen_shared_protocol::DEFAULT_AMPLITUDE;

    #[derive(Debug, Clone, PartialEq)]
    enum SinkCall {
        PlayOnce(usize, u32),
        PlayLooping(usize, u32),
        Stop,
    }

    #[derive(Clone, Default)]
    struct MockSink {
        calls: Arc<Mutex<Vec<SinkCall>>>,
        last_pcm: Arc<Mutex<Option<Arc<Vec<i16>>>>>,
    }

    impl MockSink {
        fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }

        fn last_pcm(&self) -> Option<Arc<Vec<i16>>> {
            self.last_pcm.lock().unwrap().clone()
        }
    }

    impl PlaybackSink for MockSink {
        fn play_once(&self, pcm: Arc<Vec<i16>>, sample_rate_hz: u32) -> Result<()> {
            *self.last_pcm.lock().unwrap() = Some(Arc::clone(&pcm));
            self.calls
                .lock()
                .unwrap()
                .push(SinkCall::PlayOnce(pcm.len(), sample_rate_hz));
            Ok(())
        }

        fn play_looping(&self, pcm: Arc<Vec<i16>>, sample_rate_hz: u32) -> Result<()> {
            *self.last_pcm.lock().unwrap() = Some(Arc::clone(&pcm));
            self.calls
                .lock()
                .unwrap()
                .push(SinkCall::PlayLooping(pcm.len(), sample_rate_hz));
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.calls.lock().unwrap().push(SinkCall::Stop);
            Ok(())
        }
    }

    struct MockStore {
        inner: Mutex<DeviceSettings>,
    }

    impl MockStore {
        fn with(settings: DeviceSettings) -> Arc<Self> {
            Arc::new(Self {
                inner: Mutex::new(settings),
            })
        }
    }

    impl SettingsStore for MockStore {
        fn current(&self) -> DeviceSettings {
            self.inner.lock().unwrap().clone()
        }

        fn update(&self, update: SettingsUpdatePayload) -> Result<DeviceSettings> {
            let mut settings = self.inner.lock().unwrap();
            update.apply(&mut settings);
            Ok(settings.clone())
        }
    }

    fn controller(
        amplitude: f64,
    ) -> (
        SweepController<MockSink>,
        watch::Receiver<GeneratorStatus>,
        MockSink,
    ) {
        let sink = MockSink::default();
        let store = MockStore::with(DeviceSettings {
            amplitude,
            ..DeviceSettings::default()
        });
        let (controller, status) = SweepController::new(sink.clone(), store);
        (controller, status, sink)
    }

    #[test]
    fn toggle_run_arms_and_pulses_once() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleRun).unwrap();

        assert_eq!(sink.calls(), vec![SinkCall::PlayOnce(768, 192_000)]);
        let snapshot = status.borrow().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.mode, PlayMode::Pulsed);
    }

    #[test]
    fn continuous_mode_loops_the_buffer() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleMode).unwrap();
        ctl.handle(ControlCommand::ToggleRun).unwrap();

        assert_eq!(sink.calls(), vec![SinkCall::PlayLooping(768, 192_000)]);
        assert_eq!(status.borrow().mode, PlayMode::Continuous);
    }

    #[test]
    fn second_toggle_stops_playback() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.handle(ControlCommand::ToggleRun).unwrap();

        assert_eq!(
            sink.calls(),
            vec![SinkCall::PlayOnce(768, 192_000), SinkCall::Stop]
        );
        assert!(!status.borrow().running);
    }

    #[test]
    fn preset_change_leaves_running_playback_alone() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.handle(ControlCommand::SelectSweep { index: 3 }).unwrap();

        assert_eq!(sink.calls(), vec![SinkCall::PlayOnce(768, 192_000)]);
        let snapshot = status.borrow().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.sweep_index, 3);
        assert_eq!(snapshot.spec.start_freq_hz, 4_000.0);
    }

    #[test]
    fn next_sweep_cycles_through_the_table() {
        let (mut ctl, status, _sink) = controller(DEFAULT_AMPLITUDE);
        for _ in 0..SWEEP_PRESETS.len() {
            ctl.handle(ControlCommand::NextSweep).unwrap();
        }
        assert_eq!(status.borrow().sweep_index, 0);
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let (mut ctl, status, _sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::SelectSweep { index: 99 }).unwrap();
        assert_eq!(status.borrow().sweep_index, 0);
    }

    #[test]
    fn stored_index_out_of_range_falls_back_to_the_first_preset() {
        let sink = MockSink::default();
        let store = MockStore::with(DeviceSettings {
            sweep_index: 99,
            ..DeviceSettings::default()
        });
        let (_ctl, status) = SweepController::new(sink, store);
        assert_eq!(status.borrow().sweep_index, 0);
        assert_eq!(status.borrow().spec, SweepSpec::default());
    }

    #[test]
    fn amplitude_update_applies_at_the_next_run() {
        let sink = MockSink::default();
        let store = MockStore::with(DeviceSettings::default());
        let (mut ctl, _status) = SweepController::new(sink.clone(), store.clone());

        ctl.handle(ControlCommand::ToggleRun).unwrap();
        assert_eq!(sink.last_pcm().unwrap()[0], DEFAULT_AMPLITUDE as i16);

        ctl.handle(ControlCommand::ToggleRun).unwrap();
        store
            .update(SettingsUpdatePayload {
                amplitude: Some(1_000.0),
                ..SettingsUpdatePayload::default()
            })
            .unwrap();
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        assert_eq!(sink.last_pcm().unwrap()[0], 1_000);
    }

    #[test]
    fn mode_toggle_while_running_restarts_in_the_new_mode() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.handle(ControlCommand::ToggleMode).unwrap();

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::PlayOnce(768, 192_000),
                SinkCall::Stop,
                SinkCall::PlayLooping(768, 192_000),
            ]
        );
        let snapshot = status.borrow().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.mode, PlayMode::Continuous);
    }

    #[test]
    fn tick_retriggers_only_when_running_in_pulsed_mode() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);

        ctl.tick().unwrap();
        assert!(sink.calls().is_empty());

        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.tick().unwrap();
        ctl.tick().unwrap();
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::PlayOnce(768, 192_000),
                SinkCall::PlayOnce(768, 192_000),
                SinkCall::PlayOnce(768, 192_000),
            ]
        );
        assert_eq!(status.borrow().elapsed_s, 3);
    }

    #[test]
    fn tick_does_not_retrigger_in_continuous_mode() {
        let (mut ctl, _status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleMode).unwrap();
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.tick().unwrap();

        assert_eq!(sink.calls(), vec![SinkCall::PlayLooping(768, 192_000)]);
    }

    #[test]
    fn elapsed_time_is_uptime_not_run_time() {
        let (mut ctl, status, _sink) = controller(DEFAULT_AMPLITUDE);
        ctl.tick().unwrap();
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.tick().unwrap();
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.tick().unwrap();

        assert_eq!(status.borrow().elapsed_s, 3);
    }

    #[test]
    fn synthesis_failure_stops_the_sink_and_propagates() {
        let (mut ctl, status, sink) = controller(40_000.0);
        let err = ctl.handle(ControlCommand::ToggleRun);

        assert!(err.is_err());
        assert_eq!(sink.calls(), vec![SinkCall::Stop]);
        assert!(!status.borrow().running);

        ctl.tick().unwrap();
        assert_eq!(sink.calls(), vec![SinkCall::Stop]);
    }

    #[test]
    fn shutdown_stops_a_running_generator() {
        let (mut ctl, status, sink) = controller(DEFAULT_AMPLITUDE);
        ctl.handle(ControlCommand::ToggleRun).unwrap();
        ctl.handle(ControlCommand::Shutdown).unwrap();

        assert_eq!(
            sink.calls(),
            vec![SinkCall::PlayOnce(768, 192_000), SinkCall::Stop]
        );
        assert!(!status.borrow().running);
    }
}
