use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::audio::engine::{EngineHandle, EngineParams, MAX_MASTER_GAIN, MAX_NOISE_LEVEL};
use crate::eq::BAND_COUNT;
use crate::eq::controls::EqControls;
use crate::graph::router::{Router, RouterState};
use crate::noise::NoiseKind;
use crate::source::file::FileSource;
use crate::source::mic::{CaptureDevice, CapturePoll, MicSource};
use crate::source::noise::NoiseSource;
use crate::source::{Producer, Readiness, SourceKind, SourceRegistry};

/// Discrete events from a control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    SourceChanged(SourceKind),
    FileSelected(PathBuf),
    BypassToggled(bool),
    BandGainChanged { band: usize, db: f32 },
    BandReset(usize),
    GlobalQChanged(f32),
    MasterVolumeChanged(f32),
    NoiseLevelChanged(f32),
    PresetSelected(String),
    ResetRequested,
    PlayRequested,
    PauseRequested,
}

/// What a control surface should currently show.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    pub selected: SourceKind,
    pub routing: RouterState,
    pub file_picker_visible: bool,
    pub noise_level_enabled: bool,
    pub mic_pending: bool,
    pub loaded_file: Option<PathBuf>,
    pub gains: [f32; BAND_COUNT],
    pub readouts: [String; BAND_COUNT],
    pub q: f32,
    pub master_volume: f32,
    pub noise_level: f32,
    pub status: Option<String>,
}

/// Control-thread owner of the sources, the router and the EQ controls.
pub struct Console {
    sources: SourceRegistry,
    router: Router,
    eq: EqControls,
    engine: EngineHandle,
    master_volume: f32,
    noise_level: f32,
    /// A master or noise level change never reached the engine.
    levels_stale: bool,
    noise_level_enabled: bool,
    file_picker_visible: bool,
    status: Option<String>,
}

impl Console {
    pub fn new(
        engine: EngineHandle,
        capture: Box<dyn CaptureDevice>,
        params: &EngineParams,
    ) -> Self {
        let sources = SourceRegistry::new(
            FileSource::new(engine.clone()),
            MicSource::new(capture),
            NoiseSource::new(NoiseKind::White, engine.clone()),
            NoiseSource::new(NoiseKind::Pink, engine.clone()),
        );

        Self {
            sources,
            router: Router::new(engine.clone()),
            eq: EqControls::new(params.q, engine.clone()),
            engine,
            master_volume: params.master_volume.clamp(0.0, MAX_MASTER_GAIN),
            noise_level: params.noise_level.clamp(0.0, MAX_NOISE_LEVEL),
            levels_stale: false,
            noise_level_enabled: false,
            file_picker_visible: true,
            status: None,
        }
    }

    pub fn handle(&mut self, event: ControlEvent) -> Result<()> {
        debug!("Event: {event:?}");
        match event {
            ControlEvent::SourceChanged(kind) => self.select_source(kind),
            ControlEvent::FileSelected(path) => self.open_file(&path)?,
            ControlEvent::BypassToggled(bypass) => self.router.set_bypass(&self.sources, bypass),
            ControlEvent::BandGainChanged { band, db } => self.eq.set_band_gain(band, db),
            ControlEvent::BandReset(band) => self.eq.reset_band(band),
            ControlEvent::GlobalQChanged(q) => self.eq.set_global_q(q),
            ControlEvent::MasterVolumeChanged(volume) => self.set_master_volume(volume),
            ControlEvent::NoiseLevelChanged(level) => self.set_noise_level(level),
            ControlEvent::PresetSelected(name) => {
                self.eq.apply_preset(&name);
            }
            ControlEvent::ResetRequested => self.eq.reset_all(),
            ControlEvent::PlayRequested => self.play(),
            ControlEvent::PauseRequested => self.pause(),
        }
        Ok(())
    }

    fn select_source(&mut self, kind: SourceKind) {
        let prev = self.sources.selected();
        if kind == prev {
            debug!("{kind} already selected");
            return;
        }

        self.noise_level_enabled = kind.is_noise();
        self.file_picker_visible = kind == SourceKind::File;
        self.status = None;
        self.sources.select(kind);

        self.start_and_route(kind);
        self.sources.get_mut(prev).stop();
        info!("Source: {prev} -> {kind}");
    }

    /// Start `kind` and route it, or route silence if it cannot play yet.
    fn start_and_route(&mut self, kind: SourceKind) {
        let active = match self.sources.get_mut(kind).start() {
            Ok(Readiness::Ready) => Some(kind),
            Ok(Readiness::Pending) => None,
            Err(e) => {
                debug!("{kind} not started: {e}");
                None
            }
        };
        self.router.route(&self.sources, active);
    }

    fn open_file(&mut self, path: &Path) -> Result<()> {
        if let Err(e) = self.sources.file_mut().load(path) {
            warn!("Failed to load {}: {e:#}", path.display());
            self.status = Some(format!("Could not open {}", path.display()));
            return Err(e).context("failed to open file");
        }

        self.sources.mic_mut().stop();

        let prev = self.sources.selected();
        self.sources.select(SourceKind::File);
        self.file_picker_visible = true;
        self.noise_level_enabled = false;
        self.status = None;

        self.start_and_route(SourceKind::File);
        if prev != SourceKind::File {
            self.sources.get_mut(prev).stop();
        }
        Ok(())
    }

    fn play(&mut self) {
        let kind = self.sources.selected();
        match self.sources.get_mut(kind).start() {
            Ok(Readiness::Ready) => self.router.route(&self.sources, Some(kind)),
            Ok(Readiness::Pending) => debug!("Waiting for {kind}"),
            Err(e) => debug!("Play ignored: {e}"),
        }
    }

    fn pause(&mut self) {
        let kind = self.sources.selected();
        match kind {
            SourceKind::File => self.sources.file_mut().stop(),
            SourceKind::White | SourceKind::Pink => {
                if self.router.state().active == Some(kind) {
                    self.router.route(&self.sources, None);
                }
                self.sources.get_mut(kind).stop();
            }
            SourceKind::Mic => {}
        }
    }

    fn set_master_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume } else { 0.0 };
        self.master_volume = volume.clamp(0.0, MAX_MASTER_GAIN);
        self.levels_stale |= !self.engine.set_master_gain(self.master_volume);
    }

    fn set_noise_level(&mut self, level: f32) {
        if !self.noise_level_enabled {
            debug!("Noise level is disabled for {}", self.sources.selected());
            return;
        }
        let level = if level.is_finite() { level } else { 0.0 };
        self.noise_level = level.clamp(0.0, MAX_NOISE_LEVEL);
        self.levels_stale |= !self.engine.set_noise_level(self.noise_level);
    }

    /// Resend anything the engine dropped, then resolve a pending microphone
    /// request without blocking.
    pub fn poll(&mut self) {
        self.router.republish();
        self.eq.resync();
        if self.levels_stale {
            self.levels_stale = !(self.engine.set_master_gain(self.master_volume)
                && self.engine.set_noise_level(self.noise_level));
        }

        match self.sources.mic_mut().poll() {
            CapturePoll::Idle | CapturePoll::Waiting => {}
            CapturePoll::Granted => {
                if self.sources.selected() == SourceKind::Mic {
                    self.router.route(&self.sources, Some(SourceKind::Mic));
                } else {
                    debug!("Microphone granted after switching away, releasing");
                    self.sources.mic_mut().stop();
                }
            }
            CapturePoll::Failed(e) => {
                warn!("Microphone request failed: {e}");
                if self.sources.selected() == SourceKind::Mic {
                    self.sources.select(SourceKind::File);
                    self.file_picker_visible = true;
                    self.noise_level_enabled = false;
                    self.router.route(&self.sources, None);
                }
                self.status = Some(format!(
                    "Failed to access microphone ({e}). Check the capture port and its permissions."
                ));
            }
        }
    }

    /// Route silence and release every producer.
    pub fn shutdown(&mut self) {
        info!("Shutting down console");
        self.router.route(&self.sources, None);
        for kind in SourceKind::ALL {
            self.sources.get_mut(kind).stop();
        }
        self.sources.file_mut().unload();
    }

    pub fn view(&self) -> ConsoleView {
        ConsoleView {
            selected: self.sources.selected(),
            routing: self.router.state(),
            file_picker_visible: self.file_picker_visible,
            noise_level_enabled: self.noise_level_enabled,
            mic_pending: self.sources.mic().is_pending(),
            loaded_file: self.sources.file().loaded_path().map(Path::to_path_buf),
            gains: *self.eq.gains(),
            readouts: self.eq.readouts().clone(),
            q: self.eq.q(),
            master_volume: self.master_volume,
            noise_level: self.noise_level,
            status: self.status.clone(),
        }
    }

    pub const fn router(&self) -> &Router {
        &self.router
    }

    pub const fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub const fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub const fn eq(&self) -> &EqControls {
        &self.eq
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}
