use anyhow::{Context, Result};
use jack::{AsyncClient, Client, ClientOptions};
use log::{info, warn};

use crate::audio::analyzer::{Analyzer, AnalyzerHandle};
use crate::audio::capture::JackCapture;
use crate::audio::engine::{Engine, EngineHandle};
use crate::audio::jack::{NotificationHandler, ProcessHandler};
use crate::audio::ports::{IN_PORT, OUT_PORT_LEFT, OUT_PORT_RIGHT};
use crate::settings::{AudioSettings, Settings};

/// Owns the JACK client that runs the engine.
pub struct Manager {
    active_client: AsyncClient<NotificationHandler, ProcessHandler>,
    engine_handle: EngineHandle,
    analyzer_handle: AnalyzerHandle,
}

impl Manager {
    pub fn new(settings: &Settings) -> Result<Self> {
        let (client, _) = Client::new("eqconsole", ClientOptions::NO_START_SERVER)
            .context("failed to create JACK client")?;

        let sample_rate = client.sample_rate() as usize;
        info!(
            "JACK client '{}' at {} Hz, {} frames",
            client.name(),
            sample_rate,
            client.buffer_size()
        );

        let (analyzer, analyzer_handle) = Analyzer::new(settings.console.fft_size, sample_rate)
            .context("failed to create spectrum analyzer")?;
        let (engine, engine_handle) =
            Engine::new(sample_rate, &settings.engine_params(), analyzer);
        let jack_handler =
            ProcessHandler::new(&client, engine).context("failed to create process handler")?;

        let active_client = client
            .activate_async(NotificationHandler, jack_handler)
            .context("failed to activate async client")?;

        let manager = Self {
            active_client,
            engine_handle,
            analyzer_handle,
        };

        manager.connect_outputs(&settings.audio);

        Ok(manager)
    }

    fn port_name(&self, port: &str) -> String {
        format!("{}:{}", self.active_client.as_client().name(), port)
    }

    /// Connect both playback ports. Failures are logged, not fatal.
    fn connect_outputs(&self, settings: &AudioSettings) {
        let client = self.active_client.as_client();

        for (ours, theirs) in [
            (OUT_PORT_LEFT, &settings.output_left_port),
            (OUT_PORT_RIGHT, &settings.output_right_port),
        ] {
            let ours = self.port_name(ours);
            if let Err(e) = client.connect_ports_by_name(&ours, theirs) {
                warn!("Failed to connect output port '{}': {}", theirs, e);
            } else {
                info!("Connected output: {} -> {}", ours, theirs);
            }
        }
    }

    /// Capture device that patches `settings.capture_port` into our input.
    pub fn capture_device(&self, settings: &AudioSettings) -> Result<JackCapture> {
        JackCapture::new(&settings.capture_port, &self.port_name(IN_PORT))
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine_handle
    }

    pub fn analyzer(&self) -> &AnalyzerHandle {
        &self.analyzer_handle
    }

    /// Deactivate the client. The engine is dropped with it.
    pub fn close(self) -> Result<()> {
        self.active_client
            .deactivate()
            .context("failed to deactivate JACK client")?;
        info!("JACK client closed");
        Ok(())
    }
}
