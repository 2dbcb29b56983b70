use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, bounded};
use jack::{AsyncClient, Client, ClientOptions};
use log::{info, warn};

use crate::source::mic::{CaptureDevice, CaptureError};

/// Microphone access through a JACK connection from a capture port to the
/// console's input port.
///
/// Uses its own client so opening and releasing the input never touches the
/// client that runs the engine.
pub struct JackCapture {
    client: AsyncClient<(), ()>,
    capture_port: String,
    input_port: String,
    connected: bool,
}

impl JackCapture {
    pub fn new(capture_port: &str, input_port: &str) -> Result<Self> {
        let (client, _) = Client::new("eqconsole-capture", ClientOptions::NO_START_SERVER)
            .context("failed to create JACK capture client")?;
        let client = client
            .activate_async((), ())
            .context("failed to activate JACK capture client")?;

        Ok(Self {
            client,
            capture_port: capture_port.to_string(),
            input_port: input_port.to_string(),
            connected: false,
        })
    }

    fn connect(&mut self) -> Result<(), CaptureError> {
        let client = self.client.as_client();

        let Some(port) = client.port_by_name(&self.capture_port) else {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no port named '{}'",
                self.capture_port
            )));
        };

        if port.is_connected_to(&self.input_port).unwrap_or(false) {
            self.connected = true;
            return Ok(());
        }

        client
            .connect_ports_by_name(&self.capture_port, &self.input_port)
            .map_err(|e| {
                warn!(
                    "Failed to connect capture port '{}': {}",
                    self.capture_port, e
                );
                CaptureError::PermissionDenied
            })?;

        info!("Connected capture: {} -> {}", self.capture_port, self.input_port);
        self.connected = true;
        Ok(())
    }
}

impl CaptureDevice for JackCapture {
    fn request(&mut self) -> Receiver<Result<(), CaptureError>> {
        let (tx, rx) = bounded(1);
        let result = self.connect();
        if tx.send(result).is_err() {
            warn!("Capture request was dropped before it resolved");
        }
        rx
    }

    fn release(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;

        if let Err(e) = self
            .client
            .as_client()
            .disconnect_ports_by_name(&self.capture_port, &self.input_port)
        {
            warn!(
                "Failed to disconnect capture port '{}': {}",
                self.capture_port, e
            );
        } else {
            info!("Released capture: {}", self.capture_port);
        }
    }
}
