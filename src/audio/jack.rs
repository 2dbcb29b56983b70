use anyhow::{Context, Result};
use jack::Client;
use log::{debug, error};

use crate::audio::engine::Engine;
use crate::audio::ports::Ports;

pub struct NotificationHandler;
pub struct ProcessHandler {
    ports: Ports,
    audio_engine: Engine,
    buffer: Vec<f32>,
}

impl jack::NotificationHandler for NotificationHandler {
    fn sample_rate(&mut self, _: &Client, sample_rate: jack::Frames) -> jack::Control {
        debug!(">> JACK sample_rate changed to {sample_rate}");

        jack::Control::Continue
    }
}

impl ProcessHandler {
    pub fn new(client: &Client, audio_engine: Engine) -> Result<Self> {
        let ports = Ports::new(client).context("failed to create audio ports")?;
        let buffer_size = client.buffer_size() as usize;

        Ok(Self {
            ports,
            audio_engine,
            buffer: vec![0.0; buffer_size],
        })
    }
}

/// Runs the mono engine over the capture port in chunks of the scratch
/// buffer and writes every rendered chunk to both output ports. A chunk the
/// engine rejects goes out as silence.
impl jack::ProcessHandler for ProcessHandler {
    fn process(&mut self, _client: &jack::Client, ps: &jack::ProcessScope) -> jack::Control {
        let (input, left, right) = self.ports.split(ps);
        let chunk = self.buffer.len();
        if chunk == 0 {
            left.fill(0.0);
            right.fill(0.0);
            return jack::Control::Continue;
        }

        for ((inp, out_left), out_right) in input
            .chunks(chunk)
            .zip(left.chunks_mut(chunk))
            .zip(right.chunks_mut(chunk))
        {
            let rendered = &mut self.buffer[..inp.len()];
            if let Err(e) = self.audio_engine.process(inp, rendered) {
                error!("Audio processing error: {e}");
                out_left.fill(0.0);
                out_right.fill(0.0);
                continue;
            }
            out_left.copy_from_slice(rendered);
            out_right.copy_from_slice(rendered);
        }

        jack::Control::Continue
    }

    fn buffer_size(&mut self, _client: &jack::Client, frames: jack::Frames) -> jack::Control {
        debug!(">> JACK buffer_size changed to {frames} frames");

        self.buffer.resize(frames as usize, 0.0);
        jack::Control::Continue
    }
}
