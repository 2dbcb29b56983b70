use anyhow::{Context, Result};
use jack::{AudioIn, AudioOut, Client, Port, ProcessScope};

pub const IN_PORT: &str = "in_port";
pub const OUT_PORT_LEFT: &str = "out_port_left";
pub const OUT_PORT_RIGHT: &str = "out_port_right";

pub struct Ports {
    input: Port<AudioIn>,
    output_left: Port<AudioOut>,
    output_right: Port<AudioOut>,
}

impl Ports {
    pub fn new(client: &Client) -> Result<Self> {
        Ok(Self {
            input: client
                .register_port(IN_PORT, AudioIn::default())
                .context("failed to register in port")?,
            output_left: client
                .register_port(OUT_PORT_LEFT, AudioOut::default())
                .context("failed to register out port left")?,
            output_right: client
                .register_port(OUT_PORT_RIGHT, AudioOut::default())
                .context("failed to register out port right")?,
        })
    }

    /// Mono input plus the left and right outputs for this cycle. All three
    /// slices are `ps.n_frames()` long.
    pub fn split<'a>(
        &'a mut self,
        ps: &'a ProcessScope,
    ) -> (&'a [f32], &'a mut [f32], &'a mut [f32]) {
        (
            self.input.as_slice(ps),
            self.output_left.as_mut_slice(ps),
            self.output_right.as_mut_slice(ps),
        )
    }
}
