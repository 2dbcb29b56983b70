use log::{debug, warn};

use crate::audio::engine::EngineHandle;
use crate::graph::{Graph, NodeId};
use crate::noise::{NoiseGenerator, NoiseKind};
use crate::source::{Producer, Readiness, SourceError, SourceKind};

/// A noise generator feeding the router through the shared noise gain.
pub struct NoiseSource {
    kind: NoiseKind,
    engine: EngineHandle,
    live: bool,
}

impl NoiseSource {
    pub const fn new(kind: NoiseKind, engine: EngineHandle) -> Self {
        Self {
            kind,
            engine,
            live: false,
        }
    }
}

impl Producer for NoiseSource {
    fn kind(&self) -> SourceKind {
        match self.kind {
            NoiseKind::White => SourceKind::White,
            NoiseKind::Pink => SourceKind::Pink,
        }
    }

    /// Hands the engine a fresh generator unless one is already running.
    fn start(&mut self) -> Result<Readiness, SourceError> {
        if self.live {
            return Ok(Readiness::Ready);
        }

        let generator = NoiseGenerator::new(self.kind, self.engine.sample_rate());
        if !self.engine.start_noise(generator) {
            return Err(SourceError::PlaybackRejected);
        }
        debug!("Started {} noise", self.kind);
        self.live = true;
        Ok(Readiness::Ready)
    }

    fn stop(&mut self) {
        if self.live {
            if !self.engine.stop_noise(self.kind) {
                warn!("Engine did not take the {} noise stop", self.kind);
            }
            debug!("Stopped {} noise", self.kind);
            self.live = false;
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn connect_output(&self, graph: &mut Graph, to: NodeId) {
        graph.connect(self.outlet(), NodeId::NoiseGain);
        graph.connect(NodeId::NoiseGain, to);
    }

    fn disconnect_output(&self, graph: &mut Graph) {
        graph.disconnect(self.outlet());
        graph.disconnect(NodeId::NoiseGain);
    }
}
