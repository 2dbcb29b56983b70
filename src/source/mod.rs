pub mod file;
pub mod mic;
pub mod noise;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeId};
use crate::noise::NoiseKind;

use self::file::FileSource;
use self::mic::MicSource;
use self::noise::NoiseSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Mic,
    White,
    Pink,
}

impl SourceKind {
    pub const ALL: [Self; 4] = [Self::File, Self::Mic, Self::White, Self::Pink];

    pub const fn is_noise(self) -> bool {
        matches!(self, Self::White | Self::Pink)
    }

    pub const fn noise_kind(self) -> Option<NoiseKind> {
        match self {
            Self::White => Some(NoiseKind::White),
            Self::Pink => Some(NoiseKind::Pink),
            _ => None,
        }
    }

    /// Next kind in selector order, wrapping around.
    pub const fn next(self) -> Self {
        match self {
            Self::File => Self::Mic,
            Self::Mic => Self::White,
            Self::White => Self::Pink,
            Self::Pink => Self::File,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::File => "file",
            Self::Mic => "mic",
            Self::White => "white",
            Self::Pink => "pink",
        };
        f.write_str(name)
    }
}

/// Outcome of starting a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Producing now; route it.
    Ready,
    /// Waiting on an asynchronous grant; keep the graph silent meanwhile.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// File mode without a decoded file.
    NotLoaded,
    /// The backend refused to start playback.
    PlaybackRejected,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "no file loaded"),
            Self::PlaybackRejected => write!(f, "playback was rejected"),
        }
    }
}

impl std::error::Error for SourceError {}

/// What the router needs from an input, regardless of its kind.
pub trait Producer {
    fn kind(&self) -> SourceKind;

    fn start(&mut self) -> Result<Readiness, SourceError>;

    /// Stop producing. Stopping an idle producer does nothing.
    fn stop(&mut self);

    fn is_live(&self) -> bool;

    /// Node whose output feeds the router.
    fn outlet(&self) -> NodeId {
        NodeId::producer(self.kind())
    }

    fn connect_output(&self, graph: &mut Graph, to: NodeId) {
        graph.connect(self.outlet(), to);
    }

    fn disconnect_output(&self, graph: &mut Graph) {
        graph.disconnect(self.outlet());
    }
}

/// The four candidate inputs, exactly one of which is selected.
pub struct SourceRegistry {
    file: FileSource,
    mic: MicSource,
    white: NoiseSource,
    pink: NoiseSource,
    selected: SourceKind,
}

impl SourceRegistry {
    pub const fn new(
        file: FileSource,
        mic: MicSource,
        white: NoiseSource,
        pink: NoiseSource,
    ) -> Self {
        Self {
            file,
            mic,
            white,
            pink,
            selected: SourceKind::File,
        }
    }

    pub fn get(&self, kind: SourceKind) -> &dyn Producer {
        match kind {
            SourceKind::File => &self.file,
            SourceKind::Mic => &self.mic,
            SourceKind::White => &self.white,
            SourceKind::Pink => &self.pink,
        }
    }

    pub fn get_mut(&mut self, kind: SourceKind) -> &mut dyn Producer {
        match kind {
            SourceKind::File => &mut self.file,
            SourceKind::Mic => &mut self.mic,
            SourceKind::White => &mut self.white,
            SourceKind::Pink => &mut self.pink,
        }
    }

    pub const fn selected(&self) -> SourceKind {
        self.selected
    }

    pub const fn select(&mut self, kind: SourceKind) {
        self.selected = kind;
    }

    pub const fn file(&self) -> &FileSource {
        &self.file
    }

    pub const fn file_mut(&mut self) -> &mut FileSource {
        &mut self.file
    }

    pub const fn mic(&self) -> &MicSource {
        &self.mic
    }

    pub const fn mic_mut(&mut self) -> &mut MicSource {
        &mut self.mic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycling_visits_every_kind() {
        let mut kind = SourceKind::File;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(kind);
            kind = kind.next();
        }
        assert_eq!(seen, SourceKind::ALL);
        assert_eq!(kind, SourceKind::File);
    }

    #[test]
    fn noise_kinds() {
        assert!(SourceKind::White.is_noise());
        assert!(SourceKind::Pink.is_noise());
        assert!(!SourceKind::Mic.is_noise());
        assert_eq!(SourceKind::Pink.noise_kind(), Some(NoiseKind::Pink));
        assert_eq!(SourceKind::File.noise_kind(), None);
    }

    #[test]
    fn kind_round_trips_through_json() {
        let json = serde_json::to_string(&SourceKind::White).unwrap();
        assert_eq!(json, "\"white\"");
        let back: SourceKind = serde_json::from_str("\"pink\"").unwrap();
        assert_eq!(back, SourceKind::Pink);
        assert_eq!(SourceKind::Mic.to_string(), "mic");
    }
}
