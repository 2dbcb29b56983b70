pub mod router;

use std::collections::BTreeSet;
use std::fmt;

use crate::eq::BAND_COUNT;
use crate::source::SourceKind;

/// Nodes of the processing graph. Producers sit at the head, the fixed
/// master/analyzer/output tail at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    File,
    Mic,
    White,
    Pink,
    NoiseGain,
    Band(usize),
    Master,
    Analyzer,
    Output,
}

pub const CHAIN_INPUT: NodeId = NodeId::Band(0);
pub const CHAIN_OUTPUT: NodeId = NodeId::Band(BAND_COUNT - 1);

impl NodeId {
    pub const fn producer(kind: SourceKind) -> Self {
        match kind {
            SourceKind::File => Self::File,
            SourceKind::Mic => Self::Mic,
            SourceKind::White => Self::White,
            SourceKind::Pink => Self::Pink,
        }
    }

    const fn as_source(self) -> Option<SourceKind> {
        match self {
            Self::File => Some(SourceKind::File),
            Self::Mic => Some(SourceKind::Mic),
            Self::White => Some(SourceKind::White),
            Self::Pink => Some(SourceKind::Pink),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Band(i) => write!(f, "band{i}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOp {
    Connect(NodeId, NodeId),
    Disconnect(NodeId, NodeId),
}

/// Flattened routing the audio thread acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Topology {
    pub source: Option<SourceKind>,
    pub through_noise_gain: bool,
    pub equalized: bool,
}

/// Directed connection list with an optional operation journal.
#[derive(Debug, Default)]
pub struct Graph {
    edges: BTreeSet<(NodeId, NodeId)>,
    journal: Option<Vec<GraphOp>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording every effective connect and disconnect.
    pub fn enable_journal(&mut self) {
        self.journal.get_or_insert_with(Vec::new);
    }

    pub fn journal(&self) -> &[GraphOp] {
        self.journal.as_deref().unwrap_or_default()
    }

    pub fn take_journal(&mut self) -> Vec<GraphOp> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Connecting an existing edge does nothing.
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        if self.edges.insert((from, to))
            && let Some(journal) = self.journal.as_mut()
        {
            journal.push(GraphOp::Connect(from, to));
        }
    }

    /// Remove every outgoing edge of `from`. A node with no outputs is a no-op.
    pub fn disconnect(&mut self, from: NodeId) {
        let targets: Vec<NodeId> = self
            .edges
            .iter()
            .filter(|(src, _)| *src == from)
            .map(|&(_, dst)| dst)
            .collect();

        for to in targets {
            self.disconnect_edge(from, to);
        }
    }

    /// Remove a single edge if it exists.
    pub fn disconnect_edge(&mut self, from: NodeId, to: NodeId) {
        if self.edges.remove(&(from, to))
            && let Some(journal) = self.journal.as_mut()
        {
            journal.push(GraphOp::Disconnect(from, to));
        }
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    pub fn outputs(&self, from: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(src, _)| *src == from)
            .map(|&(_, dst)| dst)
    }

    /// Whether a directed path leads from `from` to `to`.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();

        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.outputs(node));
            }
        }
        false
    }

    /// Producers with a path to master.
    pub fn sources_reaching_master(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|&kind| self.reaches(NodeId::producer(kind), NodeId::Master))
            .collect()
    }

    /// Number of edges feeding master directly.
    pub fn master_inputs(&self) -> usize {
        self.edges
            .iter()
            .filter(|(_, dst)| *dst == NodeId::Master)
            .count()
    }

    /// Collapse the connection list into the form the engine processes.
    pub fn topology(&self) -> Topology {
        let Some(node) = self
            .edges
            .iter()
            .map(|&(src, _)| src)
            .filter(|src| src.as_source().is_some())
            .find(|&src| self.reaches(src, NodeId::Master))
        else {
            return Topology::default();
        };

        let head = if self.is_connected(node, NodeId::NoiseGain) {
            NodeId::NoiseGain
        } else {
            node
        };

        Topology {
            source: node.as_source(),
            through_noise_gain: head == NodeId::NoiseGain,
            equalized: self.is_connected(head, CHAIN_INPUT),
        }
    }
}
