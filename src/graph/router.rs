use log::{debug, warn};

use crate::audio::engine::EngineHandle;
use crate::eq::BAND_COUNT;
use crate::graph::{CHAIN_INPUT, CHAIN_OUTPUT, Graph, GraphOp, NodeId, Topology};
use crate::source::{SourceKind, SourceRegistry};

/// Which source feeds the graph and whether the EQ is in the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterState {
    pub active: Option<SourceKind>,
    pub bypass: bool,
}

/// Owns the graph and performs every rewiring in one ordered call.
pub struct Router {
    graph: Graph,
    state: RouterState,
    engine: EngineHandle,
    /// The engine missed the last topology.
    stale: bool,
}

impl Router {
    /// Wire the fixed EQ chain and the master, analyzer, output tail.
    pub fn new(engine: EngineHandle) -> Self {
        let mut graph = Graph::new();
        for i in 0..BAND_COUNT - 1 {
            graph.connect(NodeId::Band(i), NodeId::Band(i + 1));
        }
        graph.connect(NodeId::Master, NodeId::Analyzer);
        graph.connect(NodeId::Analyzer, NodeId::Output);

        Self {
            graph,
            state: RouterState::default(),
            engine,
            stale: false,
        }
    }

    pub const fn state(&self) -> RouterState {
        self.state
    }

    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Record connects and disconnects from here on.
    pub fn enable_journal(&mut self) {
        self.graph.enable_journal();
    }

    pub fn take_journal(&mut self) -> Vec<GraphOp> {
        self.graph.take_journal()
    }

    /// Route `active` (or nothing) with the current bypass setting.
    pub fn route(&mut self, sources: &SourceRegistry, active: Option<SourceKind>) {
        let next = RouterState {
            active,
            bypass: self.state.bypass,
        };
        self.transition(sources, next);
    }

    /// Change bypass, keeping the active source.
    pub fn set_bypass(&mut self, sources: &SourceRegistry, bypass: bool) {
        let next = RouterState {
            active: self.state.active,
            bypass,
        };
        self.transition(sources, next);
    }

    /// Move to `next`: old source off, chain output off, new path on, then
    /// publish the result. An unchanged state is left alone.
    pub fn transition(&mut self, sources: &SourceRegistry, next: RouterState) {
        if next == self.state {
            debug!("Routing unchanged: {next:?}");
            return;
        }

        if let Some(prev) = self.state.active {
            sources.get(prev).disconnect_output(&mut self.graph);
        }
        self.graph.disconnect_edge(CHAIN_OUTPUT, NodeId::Master);

        if let Some(kind) = next.active {
            let producer = sources.get(kind);
            if next.bypass {
                producer.connect_output(&mut self.graph, NodeId::Master);
            } else {
                producer.connect_output(&mut self.graph, CHAIN_INPUT);
                self.graph.connect(CHAIN_OUTPUT, NodeId::Master);
            }
        }

        self.state = next;
        let topology = self.graph.topology();
        debug!("Routed {next:?} -> {topology:?}");
        self.stale = !self.engine.set_topology(topology);
        if self.stale {
            warn!("Engine did not take topology {topology:?}, will resend");
        }
    }

    /// Resend the topology if the engine missed it. Returns whether the
    /// engine is in step with the graph.
    pub fn republish(&mut self) -> bool {
        if self.stale && self.engine.set_topology(self.graph.topology()) {
            debug!("Republished {:?}", self.graph.topology());
            self.stale = false;
        }
        !self.stale
    }

    pub fn topology(&self) -> Topology {
        self.graph.topology()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyzer::Analyzer;
    use crate::audio::engine::{Engine, EngineParams};
    use crate::noise::NoiseKind;
    use crate::source::file::FileSource;
    use crate::source::mic::{CaptureDevice, CaptureError, MicSource};
    use crate::source::noise::NoiseSource;
    use crossbeam::channel::{Receiver, bounded};

    struct NoDevice;

    impl CaptureDevice for NoDevice {
        fn request(&mut self) -> Receiver<Result<(), CaptureError>> {
            bounded(1).1
        }

        fn release(&mut self) {}
    }

    fn setup() -> (Router, SourceRegistry, Engine) {
        let (analyzer, _) = Analyzer::new(256, 48_000).unwrap();
        let (engine, handle) = Engine::new(48_000, &EngineParams::default(), analyzer);
        let sources = SourceRegistry::new(
            FileSource::new(handle.clone()),
            MicSource::new(Box::new(NoDevice)),
            NoiseSource::new(NoiseKind::White, handle.clone()),
            NoiseSource::new(NoiseKind::Pink, handle.clone()),
        );
        let mut router = Router::new(handle);
        router.enable_journal();
        (router, sources, engine)
    }

    fn tail_intact(graph: &Graph) -> bool {
        graph.is_connected(NodeId::Master, NodeId::Analyzer)
            && graph.is_connected(NodeId::Analyzer, NodeId::Output)
    }

    #[test]
    fn switching_disconnects_before_connecting() {
        let (mut router, sources, _engine) = setup();
        router.route(&sources, Some(SourceKind::White));
        router.take_journal();

        router.route(&sources, Some(SourceKind::Pink));
        let journal = router.take_journal();

        let first_connect = journal
            .iter()
            .position(|op| matches!(op, GraphOp::Connect(..)))
            .unwrap();
        assert!(
            journal[first_connect..]
                .iter()
                .all(|op| matches!(op, GraphOp::Connect(..))),
            "{journal:?}"
        );
        assert_eq!(router.graph().sources_reaching_master(), [SourceKind::Pink]);
        assert!(tail_intact(router.graph()));
    }

    #[test]
    fn bypass_round_trip_restores_routing() {
        let (mut router, sources, _engine) = setup();
        router.route(&sources, Some(SourceKind::Mic));
        let before: Vec<_> = router.graph().edges().collect();

        router.set_bypass(&sources, true);
        assert!(router.graph().is_connected(NodeId::Mic, NodeId::Master));
        assert!(!router.graph().is_connected(CHAIN_OUTPUT, NodeId::Master));
        assert_eq!(router.state().active, Some(SourceKind::Mic));

        router.set_bypass(&sources, false);
        let after: Vec<_> = router.graph().edges().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn reselecting_is_a_noop() {
        let (mut router, sources, _engine) = setup();
        router.route(&sources, Some(SourceKind::File));
        router.take_journal();

        router.route(&sources, Some(SourceKind::File));
        assert!(router.take_journal().is_empty());
    }

    #[test]
    fn routing_nothing_leaves_silent_graph() {
        let (mut router, sources, _engine) = setup();
        router.route(&sources, Some(SourceKind::White));
        router.route(&sources, None);

        assert!(router.graph().sources_reaching_master().is_empty());
        assert_eq!(router.graph().master_inputs(), 0);
        assert_eq!(router.topology(), Topology::default());
        assert!(tail_intact(router.graph()));
    }

    #[test]
    fn dropped_topology_is_resent() {
        let (mut router, sources, mut engine) = setup();
        let handle = router.engine.clone();
        while handle.set_q(1.0) {}

        router.route(&sources, Some(SourceKind::White));
        assert_eq!(router.state().active, Some(SourceKind::White));
        engine.handle_messages();
        assert_eq!(engine.topology(), Topology::default());

        assert!(router.republish());
        engine.handle_messages();
        assert_eq!(engine.topology(), router.topology());
        assert!(router.republish());
    }

    #[test]
    fn topology_is_published_to_engine() {
        let (mut router, sources, mut engine) = setup();
        router.route(&sources, Some(SourceKind::Pink));
        router.set_bypass(&sources, true);
        engine.handle_messages();

        assert_eq!(
            engine.topology(),
            Topology {
                source: Some(SourceKind::Pink),
                through_noise_gain: true,
                equalized: false,
            }
        );
    }
}
