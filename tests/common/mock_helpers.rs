//! Scripted producers and an observing scene

use crossbeam_channel::{bounded, Receiver, Sender};
use mikr_rs::catalog::ScalarRange;
use mikr_rs::config::AppConfig;
use mikr_rs::coprocess::{Connection, Producer};
use mikr_rs::error::Result;
use mikr_rs::ingest::IngestSession;
use mikr_rs::protocol::RawPayload;
use mikr_rs::scene::{ElementType, NodeId, NodeKind, SceneApi, SceneArena};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Writer whose bytes stay inspectable after the producer drops it
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    /// Every count written so far
    pub fn counts(&self) -> Vec<i64> {
        self.0
            .lock()
            .unwrap()
            .chunks_exact(8)
            .map(|c| i64::from_ne_bytes(c.try_into().unwrap()))
            .collect()
    }
}

pub type ScriptedConnection = Connection<Cursor<Vec<u8>>, SharedBuf>;

/// Session whose producer replays `script`; requests land in the returned buffer
pub fn scripted_session(script: Vec<u8>, config: &AppConfig) -> (IngestSession, SharedBuf) {
    let requests = SharedBuf::default();
    let sink = requests.clone();
    let launcher = move || -> Result<Box<dyn Producer>> {
        Ok(Box::new(Connection::new(Cursor::new(script.clone()), sink.clone())))
    };
    (
        IngestSession::with_launcher(Arc::new(launcher), config),
        requests,
    )
}

/// Producer that waits for a gate before answering each payload request
pub struct GatedProducer {
    inner: ScriptedConnection,
    gate: Receiver<()>,
}

impl Producer for GatedProducer {
    fn request_catalog_with(
        &mut self,
        on_name: &mut dyn FnMut(usize, usize) -> Result<()>,
    ) -> Result<Vec<String>> {
        self.inner.request_catalog_with(on_name)
    }

    fn request_timestep_payload(&mut self, index: usize) -> Result<RawPayload> {
        let _ = self.gate.recv_timeout(Duration::from_secs(5));
        self.inner.request_timestep_payload(index)
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

/// Session whose payload answers are released one at a time through the sender
pub fn gated_session(script: Vec<u8>, config: &AppConfig) -> (IngestSession, Sender<()>) {
    let (open, gate) = bounded::<()>(16);
    let launcher = move || -> Result<Box<dyn Producer>> {
        Ok(Box::new(GatedProducer {
            inner: Connection::new(Cursor::new(script.clone()), SharedBuf::default()),
            gate: gate.clone(),
        }))
    };
    (
        IngestSession::with_launcher(Arc::new(launcher), config),
        open,
    )
}

/// What the observed scene saw, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A build step began; holds the number of volumes committed before it
    BuildStart(usize),
    /// A volume was committed
    VolumeCommitted(NodeId),
    Refresh(bool),
}

/// [`SceneArena`] that logs build boundaries
#[derive(Default)]
pub struct ObservedScene {
    pub arena: SceneArena,
    pub events: Vec<SceneEvent>,
    /// Time each build step spends before touching the scene
    pub build_delay: Duration,
    pub committed_volumes: usize,
}

impl SceneApi for ObservedScene {
    fn root(&self) -> NodeId {
        self.arena.root()
    }

    fn create_node(&mut self, name: &str, kind: NodeKind) -> Result<NodeId> {
        self.arena.create_node(name, kind)
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.arena.attach_child(parent, child)
    }

    fn set_buffer_data(
        &mut self,
        node: NodeId,
        field: &str,
        shape: [usize; 2],
        element: ElementType,
        bytes: &[u8],
    ) -> Result<()> {
        self.arena.set_buffer_data(node, field, shape, element, bytes)
    }

    fn set_scalar_range(&mut self, node: NodeId, range: ScalarRange) -> Result<()> {
        self.arena.set_scalar_range(node, range)
    }

    fn commit(&mut self, node: NodeId) -> Result<()> {
        self.arena.commit(node)?;
        if self.arena.node(node).map(|n| n.kind) == Some(NodeKind::Volume) {
            self.committed_volumes += 1;
            self.events.push(SceneEvent::VolumeCommitted(node));
        }
        Ok(())
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<()> {
        self.arena.set_visible(node, visible)
    }

    fn refresh_scene(&mut self, reset_accumulation: bool) {
        self.events.push(SceneEvent::Refresh(reset_accumulation));
        self.arena.refresh_scene(reset_accumulation);
    }

    fn frame_is_ready(&self) -> bool {
        self.arena.frame_is_ready()
    }

    fn cancel_frame(&mut self) {
        std::thread::sleep(self.build_delay);
        self.events
            .push(SceneEvent::BuildStart(self.committed_volumes));
    }
}
