//! UI-thread ingestion session
//!
//! [`IngestSession`] is owned by the mutation thread. Phase requests spawn a
//! background task; [`IngestSession::pump`] is called once per frame to
//! collect finished tasks, service the create handoff and tick the clock.

use super::phase::{IngestState, Phase};
use super::progress::{CancelToken, Progress};
use super::worker::{self, TaskContext, TaskOutput};
use crate::catalog::Catalog;
use crate::config::{AppConfig, HandoffConfig};
use crate::coprocess::{Launcher, ProcessLauncher, Producer};
use crate::error::{MikrError, Result};
use crate::handoff::{baton_pair, Baton, RendererBaton};
use crate::playback::AnimationClock;
use crate::scene::{SceneApi, VolumeBuilder, WorldMode};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sleep between pumps in [`IngestSession::drive`]
const DRIVE_INTERVAL: Duration = Duration::from_millis(5);

/// Outcome of a background phase, reported by `pump`
#[derive(Debug)]
pub enum PhaseEvent {
    Completed(Phase),
    Failed(Phase, MikrError),
}

struct ActiveTask {
    phase: Phase,
    handle: JoinHandle<Result<TaskOutput>>,
    cancel: CancelToken,
}

/// Renderer side of a running create phase
struct CreateRun {
    baton: RendererBaton,
    builder: VolumeBuilder,
}

/// Ingestion state machine plus everything it produces
pub struct IngestSession {
    launcher: Arc<dyn Launcher>,
    handoff: HandoffConfig,
    world_mode: WorldMode,
    autoplay: bool,
    state: IngestState,
    progress: Progress,
    catalog: Catalog,
    producer: Option<Box<dyn Producer>>,
    task: Option<ActiveTask>,
    create: Option<CreateRun>,
    clock: AnimationClock,
    last_error: Option<String>,
}

impl std::fmt::Debug for IngestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestSession")
            .field("state", &self.state)
            .field("progress", &self.progress.get())
            .field("timesteps", &self.catalog.len())
            .field("producer", &self.producer.is_some())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl IngestSession {
    /// Session launching the producer process described by `config`
    pub fn new(config: &AppConfig) -> Self {
        Self::with_launcher(Arc::new(ProcessLauncher::new(config.producer.clone())), config)
    }

    /// Session obtaining its producer from `launcher`
    pub fn with_launcher(launcher: Arc<dyn Launcher>, config: &AppConfig) -> Self {
        Self {
            launcher,
            handoff: config.handoff.clone(),
            world_mode: config.playback.world_mode,
            autoplay: config.playback.autoplay,
            state: IngestState::default(),
            progress: Progress::new(),
            catalog: Catalog::new(),
            producer: None,
            task: None,
            create: None,
            clock: AnimationClock::new(config.playback.clamped_fps(), config.playback.world_mode),
            last_error: None,
        }
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    /// Progress of the current (or last) phase in `[0, 1]`
    pub fn progress(&self) -> f32 {
        self.progress.get()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut AnimationClock {
        &mut self.clock
    }

    /// Message of the most recent phase failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn start(&mut self) -> Result<()> {
        self.request(Phase::Started)
    }

    pub fn load(&mut self) -> Result<()> {
        self.request(Phase::Loaded)
    }

    pub fn transfer(&mut self) -> Result<()> {
        self.request(Phase::Transferred)
    }

    pub fn create(&mut self) -> Result<()> {
        self.request(Phase::Created)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.request(Phase::Stopped)
    }

    /// Enter `phase` if the current state is its prerequisite.
    ///
    /// Phases with work become `*_ACTIVE` and spawn their task; the result
    /// arrives through [`pump`](Self::pump). A rejected request leaves the
    /// state untouched.
    pub fn request(&mut self, phase: Phase) -> Result<()> {
        self.state.check_transition(phase)?;

        if !phase.has_task() {
            tracing::info!("{} -> {}", self.state, phase);
            self.state = IngestState::Settled(phase);
            return Ok(());
        }

        let ctx = TaskContext {
            progress: self.progress.clone(),
            cancel: CancelToken::new(),
        };
        let cancel = ctx.cancel.clone();

        let handle = match phase {
            Phase::Started => {
                self.progress.reset();
                let launcher = self.launcher.clone();
                worker::spawn(phase, move || worker::run_start(launcher.as_ref(), &ctx))?
            }
            Phase::Loaded => {
                let producer = self.take_producer()?;
                self.progress.reset();
                Self::spawn_with_producer(phase, move || worker::run_load(producer, &ctx))?
            }
            Phase::Transferred => {
                let producer = self.take_producer()?;
                let count = self.catalog.len();
                self.progress.reset();
                Self::spawn_with_producer(phase, move || {
                    worker::run_transfer(producer, count, &ctx)
                })?
            }
            Phase::Created => {
                let (creator, baton) = baton_pair(self.handoff.step_timeout());
                let count = self.catalog.len();
                self.progress.reset();
                let handle = worker::spawn(phase, move || worker::run_create(creator, count, &ctx))?;
                self.catalog.clear_scene_handles();
                self.create = Some(CreateRun {
                    baton,
                    builder: VolumeBuilder::new(self.world_mode),
                });
                handle
            }
            Phase::Inited | Phase::Stopped => {
                return Err(MikrError::PhaseSequence {
                    requested: phase,
                    current: self.state,
                })
            }
        };

        tracing::info!("{} -> {}", self.state, IngestState::Active(phase));
        self.last_error = None;
        self.task = Some(ActiveTask {
            phase,
            handle,
            cancel,
        });
        self.state = IngestState::Active(phase);
        Ok(())
    }

    /// Spawn a task that owns the producer.
    ///
    /// A failed spawn drops the producer with the closure, so the session is
    /// left without one until it is reset.
    fn spawn_with_producer<F>(phase: Phase, task: F) -> Result<JoinHandle<Result<TaskOutput>>>
    where
        F: FnOnce() -> Result<TaskOutput> + Send + 'static,
    {
        worker::spawn(phase, task).map_err(|e| {
            tracing::error!("{} task did not start, producer lost: {}", phase, e);
            e
        })
    }

    fn take_producer(&mut self) -> Result<Box<dyn Producer>> {
        match self.producer.take() {
            Some(producer) if producer.is_open() => Ok(producer),
            _ => Err(MikrError::ChannelClosed(
                "no producer is running; reset and start again".to_string(),
            )),
        }
    }

    /// Ask the running task to stop at its next step
    pub fn cancel(&self) {
        if let Some(ref task) = self.task {
            tracing::info!("Cancelling {}", task.phase);
            task.cancel.cancel();
        }
    }

    /// Call once per frame on the mutation thread
    pub fn pump(&mut self, scene: &mut dyn SceneApi) -> Result<Option<PhaseEvent>> {
        match self.state {
            IngestState::Active(Phase::Created) => Ok(self.service_create(scene)),
            IngestState::Active(phase) => Ok(self.collect_task(phase)),
            IngestState::Settled(Phase::Created) => {
                self.clock.update(scene, &self.catalog)?;
                Ok(None)
            }
            IngestState::Settled(_) => Ok(None),
        }
    }

    /// Request `phase` and pump until it completes or fails
    pub fn drive(&mut self, phase: Phase, scene: &mut dyn SceneApi) -> Result<()> {
        self.request(phase)?;
        while self.state.is_active() {
            match self.pump(scene)? {
                Some(PhaseEvent::Completed(_)) => break,
                Some(PhaseEvent::Failed(_, e)) => return Err(e),
                None => thread::sleep(DRIVE_INTERVAL),
            }
        }
        Ok(())
    }

    fn join(task: ActiveTask) -> Result<TaskOutput> {
        task.handle
            .join()
            .unwrap_or_else(|_| Err(MikrError::TaskPanicked(task.phase)))
    }

    fn collect_task(&mut self, phase: Phase) -> Option<PhaseEvent> {
        let finished = self
            .task
            .as_ref()
            .map_or(true, |task| task.handle.is_finished());
        if !finished {
            return None;
        }

        let output = match self.task.take() {
            Some(task) => Self::join(task),
            None => Err(MikrError::ChannelClosed(format!("{} task went missing", phase))),
        };

        match output {
            Ok(TaskOutput::Started(producer)) => {
                self.producer = Some(producer);
                self.catalog = Catalog::new();
            }
            Ok(TaskOutput::Loaded { producer, catalog }) => {
                self.producer = Some(producer);
                self.catalog = catalog;
            }
            Ok(TaskOutput::Transferred { producer, buffers }) => {
                self.producer = Some(producer);
                for (index, buffers) in buffers.into_iter().enumerate() {
                    self.catalog.install(index, buffers);
                }
                if let Some(range) = self.catalog.scalar_range() {
                    tracing::info!("Dataset scalar range [{}, {}]", range.min, range.max);
                }
            }
            Ok(TaskOutput::Created) => {}
            Err(e) => return Some(self.fail(phase, e)),
        }

        Some(self.complete(phase))
    }

    fn complete(&mut self, phase: Phase) -> PhaseEvent {
        self.progress.complete();
        self.state = IngestState::Settled(phase);
        tracing::info!("{} complete", phase);
        PhaseEvent::Completed(phase)
    }

    /// Fall back to the last completed phase and report `err`
    fn fail(&mut self, phase: Phase, err: MikrError) -> PhaseEvent {
        let fallback = phase.prerequisite().unwrap_or(Phase::Inited);
        if err.is_abort() {
            tracing::warn!("{} aborted: {}", phase, err);
        } else {
            tracing::error!("{} failed: {}", phase, err);
        }
        self.state = IngestState::Settled(fallback);
        self.last_error = Some(err.to_string());
        PhaseEvent::Failed(phase, err)
    }

    /// Run build steps handed over by the create task.
    ///
    /// Blocks (bounded) on the baton; at most `max_steps_per_pump` steps run
    /// per call when configured.
    fn service_create(&mut self, scene: &mut dyn SceneApi) -> Option<PhaseEvent> {
        let budget = self.handoff.max_steps_per_pump.unwrap_or(usize::MAX).max(1);

        for _ in 0..budget {
            let Some(run) = self.create.as_mut() else {
                return Some(
                    self.fail_create(scene, MikrError::HandoffAborted("create run missing")),
                );
            };

            let step = match run.baton.wait() {
                Ok(Baton::Build(step)) => step,
                Ok(Baton::Finished) => return Some(self.finish_create(scene)),
                Err(e) => return Some(self.fail_create(scene, e)),
            };

            match run.builder.build_step(scene, &self.catalog, step.index) {
                Ok(handles) => {
                    self.catalog.set_scene_handles(step.index, handles);
                }
                Err(e) => return Some(self.fail_create(scene, e)),
            }
            if let Err(e) = run.baton.hand_to_creator(step) {
                return Some(self.fail_create(scene, e));
            }
        }
        None
    }

    fn finish_create(&mut self, scene: &mut dyn SceneApi) -> PhaseEvent {
        if let Some(task) = self.task.take() {
            if let Err(e) = Self::join(task) {
                return self.fail_create(scene, e);
            }
        }
        let Some(run) = self.create.take() else {
            return self.fail_create(scene, MikrError::HandoffAborted("create run missing"));
        };
        if !self.catalog.is_empty() {
            if let Err(e) = run.builder.finalize(scene, &self.catalog, 0) {
                self.create = Some(run);
                return self.fail_create(scene, e);
            }
        }

        self.clock.reset(self.catalog.len());
        if self.autoplay {
            self.clock.play(Instant::now());
        }
        self.complete(Phase::Created)
    }

    /// Tear down the handoff and report the most specific error.
    ///
    /// Nodes built so far cannot be removed from the scene, so they are
    /// hidden before their handles are forgotten.
    fn fail_create(&mut self, scene: &mut dyn SceneApi, err: MikrError) -> PhaseEvent {
        // Dropping the renderer side unblocks the creator
        let builder = self.create.take().map(|run| run.builder);

        let err = match self.task.take().map(Self::join) {
            Some(Err(task_err)) if matches!(err, MikrError::HandoffAborted(_)) => task_err,
            _ => err,
        };

        if let Some(builder) = builder {
            if let Err(e) = builder.hide_built(scene) {
                tracing::warn!("Could not hide partially created timesteps: {}", e);
            }
        }
        self.catalog.clear_scene_handles();
        self.fail(Phase::Created, err)
    }

    /// Stop the producer, discard the catalog and return to `INITED`.
    ///
    /// A task still blocked on the producer is cancelled and detached.
    pub fn reset(&mut self) {
        self.create = None;
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            if task.handle.is_finished() {
                let _ = Self::join(task);
            } else {
                tracing::warn!("Detaching unfinished {} task", task.phase);
            }
        }
        if let Some(mut producer) = self.producer.take() {
            producer.stop();
        }

        self.catalog = Catalog::new();
        self.clock.reset(0);
        self.progress.reset();
        self.last_error = None;
        if self.state != IngestState::default() {
            tracing::info!("{} -> {}", self.state, Phase::Inited);
        }
        self.state = IngestState::default();
    }
}

impl Drop for IngestSession {
    fn drop(&mut self) {
        self.reset();
    }
}
