//! Background phase tasks
//!
//! Each task owns what it works on (the producer, the baton) and hands its
//! results back through [`TaskOutput`]. Nothing it builds is visible to the
//! session until the task has succeeded, so an aborted phase leaves no
//! partial buffers behind.

use super::phase::Phase;
use super::progress::{CancelToken, Progress};
use crate::catalog::{Catalog, VolumeBuffers};
use crate::coprocess::{Launcher, Producer};
use crate::error::{Result, ResultExt};
use crate::handoff::{BuildStep, CreatorBaton};
use std::thread::{self, JoinHandle};

/// What a successful task returns to the session
pub enum TaskOutput {
    Started(Box<dyn Producer>),
    Loaded {
        producer: Box<dyn Producer>,
        catalog: Catalog,
    },
    Transferred {
        producer: Box<dyn Producer>,
        buffers: Vec<VolumeBuffers>,
    },
    Created,
}

impl std::fmt::Debug for TaskOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskOutput::Started(_) => f.write_str("Started"),
            TaskOutput::Loaded { catalog, .. } => write!(f, "Loaded({} timesteps)", catalog.len()),
            TaskOutput::Transferred { buffers, .. } => {
                write!(f, "Transferred({} timesteps)", buffers.len())
            }
            TaskOutput::Created => f.write_str("Created"),
        }
    }
}

/// State shared between a task and the session
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub progress: Progress,
    pub cancel: CancelToken,
}

/// Run `task` on a named thread
pub fn spawn<F>(phase: Phase, task: F) -> Result<JoinHandle<Result<TaskOutput>>>
where
    F: FnOnce() -> Result<TaskOutput> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(format!("mikr-{}", phase.as_str().to_lowercase()))
        .spawn(task)?;
    Ok(handle)
}

/// Run `f` against the producer; on failure the producer is stopped and dropped
fn with_producer<T>(
    mut producer: Box<dyn Producer>,
    f: impl FnOnce(&mut dyn Producer) -> Result<T>,
) -> Result<(Box<dyn Producer>, T)> {
    match f(producer.as_mut()) {
        Ok(value) => Ok((producer, value)),
        Err(e) => {
            producer.stop();
            Err(e)
        }
    }
}

pub fn run_start(launcher: &dyn Launcher, ctx: &TaskContext) -> Result<TaskOutput> {
    ctx.cancel.check()?;
    let mut producer = launcher.launch()?;
    if let Err(e) = ctx.cancel.check() {
        producer.stop();
        return Err(e);
    }
    Ok(TaskOutput::Started(producer))
}

pub fn run_load(producer: Box<dyn Producer>, ctx: &TaskContext) -> Result<TaskOutput> {
    let (producer, names) = with_producer(producer, |producer| {
        ctx.cancel.check()?;
        producer
            .request_catalog_with(&mut |done, total| {
                ctx.progress.advance(done, total);
                ctx.cancel.check()
            })
            .context("Failed to fetch catalog")
    })?;

    tracing::info!("Catalog lists {} timesteps", names.len());
    Ok(TaskOutput::Loaded {
        producer,
        catalog: Catalog::from_names(names),
    })
}

pub fn run_transfer(
    producer: Box<dyn Producer>,
    count: usize,
    ctx: &TaskContext,
) -> Result<TaskOutput> {
    let (producer, buffers) = with_producer(producer, |producer| {
        let mut buffers = Vec::with_capacity(count);
        for index in 0..count {
            ctx.cancel.check()?;
            let raw = producer
                .request_timestep_payload(index)
                .with_context(|| format!("Failed to fetch timestep #{}", index))?;
            let decoded = VolumeBuffers::decode(raw)
                .with_context(|| format!("Failed to decode timestep #{}", index))?;
            tracing::debug!(
                index,
                vertices = decoded.vertex_count(),
                cells = decoded.cell_count(),
                "timestep transferred"
            );
            buffers.push(decoded);
            ctx.progress.advance(index + 1, count);
        }
        Ok(buffers)
    })?;

    Ok(TaskOutput::Transferred { producer, buffers })
}

/// Drive one build step per timestep through the baton
pub fn run_create(baton: CreatorBaton, count: usize, ctx: &TaskContext) -> Result<TaskOutput> {
    for index in 0..count {
        ctx.cancel.check()?;
        baton.hand_to_renderer(BuildStep {
            index,
            total: count,
        })?;
        ctx.progress.advance(index + 1, count);
    }
    baton.finish()?;
    Ok(TaskOutput::Created)
}
