//! Baton handoff between the create task and the mutation thread
//!
//! Scene objects may only be created on the mutation thread, while the create
//! phase is driven by a background task. The two sides pass a baton back and
//! forth so that exactly one of them runs at a time:
//!
//! 1. The creator hands a [`BuildStep`] to the renderer and blocks.
//! 2. The renderer runs the build step, then hands the baton back.
//! 3. After the last step the creator calls [`CreatorBaton::finish`]; the
//!    renderer observes [`Baton::Finished`] and joins the task.
//!
//! Both channels hold at most one message, and every wait is bounded, so a
//! desynchronised peer surfaces as [`MikrError::HandoffTimeout`] or
//! [`MikrError::HandoffAborted`] instead of a hang.

use crate::error::{MikrError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// One unit of scene construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStep {
    /// Catalog index of the timestep to build
    pub index: usize,
    /// Number of steps in this run
    pub total: usize,
}

/// What the renderer receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baton {
    /// Run this build step, then hand the baton back
    Build(BuildStep),
    /// No more steps; join the task
    Finished,
}

/// Create a connected baton pair with the given bounded wait
pub fn baton_pair(timeout: Duration) -> (CreatorBaton, RendererBaton) {
    let (step_tx, step_rx) = bounded(1);
    let (ack_tx, ack_rx) = bounded(1);

    (
        CreatorBaton {
            to_renderer: step_tx,
            from_renderer: ack_rx,
            timeout,
        },
        RendererBaton {
            from_creator: step_rx,
            to_creator: ack_tx,
            timeout,
        },
    )
}

/// Background side of the handoff
#[derive(Debug)]
pub struct CreatorBaton {
    to_renderer: Sender<Baton>,
    from_renderer: Receiver<BuildStep>,
    timeout: Duration,
}

impl CreatorBaton {
    /// Hand `step` to the renderer and block until it hands the baton back
    pub fn hand_to_renderer(&self, step: BuildStep) -> Result<()> {
        self.to_renderer
            .send_timeout(Baton::Build(step), self.timeout)
            .map_err(|e| {
                if e.is_timeout() {
                    MikrError::HandoffTimeout("renderer to take the baton")
                } else {
                    MikrError::HandoffAborted("renderer went away")
                }
            })?;

        match self.from_renderer.recv_timeout(self.timeout) {
            Ok(done) if done == step => Ok(()),
            Ok(_) => Err(MikrError::HandoffAborted("renderer returned the wrong step")),
            Err(RecvTimeoutError::Timeout) => {
                Err(MikrError::HandoffTimeout("renderer to finish a build step"))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(MikrError::HandoffAborted("renderer went away"))
            }
        }
    }

    /// Tell the renderer there are no more steps
    pub fn finish(self) -> Result<()> {
        self.to_renderer
            .send_timeout(Baton::Finished, self.timeout)
            .map_err(|_| MikrError::HandoffAborted("renderer went away before finish"))
    }
}

/// Mutation-thread side of the handoff
#[derive(Debug)]
pub struct RendererBaton {
    from_creator: Receiver<Baton>,
    to_creator: Sender<BuildStep>,
    timeout: Duration,
}

impl RendererBaton {
    /// Block (bounded) until the creator hands over the baton
    pub fn wait(&self) -> Result<Baton> {
        match self.from_creator.recv_timeout(self.timeout) {
            Ok(baton) => Ok(baton),
            Err(RecvTimeoutError::Timeout) => Err(MikrError::HandoffTimeout("creator to hand over")),
            Err(RecvTimeoutError::Disconnected) => {
                Err(MikrError::HandoffAborted("creator went away"))
            }
        }
    }

    /// Return the baton after running `step`
    pub fn hand_to_creator(&self, step: BuildStep) -> Result<()> {
        self.to_creator
            .send_timeout(step, self.timeout)
            .map_err(|_| MikrError::HandoffAborted("creator went away"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        BuildStart(usize),
        BuildEnd(usize),
        Resumed(usize),
    }

    #[test]
    fn test_strict_alternation() {
        const STEPS: usize = 5;
        let (creator, renderer) = baton_pair(Duration::from_secs(5));
        let log = Arc::new(Mutex::new(Vec::new()));

        let creator_log = log.clone();
        let handle = thread::spawn(move || {
            for index in 0..STEPS {
                creator
                    .hand_to_renderer(BuildStep {
                        index,
                        total: STEPS,
                    })
                    .unwrap();
                creator_log.lock().unwrap().push(Event::Resumed(index));
            }
            creator.finish().unwrap();
        });

        let mut builds = 0;
        loop {
            match renderer.wait().unwrap() {
                Baton::Build(step) => {
                    log.lock().unwrap().push(Event::BuildStart(step.index));
                    builds += 1;
                    log.lock().unwrap().push(Event::BuildEnd(step.index));
                    renderer.hand_to_creator(step).unwrap();
                }
                Baton::Finished => break,
            }
        }
        handle.join().unwrap();

        assert_eq!(builds, STEPS);
        let expected: Vec<Event> = (0..STEPS)
            .flat_map(|i| [Event::BuildStart(i), Event::BuildEnd(i), Event::Resumed(i)])
            .collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn test_empty_run_finishes_immediately() {
        let (creator, renderer) = baton_pair(Duration::from_secs(1));
        creator.finish().unwrap();
        assert_eq!(renderer.wait().unwrap(), Baton::Finished);
    }

    #[test]
    fn test_renderer_timeout() {
        let (_creator, renderer) = baton_pair(Duration::from_millis(10));
        assert!(matches!(
            renderer.wait(),
            Err(MikrError::HandoffTimeout(_))
        ));
    }

    #[test]
    fn test_creator_sees_dropped_renderer() {
        let (creator, renderer) = baton_pair(Duration::from_secs(1));
        drop(renderer);
        let result = creator.hand_to_renderer(BuildStep { index: 0, total: 1 });
        assert!(matches!(result, Err(MikrError::HandoffAborted(_))));
    }

    #[test]
    fn test_renderer_sees_dropped_creator() {
        let (creator, renderer) = baton_pair(Duration::from_secs(1));
        drop(creator);
        assert!(matches!(
            renderer.wait(),
            Err(MikrError::HandoffAborted(_))
        ));
    }
}
