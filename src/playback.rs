//! Animation clock for cycling through created timesteps

use crate::catalog::Catalog;
use crate::config::{MAX_FPS, MIN_FPS};
use crate::error::Result;
use crate::scene::{builder::swap_visible, SceneApi, WorldMode};
use std::time::{Duration, Instant};

/// Whether the clock advances on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Stopped,
    Playing,
}

/// Manual stepping (`<<`, `<`, `>`, `>>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    First,
    Previous,
    Next,
    Last,
}

/// Fixed-rate cursor over the timestep index
#[derive(Debug, Clone)]
pub struct AnimationClock {
    /// Index that should be visible
    current: usize,
    /// Index that is visible in the scene
    previous: usize,
    count: usize,
    fps: u32,
    mode: PlaybackMode,
    world_mode: WorldMode,
    last_advance: Option<Instant>,
    /// Set after an advance until the renderer finishes that frame
    waiting_for_frame: bool,
}

impl AnimationClock {
    pub fn new(fps: u32, world_mode: WorldMode) -> Self {
        Self {
            current: 0,
            previous: 0,
            count: 0,
            fps: fps.clamp(MIN_FPS, MAX_FPS),
            mode: PlaybackMode::Stopped,
            world_mode,
            last_advance: None,
            waiting_for_frame: false,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn previous(&self) -> usize {
        self.previous
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps.clamp(MIN_FPS, MAX_FPS);
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.mode == PlaybackMode::Playing
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }

    /// Rewind to timestep 0 of a catalog holding `count` timesteps
    pub fn reset(&mut self, count: usize) {
        self.current = 0;
        self.previous = 0;
        self.count = count;
        self.mode = PlaybackMode::Stopped;
        self.last_advance = None;
        self.waiting_for_frame = false;
    }

    pub fn play(&mut self, now: Instant) {
        if self.count == 0 {
            return;
        }
        self.mode = PlaybackMode::Playing;
        self.last_advance = Some(now);
        self.waiting_for_frame = false;
    }

    pub fn stop(&mut self) {
        self.mode = PlaybackMode::Stopped;
    }

    /// Move the cursor by hand; `Previous` and `Next` wrap around
    pub fn step(&mut self, command: StepCommand) {
        if self.count == 0 {
            return;
        }
        self.current = match command {
            StepCommand::First => 0,
            StepCommand::Last => self.count - 1,
            StepCommand::Next => (self.current + 1) % self.count,
            StepCommand::Previous => (self.current + self.count - 1) % self.count,
        };
    }

    /// Advance if a frame interval has elapsed and the last advance has been
    /// rendered. Returns whether the cursor moved.
    pub fn tick_at(&mut self, now: Instant, frame_ready: bool) -> bool {
        if !self.is_playing() || self.count == 0 {
            return false;
        }
        if self.waiting_for_frame {
            if !frame_ready {
                return false;
            }
            self.waiting_for_frame = false;
        }

        let last = *self.last_advance.get_or_insert(now);
        if now.saturating_duration_since(last) < self.frame_interval() {
            return false;
        }

        self.current = (self.current + 1) % self.count;
        self.last_advance = Some(now);
        self.waiting_for_frame = true;
        true
    }

    /// Make the scene show `current` if it differs from what is shown.
    /// Returns whether anything was swapped.
    pub fn apply(&mut self, scene: &mut dyn SceneApi, catalog: &Catalog) -> Result<bool> {
        if self.current == self.previous {
            return Ok(false);
        }
        swap_visible(scene, catalog, self.world_mode, self.previous, self.current)?;
        tracing::trace!(from = self.previous, to = self.current, "timestep swapped");
        self.previous = self.current;
        Ok(true)
    }

    /// One frame of playback: tick against the scheduler, then apply
    pub fn update(&mut self, scene: &mut dyn SceneApi, catalog: &Catalog) -> Result<bool> {
        let frame_ready = scene.frame_is_ready();
        self.tick_at(Instant::now(), frame_ready);
        self.apply(scene, catalog)
    }
}
